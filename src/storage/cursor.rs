//! # Database Cursor Module
//!
//! A cursor is a logical position `(page_num, cell_num)` within the tree,
//! plus an end-of-table marker. Cursors are ephemeral: one is created per
//! operation and discarded afterwards.

use super::btree::NodeType;
use super::table::Table;
use crate::errors::Error;

/// Represents a position within the table.
///
/// # Lifetime
/// The cursor borrows a mutable reference to the table for its entire
/// lifetime, so a page it is reading cannot be mutated behind its back.
pub struct Cursor<'a> {
    pub table: &'a mut Table,

    /// Current page number in the table.
    pub page_num: u32,

    /// Current cell number within the page.
    pub cell_num: u32,

    /// Indicates a position one past the last element.
    pub end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// A cursor at the start of the table.
    pub fn start(table: &'a mut Table) -> Result<Self, Error> {
        let page_num = table.root_page_num;
        let num_cells = table.pager.get_page(page_num)?.leaf_node_num_cells();

        Ok(Cursor {
            table,
            page_num,
            cell_num: 0,
            end_of_table: num_cells == 0,
        })
    }

    /// The position of `key`, or the position where it should be inserted
    /// if it is not present.
    pub fn find(table: &'a mut Table, key: u32) -> Result<Self, Error> {
        let root_page_num = table.root_page_num;
        let root_type = table.pager.get_page(root_page_num)?.get_node_type()?;

        match root_type {
            NodeType::Leaf => Cursor::leaf_node_find(table, root_page_num, key),
            NodeType::Internal => Err(err!(
                Storage,
                "Need to implement searching an internal node"
            )),
        }
    }

    fn leaf_node_find(table: &'a mut Table, page_num: u32, key: u32) -> Result<Self, Error> {
        let node = table.pager.get_page(page_num)?;

        // Binary search; the key lives in [min_index, one_past_max_index).
        let mut min_index = 0;
        let mut one_past_max_index = node.leaf_node_num_cells();
        let mut cell_num = None;

        while one_past_max_index != min_index {
            let index = (min_index + one_past_max_index) / 2;
            let key_at_index = node.leaf_node_key(index as usize)?;
            if key == key_at_index {
                cell_num = Some(index);
                break;
            }
            if key < key_at_index {
                one_past_max_index = index;
            } else {
                min_index = index + 1;
            }
        }

        Ok(Cursor {
            table,
            page_num,
            cell_num: cell_num.unwrap_or(min_index),
            end_of_table: false,
        })
    }

    /// Copies the serialized row at the cursor position into `buf`.
    pub fn read_value(&mut self, buf: &mut Vec<u8>) -> Result<(), Error> {
        let page_num = self.page_num;
        let cell_num = self.cell_num;
        let node = self.table.pager.get_page(page_num)?;

        let value = node.leaf_node_value(cell_num as usize)?;
        buf.clear();
        buf.extend_from_slice(value);
        Ok(())
    }

    /// Moves to the next cell. Scans stop at the end of the current leaf;
    /// there is no sibling pointer to follow at this revision.
    pub fn advance(&mut self) -> Result<(), Error> {
        let num_cells = self.table.pager.get_page(self.page_num)?.leaf_node_num_cells();

        self.cell_num += 1;
        if self.cell_num >= num_cells {
            self.end_of_table = true;
        }
        Ok(())
    }
}
