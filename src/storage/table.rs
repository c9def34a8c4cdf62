//! The table facade and the B+-tree operations behind it.
//!
//! A table is one B+-tree stored in one file; page 0 is always the root.
//! Inserting keeps leaf cells sorted by key. When a leaf overflows, its
//! fourteen cells (thirteen existing plus the new one) are redistributed
//! left-biased across the old leaf and a fresh sibling. When the split node
//! was the root, a new internal root is created over the pair.

use std::path::Path;

use tracing::{debug, info, warn};

use super::btree::{
    Node, NodeType, LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS, LEAF_NODE_RIGHT_SPLIT_COUNT,
};
use super::cursor::Cursor;
use super::pager::Pager;
use super::row::{Row, ROW_SIZE};
use crate::errors::Error;

pub struct Table {
    /// Page number of the root node; always 0.
    pub root_page_num: u32,
    pub pager: Pager,
}

impl Table {
    /// Opens the database file. If the file was empty, page 0 is
    /// initialized as an empty root leaf.
    pub fn db_open(path: &Path) -> Result<Self, Error> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            // New database file. Initialize page 0 as the root leaf.
            let root = pager.get_page(0)?;
            initialize_leaf_node(root);
            root.set_node_root(true);
        }

        Ok(Table {
            root_page_num: 0,
            pager,
        })
    }

    /// Flushes every cached page and releases the file. This is the only
    /// teardown path that makes writes durable; dropping the table without
    /// calling it loses unflushed pages.
    pub fn db_close(&mut self) -> Result<(), Error> {
        let mut flushed = 0;
        for page_num in 0..self.pager.num_pages() {
            if self.pager.is_cached(page_num) {
                self.pager.flush(page_num)?;
                flushed += 1;
            }
        }
        info!(pages = flushed, "Flushed database");
        Ok(())
    }
}

pub fn initialize_leaf_node(node: &mut Node) {
    node.set_node_type(NodeType::Leaf);
    node.set_node_root(false);
    node.set_leaf_node_num_cells(0);
}

pub fn initialize_internal_node(node: &mut Node) {
    node.set_node_type(NodeType::Internal);
    node.set_node_root(false);
    node.set_internal_node_num_keys(0);
}

/// Inserts a row at its key-ordered position.
///
/// # Errors
/// `DuplicateKey` if the id is already present; a storage fault if the
/// insert would need tree capabilities beyond the root split.
pub fn insert_row(table: &mut Table, row: &Row) -> Result<(), Error> {
    let key = row.id;
    debug!(key, "Inserting a row...");

    let mut cursor = Cursor::find(table, key)?;

    let node = cursor.table.pager.get_page(cursor.page_num)?;
    let num_cells = node.leaf_node_num_cells();

    if cursor.cell_num < num_cells {
        let key_at_index = node.leaf_node_key(cursor.cell_num as usize)?;
        if key_at_index == key {
            return Err(Error::DuplicateKey);
        }
    }

    if num_cells as usize >= LEAF_NODE_MAX_CELLS {
        warn!(
            page_num = cursor.page_num,
            num_cells, "Leaf node full. Splitting..."
        );
        return leaf_node_split_and_insert(&mut cursor, row);
    }

    let mut value = [0u8; ROW_SIZE];
    row.serialize(&mut value);

    let node = cursor.table.pager.get_page(cursor.page_num)?;
    if cursor.cell_num < num_cells {
        // Make room for the new cell.
        for i in (cursor.cell_num + 1..=num_cells).rev() {
            let prev = node.leaf_node_cell(i as usize - 1)?.to_vec();
            node.leaf_node_cell_mut(i as usize)?.copy_from_slice(&prev);
        }
    }

    node.set_leaf_node_num_cells(num_cells + 1);
    node.set_leaf_node_key(cursor.cell_num as usize, key)?;
    node.set_leaf_node_value(cursor.cell_num as usize, &value)?;
    Ok(())
}

/// Creates a new leaf and redistributes the full leaf's cells plus the new
/// one across both, left-biased. All existing keys plus the new key are
/// divided evenly between the old (left) and new (right) nodes; starting
/// from the right, each cell is moved to its final position.
fn leaf_node_split_and_insert(cursor: &mut Cursor, row: &Row) -> Result<(), Error> {
    let new_page_num = cursor.table.pager.get_unused_page_num();
    debug!(
        old_page_num = cursor.page_num,
        new_page_num, "Splitting leaf node..."
    );
    initialize_leaf_node(cursor.table.pager.get_page(new_page_num)?);

    let old = cursor.table.pager.get_page(cursor.page_num)?.clone();

    let mut value = [0u8; ROW_SIZE];
    row.serialize(&mut value);

    for i in (0..=LEAF_NODE_MAX_CELLS).rev() {
        let dest_page_num = if i >= LEAF_NODE_LEFT_SPLIT_COUNT {
            new_page_num
        } else {
            cursor.page_num
        };
        let cell_within_node = i % LEAF_NODE_LEFT_SPLIT_COUNT;
        let dest = cursor.table.pager.get_page(dest_page_num)?;

        if i == cursor.cell_num as usize {
            dest.set_leaf_node_key(cell_within_node, row.id)?;
            dest.set_leaf_node_value(cell_within_node, &value)?;
        } else if i > cursor.cell_num as usize {
            dest.leaf_node_cell_mut(cell_within_node)?
                .copy_from_slice(old.leaf_node_cell(i - 1)?);
        } else {
            dest.leaf_node_cell_mut(cell_within_node)?
                .copy_from_slice(old.leaf_node_cell(i)?);
        }
    }

    cursor
        .table
        .pager
        .get_page(cursor.page_num)?
        .set_leaf_node_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
    cursor
        .table
        .pager
        .get_page(new_page_num)?
        .set_leaf_node_num_cells(LEAF_NODE_RIGHT_SPLIT_COUNT as u32);

    if old.is_node_root() {
        create_new_root(cursor.table, new_page_num)
    } else {
        Err(err!(
            Storage,
            "Need to implement updating parent after the split"
        ))
    }
}

/// Promotes a root split: the old root is copied verbatim to a fresh page
/// (the left child) and the root page is reinitialized as an internal node
/// over the two children, keyed by the left child's maximum key.
fn create_new_root(table: &mut Table, right_child_page_num: u32) -> Result<(), Error> {
    let left_child_page_num = table.pager.get_unused_page_num();
    debug!(left_child_page_num, right_child_page_num, "Creating a new root");

    let root_copy = table.pager.get_page(table.root_page_num)?.clone();
    let left_max_key = root_copy.get_node_max_key()?;

    let left_child = table.pager.get_page(left_child_page_num)?;
    left_child.data = root_copy.data;
    left_child.set_node_root(false);

    let root = table.pager.get_page(table.root_page_num)?;
    initialize_internal_node(root);
    root.set_node_root(true);
    root.set_internal_node_num_keys(1);
    root.set_internal_node_child(0, left_child_page_num)?;
    root.set_internal_node_key(0, left_max_key)?;
    root.set_internal_node_right_child(right_child_page_num);
    Ok(())
}

/// All rows in key order.
pub fn scan_all(table: &mut Table) -> Result<Vec<Row>, Error> {
    let mut rows = Vec::new();
    let mut buf = Vec::with_capacity(ROW_SIZE);

    let mut cursor = Cursor::start(table)?;
    while !cursor.end_of_table {
        cursor.read_value(&mut buf)?;
        rows.push(Row::deserialize(&buf));
        cursor.advance()?;
    }
    Ok(rows)
}

/// The row stored under `key`, if any.
pub fn find_by_key(table: &mut Table, key: u32) -> Result<Option<Row>, Error> {
    let cursor = Cursor::find(table, key)?;
    let page_num = cursor.page_num;
    let cell_num = cursor.cell_num;

    let node = cursor.table.pager.get_page(page_num)?;
    if cell_num < node.leaf_node_num_cells() && node.leaf_node_key(cell_num as usize)? == key {
        let row = Row::deserialize(node.leaf_node_value(cell_num as usize)?);
        Ok(Some(row))
    } else {
        Ok(None)
    }
}

/// Renders the tree for `.btree`, indented two spaces per level.
pub fn dump_tree(table: &mut Table) -> Result<String, Error> {
    let mut out = String::new();
    print_node(&mut table.pager, table.root_page_num, 0, &mut out)?;
    Ok(out)
}

fn print_node(
    pager: &mut Pager,
    page_num: u32,
    indent: usize,
    out: &mut String,
) -> Result<(), Error> {
    let node = pager.get_page(page_num)?;
    match node.get_node_type()? {
        NodeType::Leaf => {
            let num_cells = node.leaf_node_num_cells();
            out.push_str(&format!("{}- leaf (size {})\n", pad(indent), num_cells));
            for i in 0..num_cells {
                let key = node.leaf_node_key(i as usize)?;
                out.push_str(&format!("{}- {}\n", pad(indent + 1), key));
            }
        }
        NodeType::Internal => {
            let num_keys = node.internal_node_num_keys();
            let right_child = node.internal_node_right_child();
            out.push_str(&format!("{}- internal (size {})\n", pad(indent), num_keys));
            for i in 0..num_keys {
                let child = pager.get_page(page_num)?.internal_node_child(i)?;
                print_node(pager, child, indent + 1, out)?;

                let key = pager.get_page(page_num)?.internal_node_key(i)?;
                out.push_str(&format!("{}- key {}\n", pad(indent + 1), key));
            }
            print_node(pager, right_child, indent + 1, out)?;
        }
    }
    Ok(())
}

fn pad(indent: usize) -> String {
    "  ".repeat(indent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(id: u32) -> Row {
        Row {
            id,
            username: format!("user{}", id),
            email: format!("person{}@example.com", id),
        }
    }

    fn open(dir: &TempDir) -> Table {
        Table::db_open(&dir.path().join("table_test.db")).unwrap()
    }

    #[test]
    fn scans_come_back_in_key_order() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        for id in [3, 1, 2] {
            insert_row(&mut table, &row(id)).unwrap();
        }

        let ids: Vec<u32> = scan_all(&mut table).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_keys_are_rejected_without_mutation() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        insert_row(&mut table, &row(1)).unwrap();

        let err = insert_row(&mut table, &row(1)).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey));
        assert_eq!(scan_all(&mut table).unwrap().len(), 1);
    }

    #[test]
    fn rows_survive_close_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table_test.db");

        let mut table = Table::db_open(&path).unwrap();
        insert_row(&mut table, &row(1)).unwrap();
        insert_row(&mut table, &row(2)).unwrap();
        table.db_close().unwrap();
        drop(table);

        let mut table = Table::db_open(&path).unwrap();
        let rows = scan_all(&mut table).unwrap();
        assert_eq!(rows, vec![row(1), row(2)]);
    }

    #[test]
    fn find_by_key_distinguishes_hits_from_misses() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        insert_row(&mut table, &row(5)).unwrap();

        assert_eq!(find_by_key(&mut table, 5).unwrap(), Some(row(5)));
        assert_eq!(find_by_key(&mut table, 6).unwrap(), None);
    }

    #[test]
    fn a_leaf_holds_thirteen_rows_without_splitting() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        for id in 1..=13 {
            insert_row(&mut table, &row(id)).unwrap();
        }

        assert_eq!(table.pager.num_pages(), 1);
        assert_eq!(scan_all(&mut table).unwrap().len(), 13);
    }

    #[test]
    fn the_fourteenth_insert_promotes_an_internal_root() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        for id in 1..=14 {
            insert_row(&mut table, &row(id)).unwrap();
        }

        let root = table.pager.get_page(0).unwrap();
        assert_eq!(root.get_node_type().unwrap(), NodeType::Internal);
        assert!(root.is_node_root());
        assert_eq!(root.internal_node_num_keys(), 1);
        assert_eq!(root.internal_node_key(0).unwrap(), 7);

        let left_page = root.internal_node_child(0).unwrap();
        let right_page = root.internal_node_right_child();
        let left = table.pager.get_page(left_page).unwrap().clone();
        let right = table.pager.get_page(right_page).unwrap();

        assert_eq!(left.leaf_node_num_cells(), 7);
        assert_eq!(right.leaf_node_num_cells(), 7);
        assert_eq!(left.leaf_node_key(0).unwrap(), 1);
        assert_eq!(left.leaf_node_key(6).unwrap(), 7);
        assert_eq!(right.leaf_node_key(0).unwrap(), 8);
        assert_eq!(right.leaf_node_key(6).unwrap(), 14);
    }

    #[test]
    fn dump_tree_renders_the_split_tree() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        for id in 1..=14 {
            insert_row(&mut table, &row(id)).unwrap();
        }

        let expected = "\
- internal (size 1)
  - leaf (size 7)
    - 1
    - 2
    - 3
    - 4
    - 5
    - 6
    - 7
  - key 7
  - leaf (size 7)
    - 8
    - 9
    - 10
    - 11
    - 12
    - 13
    - 14
";
        assert_eq!(dump_tree(&mut table).unwrap(), expected);
    }

    #[test]
    fn dump_tree_renders_a_single_leaf() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        for id in [3, 1, 2] {
            insert_row(&mut table, &row(id)).unwrap();
        }

        assert_eq!(
            dump_tree(&mut table).unwrap(),
            "- leaf (size 3)\n  - 1\n  - 2\n  - 3\n"
        );
    }

    #[test]
    fn inserting_after_a_split_is_a_storage_fault() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        for id in 1..=14 {
            insert_row(&mut table, &row(id)).unwrap();
        }

        let err = insert_row(&mut table, &row(15)).unwrap_err();
        match err {
            Error::Storage(msg) => {
                assert_eq!(msg, "Need to implement searching an internal node")
            }
            other => panic!("expected a storage fault, got {:?}", other),
        }
    }
}
