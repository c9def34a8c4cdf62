//! The pager: maps page numbers to in-memory buffers backed by the database
//! file. It owns the file descriptor; everything above it borrows pages for
//! the duration of a single synchronous call.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, trace};

use super::btree::Node;
use crate::errors::Error;

/// Page size of 4 kilobytes, the same size as a page in the virtual memory
/// systems of most computer architectures.
pub const PAGE_SIZE: usize = 4096;

/// Hard cap on the number of pages; the cache has one slot per page and no
/// eviction, so this also bounds the table at 400 KiB.
pub const TABLE_MAX_PAGES: usize = 100;

pub struct Pager {
    file: File,

    /// Length of the file at open time, in bytes.
    file_length: u64,

    /// Number of pages the pager knows about: pages on disk plus any
    /// newly allocated ones that have not been flushed yet.
    num_pages: u32,

    /// One slot per page number; `None` until the page is first touched.
    slots: heapless::Vec<Option<Box<Node>>, TABLE_MAX_PAGES>,
}

impl Pager {
    /// Opens (or creates) the database file and measures it.
    ///
    /// # Errors
    /// Fails if the file cannot be opened or its length is not a whole
    /// number of pages.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_length = file.seek(SeekFrom::End(0))?;
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(err!(
                Storage,
                "Db file is not a whole number of pages. Corrupt file."
            ));
        }
        let num_pages = (file_length / PAGE_SIZE as u64) as u32;

        let mut slots = heapless::Vec::new();
        for _ in 0..TABLE_MAX_PAGES {
            let _ = slots.push(None);
        }

        debug!(?path, file_length, num_pages, "Opened database file");

        Ok(Pager {
            file,
            file_length,
            num_pages,
            slots,
        })
    }

    /// Returns the page, loading it from disk on first access. Pages past
    /// the end of the file start zero-filled; touching one extends
    /// `num_pages`.
    pub fn get_page(&mut self, page_num: u32) -> Result<&mut Node, Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(err!(
                Storage,
                "Tried to fetch page number out of bounds. {} > {}",
                page_num,
                TABLE_MAX_PAGES
            ));
        }

        if self.slots[page_num as usize].is_none() {
            // Cache miss. Allocate memory and load from file.
            let mut node = Box::new(Node::new());

            let mut file_pages = self.file_length / PAGE_SIZE as u64;
            // Account for a partial page saved at the end of the file.
            if self.file_length % PAGE_SIZE as u64 != 0 {
                file_pages += 1;
            }

            if u64::from(page_num) <= file_pages {
                self.file
                    .seek(SeekFrom::Start(u64::from(page_num) * PAGE_SIZE as u64))?;
                let mut filled = 0;
                while filled < PAGE_SIZE {
                    let read = self.file.read(&mut node.data[filled..])?;
                    if read == 0 {
                        break; // short read: the tail stays zeroed
                    }
                    filled += read;
                }
                trace!(page_num, bytes = filled, "Loaded page");
            }

            self.slots[page_num as usize] = Some(node);

            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        // The slot was filled above if it was empty.
        Ok(self.slots[page_num as usize].as_mut().unwrap())
    }

    /// Writes the cached page back to disk, exactly [`PAGE_SIZE`] bytes.
    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        let node = self
            .slots
            .get(page_num as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or_else(|| err!(Storage, "Tried to flush null page."))?;

        self.file
            .seek(SeekFrom::Start(u64::from(page_num) * PAGE_SIZE as u64))?;
        self.file.write_all(&node.data)?;
        trace!(page_num, "Flushed page");
        Ok(())
    }

    /// New pages always go onto the end of the file; until deletion exists
    /// there are no free pages to recycle.
    pub fn get_unused_page_num(&self) -> u32 {
        self.num_pages
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    pub fn is_cached(&self, page_num: u32) -> bool {
        self.slots
            .get(page_num as usize)
            .map_or(false, |slot| slot.is_some())
    }
}
