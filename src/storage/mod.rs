//! The storage engine: pager, node codec, row serializer, cursor, and the
//! table facade over the B+-tree.

pub mod btree;
pub mod cursor;
pub mod pager;
pub mod row;
pub mod table;
