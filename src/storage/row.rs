//! # Row Management
//!
//! The one table schema is fixed: `{id INT, username VARCHAR(32),
//! email VARCHAR(255)}`. A row is stored as a packed 291-byte record with
//! NUL-padded string fields.

use std::fmt;

pub const COLUMN_USERNAME_SIZE: usize = 32;
pub const COLUMN_EMAIL_SIZE: usize = 255;

pub const ID_SIZE: usize = std::mem::size_of::<u32>();
pub const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE;
pub const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE;

pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Total size of a serialized row, in bytes.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// A single row of the `users` table.
///
/// String fields are validated against their column widths at prepare time;
/// the serializer assumes the bounds already hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    /// Writes the packed 291-byte representation into `dest`.
    ///
    /// Fields shorter than their slot are padded with NUL bytes; a field that
    /// exactly fills its slot carries no terminator.
    pub fn serialize(&self, dest: &mut [u8; ROW_SIZE]) {
        debug_assert!(self.username.len() <= USERNAME_SIZE);
        debug_assert!(self.email.len() <= EMAIL_SIZE);

        dest.fill(0);
        dest[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());

        let username = self.username.as_bytes();
        dest[USERNAME_OFFSET..USERNAME_OFFSET + username.len()].copy_from_slice(username);

        let email = self.email.as_bytes();
        dest[EMAIL_OFFSET..EMAIL_OFFSET + email.len()].copy_from_slice(email);
    }

    /// Reads a row back from its packed representation, trimming the NUL
    /// padding from the string fields.
    pub fn deserialize(src: &[u8]) -> Self {
        debug_assert_eq!(src.len(), ROW_SIZE);

        let mut id_bytes = [0u8; ID_SIZE];
        id_bytes.copy_from_slice(&src[ID_OFFSET..ID_OFFSET + ID_SIZE]);

        Row {
            id: u32::from_le_bytes(id_bytes),
            username: fixed_to_string(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]),
            email: fixed_to_string(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]),
        }
    }
}

fn fixed_to_string(field: &[u8]) -> String {
    String::from_utf8_lossy(field)
        .trim_end_matches(char::from(0))
        .to_string()
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}
