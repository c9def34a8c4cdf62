use std::fmt;

/// Constructs an [`Error`] variant from a format string.
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        crate::errors::Error::$variant(format!($($arg)*))
    };
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A fault in the storage engine. These are the fatal tier: the REPL
    /// prints the message and terminates without flushing.
    Storage(String),
    /// Inserting a key that is already present in the tree.
    DuplicateKey,
    /// No room left for another row.
    TableFull,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error. {}", e),
            Error::Storage(msg) => write!(f, "{}", msg),
            Error::DuplicateKey => write!(f, "Duplicate key."),
            Error::TableFull => write!(f, "Table full."),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
