use std::fmt;

use crate::storage::row::Row;

/// A prepared statement, ready to execute against the table.
#[derive(Debug, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

/// Prepare-time failures. These are user-visible and recoverable: the REPL
/// prints the message and keeps reading.
#[derive(Debug, PartialEq, Eq)]
pub enum PrepareError {
    SyntaxError,
    StringTooLong,
    NegativeId,
    UnrecognizedStatement(String),
}

impl fmt::Display for PrepareError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrepareError::SyntaxError => {
                write!(f, "Syntax error. Could not parse statement.")
            }
            PrepareError::StringTooLong => write!(f, "String is too long."),
            PrepareError::NegativeId => write!(f, "ID must be positive."),
            PrepareError::UnrecognizedStatement(input) => {
                write!(f, "Unrecognized keyword at start of '{}'.", input)
            }
        }
    }
}
