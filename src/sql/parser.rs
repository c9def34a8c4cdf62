use lazy_static::lazy_static;
use regex::Regex;

use super::statement::{PrepareError, Statement};
use crate::storage::row::{Row, COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE};

lazy_static! {
    /// `insert <id> <username> <email>`. Anything after the third argument
    /// is ignored, scanf-style.
    static ref INSERT_REGEX: Regex = Regex::new(r"^insert\s+(-?\d+)\s+(\S+)\s+(\S+)").unwrap();
}

/// Turns one line of input into a [`Statement`].
///
/// Keywords are case-sensitive: `select` must match the whole line, `insert`
/// is recognized by prefix.
pub fn prepare_statement(input: &str) -> Result<Statement, PrepareError> {
    if input == "select" {
        return Ok(Statement::Select);
    }
    if input.starts_with("insert") {
        return prepare_insert(input);
    }
    Err(PrepareError::UnrecognizedStatement(input.to_string()))
}

fn prepare_insert(input: &str) -> Result<Statement, PrepareError> {
    let captures = INSERT_REGEX
        .captures(input)
        .ok_or(PrepareError::SyntaxError)?;

    // Parsed as signed so `-1` reports a negative id, not a syntax error.
    let id: i64 = captures[1].parse().map_err(|_| PrepareError::SyntaxError)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::SyntaxError)?;

    let username = &captures[2];
    let email = &captures[3];
    if username.len() > COLUMN_USERNAME_SIZE || email.len() > COLUMN_EMAIL_SIZE {
        return Err(PrepareError::StringTooLong);
    }

    Ok(Statement::Insert(Row {
        id,
        username: username.to_string(),
        email: email.to_string(),
    }))
}
