//! The REPL (Read-Eval-Print-Loop) module.
//!
//! Reads one line at a time from stdin, dispatches meta-commands (`.exit`,
//! `.btree`, `.constants`) and SQL-like statements (`insert`, `select`), and
//! prints the result. stdout carries only this protocol; diagnostics go to
//! the tracing log.

use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::info;

use crate::errors::Error;
use crate::sql::parser::prepare_statement;
use crate::sql::statement::Statement;
use crate::storage::btree::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use crate::storage::row::ROW_SIZE;
use crate::storage::table::{self, Table};

/// Runs the loop against the database at `path` until `.exit`.
///
/// Recoverable errors (bad statements, duplicate keys) are printed and the
/// loop continues. Anything else is returned to the caller, which is
/// expected to print it and terminate: the engine state is not trustworthy
/// past a storage fault, so nothing is flushed on that path.
pub fn start(path: &Path) -> Result<(), Error> {
    info!(?path, "Opening database");
    let mut table = Table::db_open(path)?;

    let mut stdin = io::stdin().lock();
    let mut input = String::new();

    loop {
        print_prompt()?;

        input.clear();
        match stdin.read_line(&mut input) {
            Ok(0) | Err(_) => {
                // The original treats end of input as a read failure.
                return Err(err!(Storage, "Error reading input"));
            }
            Ok(_) => {}
        }
        let line = input.trim_end();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('.') {
            match line {
                ".exit" => {
                    table.db_close()?;
                    info!("Closed database");
                    return Ok(());
                }
                ".btree" => print!("{}", table::dump_tree(&mut table)?),
                ".constants" => print_constants(),
                _ => println!("Unrecognized command '{}'.", line),
            }
            continue;
        }

        let statement = match prepare_statement(line) {
            Ok(statement) => statement,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match execute_statement(&mut table, statement) {
            Ok(()) => println!("Executed."),
            Err(e @ (Error::DuplicateKey | Error::TableFull)) => println!("Error: {}", e),
            Err(e) => return Err(e),
        }
    }
}

fn execute_statement(table: &mut Table, statement: Statement) -> Result<(), Error> {
    match statement {
        Statement::Insert(row) => table::insert_row(table, &row),
        Statement::Select => {
            for row in table::scan_all(table)? {
                println!("{}", row);
            }
            Ok(())
        }
    }
}

fn print_prompt() -> io::Result<()> {
    print!("db > ");
    io::stdout().flush()
}

fn print_constants() {
    println!("ROW_SIZE: {}", ROW_SIZE);
    println!("COMMON_NODE_HEADER_SIZE: {}", COMMON_NODE_HEADER_SIZE);
    println!("LEAF_NODE_HEADER_SIZE: {}", LEAF_NODE_HEADER_SIZE);
    println!("LEAF_NODE_CELL_SIZE: {}", LEAF_NODE_CELL_SIZE);
    println!("LEAF_NODE_SPACE_FOR_CELLS: {}", LEAF_NODE_SPACE_FOR_CELLS);
    println!("LEAF_NODE_MAX_CELLS: {}", LEAF_NODE_MAX_CELLS);
}
