use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use microdb::repl;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(
    name = "microdb",
    version = VERSION,
    about = "Single-file single-table database with a tiny SQL REPL."
)]
struct Cli {
    /// Path to the database file.
    filename: Option<PathBuf>,

    /// Where diagnostics go; stdout is reserved for the REPL protocol.
    #[arg(long, env = "MICRODB_LOG", default_value = "microdb.log")]
    log_file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&cli.log_file)
        .expect("Failed to open log file");

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .init();

    let Some(filename) = cli.filename else {
        println!("Must supply a database filename.");
        process::exit(1);
    };

    if let Err(e) = repl::start(&filename) {
        // The fatal tier: print the short message and terminate. Nothing is
        // flushed past this point.
        println!("{}", e);
        process::exit(1);
    }
}
