use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a JSON config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create a new snapshot of the configured backup disk in the store.
    #[command(alias = "b")]
    Backup {
        /// Skip the interactive offer to write a log.md for the snapshot.
        #[arg(long)]
        no_log: bool,
    },

    /// Reconstruct a target tree from a stored snapshot.
    #[command(alias = "r")]
    Restore {
        /// Name of the snapshot work directory in the store.
        #[arg(required = true)]
        name: String,

        /// The directory to restore onto.
        #[arg(short, long, default_value = "/")]
        target: PathBuf,

        /// Delete target files that are absent from the snapshot.
        #[arg(long)]
        delete: bool,

        /// Simulate the sync and report what would change before applying it.
        #[arg(long)]
        dry_run: bool,
    },

    /// List the snapshots in the store, paginated.
    #[command(alias = "l")]
    List {
        /// Entries per page. [0 = everything on one page]
        #[arg(long, default_value_t = 5)]
        page_size: usize,

        /// Page to show; negative counts from the end (-1 = last page).
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        page: i64,

        /// Highlight one entry on the page and print its log: 1-based from
        /// the front, negative from the back, 0 selects nothing.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        select: i64,
    },
}

/// Parse command-line arguments and return the invocation to execute.
///
/// `--help` and `--version` are handled by `clap` and exit the process.
pub fn run() -> Result<Args, Box<dyn std::error::Error>> {
    Ok(Args::parse())
}
