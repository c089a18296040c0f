use crate::size::parse_size;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "idem")]
#[command(version, about = "A resumable duplicate-file indexer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Worker settings that override the config for one run.
#[derive(Debug, Default, Args)]
pub struct Tuning {
    /// Hashing threads
    #[arg(long)]
    pub max_workers: Option<usize>,
    /// Hashing tasks allowed in flight at once
    #[arg(long)]
    pub max_inflight: Option<usize>,
    /// Read buffer size, e.g. 64K or 1M
    #[arg(long, value_parser = parse_size)]
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write idem.toml for the given source directories
    Init {
        #[arg(required = true)]
        sources: Vec<PathBuf>,
        /// Destination root for the link tree
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        db_path: Option<PathBuf>,
        #[arg(long)]
        prefix_length: Option<usize>,
        #[command(flatten)]
        tuning: Tuning,
        /// Files stored per transaction
        #[arg(long)]
        batch_size: Option<usize>,
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
    /// Index every configured root, resuming an interrupted scan
    Index {
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Print index statistics
    Status {
        #[arg(long)]
        json: bool,
    },
    /// List the duplicate groups wasting the most space
    Duplicates {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Link every file under the configured roots into the destination tree
    Organize {
        /// Create all bucket directories first
        #[arg(long)]
        populate: bool,
    },
    /// Print the configured roots
    Show,
    /// Print the version
    Version,
}
