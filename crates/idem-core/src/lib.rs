pub mod config;
pub mod error;
pub mod hasher;
pub mod linker;
pub mod platform;
pub mod progress;
pub mod scanner;
pub mod storage;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use hasher::{HashPipeline, HashStream};
pub use linker::{organize, LinkOutcome, Linker, OrganizeReport};
pub use progress::{ProgressReporter, SilentReporter};
pub use scanner::{init_roots, ScanEpoch, ScanOptions, ScanSummary, Scheduler};
pub use storage::Database;
