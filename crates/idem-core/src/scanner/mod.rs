pub mod listing;
pub mod roots;
pub mod scheduler;

pub use listing::{compile_ignore_patterns, list_directory, DirListing, FileStat};
pub use roots::init_roots;
pub use scheduler::{ScanEpoch, ScanOptions, ScanSummary, Scheduler};
