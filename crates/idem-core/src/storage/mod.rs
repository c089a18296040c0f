pub mod models;
pub mod queries;
pub mod sqlite;
pub mod status;

pub use models::{DirStatus, Directory, DuplicateGroup, FileMetadata, FileRecord, HashRecord, StatusSnapshot};
pub use sqlite::Database;
