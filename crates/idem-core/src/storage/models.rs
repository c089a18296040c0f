use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;

/// Position of a directory in the scan state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirStatus {
    Pending,
    Indexing,
    Done,
}

impl DirStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirStatus::Pending => "pending",
            DirStatus::Indexing => "indexing",
            DirStatus::Done => "done",
        }
    }
}

impl fmt::Display for DirStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for DirStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DirStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(DirStatus::Pending),
            "indexing" => Ok(DirStatus::Indexing),
            "done" => Ok(DirStatus::Done),
            other => Err(FromSqlError::Other(
                format!("unknown directory status '{other}'").into(),
            )),
        }
    }
}

/// A directory known to the scan queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub id: i64,
    pub path: String,
    pub status: DirStatus,
    pub last_seen: Option<i64>,
}

/// An interned content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    pub id: i64,
    pub hash: String,
    pub size: i64,
}

/// A stored file row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub dir_id: i64,
    pub size: i64,
    pub mtime_ns: i64,
    pub inode: i64,
    pub device: i64,
    pub hash_id: i64,
    pub last_seen: Option<i64>,
}

/// The fields an upsert compares against the stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: String,
    pub dir_id: i64,
    pub size: i64,
    pub mtime_ns: i64,
    pub inode: i64,
    pub device: i64,
    pub hash_id: i64,
}

/// Files sharing one digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub hash_id: i64,
    pub hash: String,
    pub size: i64,
    pub file_count: i64,
    pub wasted_bytes: i64,
    /// Members disagree on recorded size.
    pub unresolved: bool,
}

/// Aggregate view of the index, produced without side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub last_completed_scan: Option<i64>,
    pub indexing_in_progress: bool,

    pub total_dirs: i64,
    pub pending_dirs: i64,
    pub indexing_dirs: i64,
    pub done_dirs: i64,

    pub total_files: i64,
    pub files_seen_last_scan: i64,
    pub stale_files: i64,
    pub total_bytes: i64,

    pub unique_hashes: i64,
    pub duplicate_groups: i64,
    pub duplicate_files: i64,
    pub unresolved_groups: i64,
    pub unresolved_files: i64,

    pub orphaned_files: i64,
    pub orphaned_hashes: i64,
}
