//! OS-specific pieces of the filesystem boundary: file identity, nanosecond
//! mtimes and symlink creation.

use std::fs::Metadata;
use std::io;
use std::path::Path;

/// `(inode, device)` for a file. Zero on platforms without the concept.
#[cfg(unix)]
pub fn file_identity(metadata: &Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (metadata.ino(), metadata.dev())
}

#[cfg(not(unix))]
pub fn file_identity(_metadata: &Metadata) -> (u64, u64) {
    (0, 0)
}

/// Modification time in nanoseconds since the Unix epoch.
#[cfg(unix)]
pub fn mtime_ns(metadata: &Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    metadata
        .mtime()
        .saturating_mul(1_000_000_000)
        .saturating_add(metadata.mtime_nsec())
}

#[cfg(not(unix))]
pub fn mtime_ns(metadata: &Metadata) -> i64 {
    use std::time::UNIX_EPOCH;
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

#[cfg(unix)]
pub fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
pub fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}
