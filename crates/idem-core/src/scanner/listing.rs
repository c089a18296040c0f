use crate::platform;
use glob::Pattern;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, trace, warn};

/// Stat of a regular file, captured when its directory is listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub path: PathBuf,
    pub size: u64,
    pub mtime_ns: i64,
    pub inode: u64,
    pub device: u64,
}

impl FileStat {
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let (inode, device) = platform::file_identity(metadata);
        Self {
            path,
            size: metadata.len(),
            mtime_ns: platform::mtime_ns(metadata),
            inode,
            device,
        }
    }
}

impl AsRef<Path> for FileStat {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Immediate children of one directory, split by kind. Every path in
/// `subdirs` and `files` is valid UTF-8.
#[derive(Debug, Default)]
pub struct DirListing {
    pub subdirs: Vec<PathBuf>,
    pub files: Vec<FileStat>,
    pub symlinks_skipped: usize,
    pub empty_skipped: usize,
    pub vanished: usize,
    pub non_utf8_skipped: usize,
}

pub fn compile_ignore_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

pub(crate) fn is_ignored(path: &Path, ignore_patterns: &[Pattern]) -> bool {
    ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(path))
}

/// List the immediate (non-recursive) children of `dir`.
///
/// Symlinks, zero-length files, entries whose path is not valid UTF-8 and
/// entries that disappear before they can be stat'ed are counted and skipped. Only a failure to open `dir` itself is
/// returned as an error.
pub fn list_directory(dir: &Path, ignore_patterns: &[Pattern]) -> io::Result<DirListing> {
    let mut listing = DirListing::default();

    for entry_result in fs::read_dir(dir)? {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error reading entry in directory {}: {}", dir.display(), err);
                listing.vanished += 1;
                continue;
            }
        };

        let path = entry.path();
        if path.to_str().is_none() {
            warn!("Skipping {}: path is not valid UTF-8", path.display());
            listing.non_utf8_skipped += 1;
            continue;
        }
        if is_ignored(&path, ignore_patterns) {
            trace!("Ignoring {}", path.display());
            continue;
        }

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err);
                listing.vanished += 1;
                continue;
            }
        };

        if file_type.is_symlink() {
            info!("Skipping: {} as it is a soft link.", path.display());
            listing.symlinks_skipped += 1;
        } else if file_type.is_dir() {
            listing.subdirs.push(path);
        } else if file_type.is_file() {
            match fs::symlink_metadata(&path) {
                Ok(metadata) if metadata.len() == 0 => {
                    trace!("Skipping {}: zero length", path.display());
                    listing.empty_skipped += 1;
                }
                Ok(metadata) => listing.files.push(FileStat::from_metadata(path, &metadata)),
                Err(err) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    listing.vanished += 1;
                }
            }
        }
    }

    listing.subdirs.sort();
    listing.files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_directory_splits_children() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub").join("nested.txt"), "nested").unwrap();
        fs::write(root.join("b.txt"), "bbb").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("empty.txt"), "").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("a.txt"), root.join("link.txt")).unwrap();

        let listing = list_directory(root, &[]).unwrap();
        assert_eq!(listing.subdirs, vec![root.join("sub")]);
        let names: Vec<_> = listing.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(names, vec![root.join("a.txt"), root.join("b.txt")]);
        assert_eq!(listing.files[1].size, 3);
        assert_eq!(listing.empty_skipped, 1);
        #[cfg(unix)]
        assert_eq!(listing.symlinks_skipped, 1);
    }

    #[test]
    fn test_list_directory_honors_ignore_patterns() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join("keep.txt"), "keep").unwrap();
        fs::write(root.join("skip.tmp"), "skip").unwrap();

        let patterns = compile_ignore_patterns(&[
            "**/.git".to_string(),
            "**/*.tmp".to_string(),
            "[".to_string(),
        ]);
        assert_eq!(patterns.len(), 2);

        let listing = list_directory(root, &patterns).unwrap();
        assert!(listing.subdirs.is_empty());
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].path, root.join("keep.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_directory_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let odd = root.join(OsStr::from_bytes(b"odd\xff"));
        fs::create_dir(&odd).unwrap();
        fs::write(root.join(OsStr::from_bytes(b"file\xfe.txt")), "x").unwrap();
        fs::write(root.join("plain.txt"), "plain").unwrap();

        let listing = list_directory(root, &[]).unwrap();
        assert!(listing.subdirs.is_empty());
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.non_utf8_skipped, 2);
    }

    #[test]
    fn test_list_missing_directory_is_not_found() {
        let tmp = tempdir().unwrap();
        let err = list_directory(&tmp.path().join("gone"), &[]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
