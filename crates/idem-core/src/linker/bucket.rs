use super::lock::BucketLock;
use crate::config::validate_prefix_length;
use crate::error::{Error, Result};
use crate::platform;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new link was created at this path.
    Linked(PathBuf),
    /// The bucket's `-01` entry already represents this file.
    AlreadyPresent,
    /// Symbolic links are not original content and are never linked.
    SourceIsSymlink,
}

pub fn bucket_dir(dest_root: &Path, digest: &str, prefix_length: usize) -> PathBuf {
    dest_root.join(&digest[..prefix_length])
}

pub fn serial_name(digest: &str, serial: u32) -> String {
    format!("{digest}-{serial:02}")
}

/// Serials already used by `<digest>-NN` entries in `bucket`.
pub fn collect_serials(bucket: &Path, digest: &str) -> io::Result<BTreeSet<u32>> {
    let mut serials = BTreeSet::new();
    for entry in fs::read_dir(bucket)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let serial = name
            .strip_prefix(digest)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(serial) = serial.filter(|&n| n > 0) {
            serials.insert(serial);
        }
    }
    Ok(serials)
}

/// Lowest positive serial not in `serials`; gaps are reused.
pub fn first_available_serial(serials: &BTreeSet<u32>) -> u32 {
    let mut serial = 1;
    while serials.contains(&serial) {
        serial += 1;
    }
    serial
}

/// Whether the `<digest>-01` entry already links to a file with the same
/// name and size as `source`.
fn is_already_present(bucket: &Path, digest: &str, source: &Path, source_size: u64) -> bool {
    let original_link = bucket.join(serial_name(digest, 1));
    let Ok(original) = fs::read_link(&original_link) else {
        return false;
    };
    if original.file_name() != source.file_name() {
        return false;
    }
    match fs::metadata(&original) {
        Ok(metadata) => metadata.len() == source_size,
        Err(_) => false,
    }
}

/// Place a link to `source` under `dest_root/<prefix>/<digest>-NN`.
///
/// The bucket lock is held from reading the existing serials until the link
/// exists or the skip is decided.
pub fn link_into_bucket(
    source: &Path,
    digest: &str,
    dest_root: &Path,
    prefix_length: usize,
) -> Result<LinkOutcome> {
    validate_prefix_length(prefix_length)?;
    if digest.len() < prefix_length || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidArgument(format!(
            "'{digest}' is not a hex digest of at least {prefix_length} characters"
        )));
    }

    let metadata = fs::symlink_metadata(source)?;
    if metadata.file_type().is_symlink() {
        info!("Skipping: {} as it is a soft link.", source.display());
        return Ok(LinkOutcome::SourceIsSymlink);
    }

    let target = if source.is_absolute() {
        source.to_path_buf()
    } else {
        env::current_dir()?.join(source)
    };

    let bucket = bucket_dir(dest_root, digest, prefix_length);
    fs::create_dir_all(&bucket)?;
    let _lock = BucketLock::acquire(&bucket)?;

    if is_already_present(&bucket, digest, &target, metadata.len()) {
        info!("Skipping: {} is duplicate.", source.display());
        return Ok(LinkOutcome::AlreadyPresent);
    }

    let serials = collect_serials(&bucket, digest)?;
    let link = bucket.join(serial_name(digest, first_available_serial(&serials)));
    platform::symlink_file(&target, &link)?;
    debug!("Linked {} -> {}", link.display(), target.display());
    Ok(LinkOutcome::Linked(link))
}

/// Create every bucket directory for `prefix_length` (16^prefix_length of them).
pub fn populate_buckets(dest_root: &Path, prefix_length: usize) -> Result<usize> {
    validate_prefix_length(prefix_length)?;
    let total = 16usize.pow(prefix_length as u32);
    for n in 0..total {
        fs::create_dir_all(dest_root.join(format!("{n:0prefix_length$x}")))?;
    }
    debug!("Populated {} buckets under {}", total, dest_root.display());
    Ok(total)
}
