use crate::config::non_overlapping_directories;
use crate::error::{Error, Result};
use crate::storage::Database;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Validate the source roots and enqueue each one as a pending directory.
///
/// Roots are canonicalized and must be valid UTF-8; a root nested inside
/// another is dropped since the outer scan reaches it. Known roots are left
/// untouched. Returns the roots that were kept, whether or not they were new.
pub fn init_roots(db: &Database, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut canonical = Vec::with_capacity(roots.len());
    for root in roots {
        let path = fs::canonicalize(root).map_err(|_| Error::InvalidRoot(root.clone()))?;
        if !path.is_dir() || path.to_str().is_none() {
            return Err(Error::InvalidRoot(root.clone()));
        }
        canonical.push(path);
    }

    let kept = non_overlapping_directories(canonical);
    let inserted = db.with_transaction(|db| {
        let mut inserted = 0;
        for root in &kept {
            inserted += db.insert_directory(&root.to_string_lossy())?;
        }
        Ok::<_, Error>(inserted)
    })?;

    if inserted > 0 {
        info!("Added {} new root directories", inserted);
    }
    debug!("Roots: {:?}", kept);
    Ok(kept)
}
