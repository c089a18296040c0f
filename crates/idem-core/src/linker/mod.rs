//! Content-addressed link tree.
//!
//! Every hashed file gets a symlink at `dest_root/<prefix>/<digest>-NN`,
//! where `<prefix>` is the first `prefix_length` hex characters of the
//! digest and `NN` the lowest free serial in that bucket.

pub mod bucket;
pub mod lock;

pub use bucket::{
    collect_serials, first_available_serial, link_into_bucket, populate_buckets, LinkOutcome,
};

use crate::config::validate_prefix_length;
use crate::error::{Error, Result};
use crate::hasher::HashPipeline;
use crate::progress::{ProgressReporter, SilentReporter};
use crate::scanner::listing::{compile_ignore_patterns, is_ignored};
use glob::Pattern;
use serde::Serialize;
use std::cell::Cell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeReport {
    pub linked: usize,
    pub already_present: usize,
    pub symlinks_skipped: usize,
    pub empty_skipped: usize,
    pub failed: usize,
}

pub struct Linker<'a> {
    dest_root: PathBuf,
    prefix_length: usize,
    pipeline: HashPipeline,
    ignore_patterns: Vec<Pattern>,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> Linker<'a> {
    pub fn new(
        dest_root: &Path,
        prefix_length: usize,
        max_workers: usize,
        max_in_flight: usize,
        chunk_size: usize,
    ) -> Result<Self> {
        validate_prefix_length(prefix_length)?;
        Ok(Self {
            dest_root: dest_root.to_path_buf(),
            prefix_length,
            pipeline: HashPipeline::new(max_workers, max_in_flight, chunk_size)?,
            ignore_patterns: Vec::new(),
            reporter: &SilentReporter,
        })
    }

    pub fn with_ignore_patterns(mut self, globs: &[String]) -> Self {
        self.ignore_patterns = compile_ignore_patterns(globs);
        self
    }

    pub fn with_reporter(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn populate(&self) -> Result<usize> {
        populate_buckets(&self.dest_root, self.prefix_length)
    }

    /// Hash every regular, non-empty file under `source_root` and link it
    /// into the destination tree.
    pub fn organize(&self, source_root: &Path) -> Result<OrganizeReport> {
        let root = fs::canonicalize(source_root)
            .map_err(|_| Error::InvalidRoot(source_root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(Error::InvalidRoot(source_root.to_path_buf()));
        }
        fs::create_dir_all(&self.dest_root)?;

        info!(
            "Organizing {} into {}",
            root.display(),
            self.dest_root.display()
        );
        self.reporter.on_organize_start(&root);

        let symlinks = Cell::new(0usize);
        let empty = Cell::new(0usize);
        let walk_errors = Cell::new(0usize);

        let files = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_ignored(entry.path(), &self.ignore_patterns))
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_symlink() => {
                    info!("Skipping: {} as it is a soft link.", entry.path().display());
                    symlinks.set(symlinks.get() + 1);
                    None
                }
                Ok(entry) if entry.file_type().is_file() => match entry.metadata() {
                    Ok(metadata) if metadata.len() == 0 => {
                        info!("Skipping: {} has zero length.", entry.path().display());
                        empty.set(empty.get() + 1);
                        None
                    }
                    Ok(_) => Some(entry.into_path()),
                    Err(err) => {
                        warn!("Skipping {}: {}", entry.path().display(), err);
                        walk_errors.set(walk_errors.get() + 1);
                        None
                    }
                },
                Ok(_) => None,
                Err(err) => {
                    warn!("Walk error under {}: {}", root.display(), err);
                    walk_errors.set(walk_errors.get() + 1);
                    None
                }
            });

        let mut report = OrganizeReport::default();
        let mut processed = 0;
        for outcome in self.pipeline.hash_all(files) {
            processed += 1;
            match outcome {
                Ok(hashed) => {
                    match link_into_bucket(
                        &hashed.item,
                        &hashed.digest,
                        &self.dest_root,
                        self.prefix_length,
                    ) {
                        Ok(LinkOutcome::Linked(_)) => report.linked += 1,
                        Ok(LinkOutcome::AlreadyPresent) => report.already_present += 1,
                        Ok(LinkOutcome::SourceIsSymlink) => report.symlinks_skipped += 1,
                        Err(Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                            warn!("Skipping {}: {}", hashed.item.display(), err);
                            report.failed += 1;
                        }
                        Err(err) => return Err(err),
                    }
                }
                Err(failure) => {
                    warn!("Skipping {}", failure);
                    report.failed += 1;
                }
            }
            self.reporter.on_file_linked(processed);
        }

        report.symlinks_skipped += symlinks.get();
        report.empty_skipped += empty.get();
        report.failed += walk_errors.get();

        info!(
            "Organize complete: {} linked, {} already present, {} failed",
            report.linked, report.already_present, report.failed
        );
        self.reporter.on_organize_complete(&report);
        Ok(report)
    }
}

/// Hash every file under `source_root` and link it into `dest_root`.
pub fn organize(
    source_root: &Path,
    dest_root: &Path,
    prefix_length: usize,
    max_workers: usize,
    max_in_flight: usize,
    chunk_size: usize,
) -> Result<OrganizeReport> {
    Linker::new(dest_root, prefix_length, max_workers, max_in_flight, chunk_size)?
        .organize(source_root)
}
