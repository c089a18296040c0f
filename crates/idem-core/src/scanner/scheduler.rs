use super::listing::{compile_ignore_patterns, list_directory, DirListing, FileStat};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::hasher::HashPipeline;
use crate::progress::{ProgressReporter, SilentReporter};
use crate::storage::{Database, Directory, FileMetadata};
use glob::Pattern;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timestamp chosen once per scheduler run and stamped on everything that
/// run completes. Nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanEpoch(pub i64);

impl ScanEpoch {
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        ScanEpoch(
            now.timestamp_nanos_opt()
                .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000)),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_workers: usize,
    pub max_in_flight: usize,
    pub chunk_size: usize,
    pub batch_size: usize,
    pub ignore_patterns: Vec<String>,
}

impl ScanOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_workers: config.max_workers,
            max_in_flight: config.max_inflight,
            chunk_size: config.chunk_size,
            batch_size: config.batch_size,
            ignore_patterns: config.ignore_patterns.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub epoch: ScanEpoch,
    pub recovered_directories: usize,
    pub directories: usize,
    pub files_hashed: usize,
    pub files_failed: usize,
    pub symlinks_skipped: usize,
    pub empty_skipped: usize,
    pub non_utf8_skipped: usize,
    pub duration: Duration,
}

impl ScanSummary {
    fn new(epoch: ScanEpoch) -> Self {
        Self {
            epoch,
            recovered_directories: 0,
            directories: 0,
            files_hashed: 0,
            files_failed: 0,
            symlinks_skipped: 0,
            empty_skipped: 0,
            non_utf8_skipped: 0,
            duration: Duration::ZERO,
        }
    }
}

/// SQLite integers are signed. Identity values above `i64::MAX` are stored
/// bit-for-bit and read back negative; the mapping is one-to-one, so rescans
/// still compare equal.
fn to_sql_int(value: u64) -> i64 {
    i64::from_ne_bytes(value.to_ne_bytes())
}

/// Drives the persisted directory queue: pending → indexing → done.
pub struct Scheduler<'a> {
    db: &'a Database,
    options: ScanOptions,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> Scheduler<'a> {
    pub fn new(db: &'a Database, options: ScanOptions) -> Self {
        Self {
            db,
            options,
            reporter: &SilentReporter,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn run_scan(&self) -> Result<ScanSummary> {
        self.run_scan_at(ScanEpoch::now())
    }

    /// Process the queue until no pending directory remains.
    ///
    /// Directories left `indexing` by an interrupted run are reset first. If
    /// directories are still pending afterwards, the pass they belong to is
    /// resumed under its stored epoch and `epoch` is ignored. Otherwise every
    /// finished directory is re-queued and a fresh full pass starts at `epoch`.
    pub fn run_scan_at(&self, epoch: ScanEpoch) -> Result<ScanSummary> {
        if self.options.batch_size == 0 {
            return Err(Error::InvalidArgument("batch_size must be positive".to_string()));
        }
        let pipeline = HashPipeline::new(
            self.options.max_workers,
            self.options.max_in_flight,
            self.options.chunk_size,
        )?;
        let ignore_patterns = compile_ignore_patterns(&self.options.ignore_patterns);

        let start = Instant::now();
        let (recovered, epoch) = self.db.with_transaction(|db| {
            let recovered = db.reset_in_flight_directories()?;
            if db.next_pending_directory()?.is_some() {
                if let Some(stored) = db.pass_epoch()? {
                    debug!("Resuming pass with epoch {}", stored);
                    return Ok::<_, Error>((recovered, ScanEpoch(stored)));
                }
            } else {
                let requeued = db.requeue_done_directories()?;
                debug!("Starting a full pass over {} directories", requeued);
            }
            db.set_pass_epoch(epoch.0)?;
            Ok((recovered, epoch))
        })?;

        let mut summary = ScanSummary::new(epoch);
        summary.recovered_directories = recovered;
        if recovered > 0 {
            info!("Recovered {} directories from an interrupted scan", recovered);
        }

        info!("Scanning with epoch {}", epoch.0);
        self.reporter.on_scan_start(summary.recovered_directories);

        while let Some(dir) = self.db.next_pending_directory()? {
            self.index_directory(&pipeline, &ignore_patterns, &dir, epoch, &mut summary)?;
            summary.directories += 1;
        }

        summary.duration = start.elapsed();
        info!(
            "Scan complete in {:.2}s: {} directories, {} files hashed, {} failed",
            summary.duration.as_secs_f64(),
            summary.directories,
            summary.files_hashed,
            summary.files_failed,
        );
        self.reporter.on_scan_complete(&summary);
        Ok(summary)
    }

    fn index_directory(
        &self,
        pipeline: &HashPipeline,
        ignore_patterns: &[Pattern],
        dir: &Directory,
        epoch: ScanEpoch,
        summary: &mut ScanSummary,
    ) -> Result<()> {
        self.db
            .with_transaction(|db| db.mark_directory_indexing(dir.id))?;
        debug!("Indexing dir: {}", dir.path);
        self.reporter.on_directory_start(&dir.path);

        let listing = match list_directory(Path::new(&dir.path), ignore_patterns) {
            Ok(listing) => listing,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) =>
            {
                warn!("Cannot list {}: {}; treating it as empty", dir.path, err);
                DirListing::default()
            }
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.path, err),
                )
                .into())
            }
        };
        summary.symlinks_skipped += listing.symlinks_skipped;
        summary.empty_skipped += listing.empty_skipped;
        summary.non_utf8_skipped += listing.non_utf8_skipped;

        self.db.begin()?;
        match self.process_listing(pipeline, dir, listing, epoch, summary) {
            Ok(file_count) => {
                self.db.commit()?;
                self.reporter.on_directory_done(&dir.path, file_count);
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = self.db.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Runs inside an open transaction, which it may commit and reopen every
    /// `batch_size` files. Returns the number of files stored.
    fn process_listing(
        &self,
        pipeline: &HashPipeline,
        dir: &Directory,
        listing: DirListing,
        epoch: ScanEpoch,
        summary: &mut ScanSummary,
    ) -> Result<usize> {
        for subdir in &listing.subdirs {
            self.db.insert_directory(&subdir.to_string_lossy())?;
        }

        let seen: Vec<String> = listing
            .files
            .iter()
            .map(|f| f.path.to_string_lossy().into_owned())
            .collect();

        let mut stored = 0;
        let mut uncommitted = 0;
        for outcome in pipeline.hash_all(listing.files) {
            match outcome {
                Ok(hashed) => {
                    self.store_file(dir.id, &hashed.item, &hashed.digest)?;
                    stored += 1;
                    uncommitted += 1;
                    summary.files_hashed += 1;
                    self.reporter
                        .on_file_hashed(summary.files_hashed, &hashed.item.path);

                    if uncommitted >= self.options.batch_size {
                        self.db.commit()?;
                        self.db.begin()?;
                        debug!("Committed batch of {} files in {}", uncommitted, dir.path);
                        uncommitted = 0;
                    }
                }
                Err(failure) => {
                    warn!("Skipping {}", failure);
                    summary.files_failed += 1;
                }
            }
        }

        self.db.mark_files_seen(dir.id, &seen, epoch.0)?;
        self.db.mark_directory_done(dir.id, epoch.0)?;
        Ok(stored)
    }

    fn store_file(&self, dir_id: i64, stat: &FileStat, digest: &str) -> Result<()> {
        let hash_id = self.db.intern_hash(digest, stat.size as i64)?;
        self.db.upsert_file(&FileMetadata {
            path: stat.path.to_string_lossy().into_owned(),
            dir_id,
            size: stat.size as i64,
            mtime_ns: stat.mtime_ns,
            inode: to_sql_int(stat.inode),
            device: to_sql_int(stat.device),
            hash_id,
        })?;
        Ok(())
    }
}
