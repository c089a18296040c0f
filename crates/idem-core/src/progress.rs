use crate::linker::OrganizeReport;
use crate::scanner::ScanSummary;
use std::path::Path;

/// Trait for reporting scan and organize progress.
///
/// The CLI implements it with indicatif. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _recovered_directories: usize) {}
    fn on_directory_start(&self, _path: &str) {}
    fn on_file_hashed(&self, _files_hashed: usize, _path: &Path) {}
    fn on_directory_done(&self, _path: &str, _files: usize) {}
    fn on_scan_complete(&self, _summary: &ScanSummary) {}
    fn on_organize_start(&self, _source_root: &Path) {}
    fn on_file_linked(&self, _processed: usize) {}
    fn on_organize_complete(&self, _report: &OrganizeReport) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
