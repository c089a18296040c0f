use idem_core::{OrganizeReport, ProgressReporter, ScanSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using an indicatif spinner.
///
/// The number of files is never known up front (directories are discovered
/// as the queue drains), so both phases use a spinner with a running count.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn update(&self, message: String) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message);
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, recovered_directories: usize) {
        let message = if recovered_directories > 0 {
            format!("Resuming scan ({recovered_directories} directories recovered)...")
        } else {
            "Scanning...".to_string()
        };
        self.start_spinner(message);
    }

    fn on_directory_start(&self, path: &str) {
        self.update(format!("Indexing {path}"));
    }

    fn on_file_hashed(&self, files_hashed: usize, _path: &Path) {
        if files_hashed % 64 == 0 {
            self.update(format!("Indexing... {files_hashed} files hashed"));
        }
    }

    fn on_scan_complete(&self, summary: &ScanSummary) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Index complete: {} directories, {} files in {:.2}s",
            summary.directories,
            summary.files_hashed,
            summary.duration.as_secs_f64()
        );
    }

    fn on_organize_start(&self, source_root: &Path) {
        self.start_spinner(format!("Organizing {}...", source_root.display()));
    }

    fn on_file_linked(&self, processed: usize) {
        if processed % 64 == 0 {
            self.update(format!("Organizing... {processed} files processed"));
        }
    }

    fn on_organize_complete(&self, report: &OrganizeReport) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Organize complete: {} linked, {} already present, {} failed",
            report.linked, report.already_present, report.failed
        );
    }
}
