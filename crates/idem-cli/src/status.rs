use chrono::{DateTime, Local};
use colored::*;
use idem_core::storage::{DuplicateGroup, StatusSnapshot};
use std::fmt::Write;

const NANOS_PER_SEC: i64 = 1_000_000_000;

pub fn format_epoch(epoch_ns: Option<i64>) -> String {
    let Some(ns) = epoch_ns else {
        return "never".to_string();
    };
    let secs = ns.div_euclid(NANOS_PER_SEC);
    let nanos = ns.rem_euclid(NANOS_PER_SEC) as u32;
    match DateTime::from_timestamp(secs, nanos) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => format!("{ns} ns"),
    }
}

pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value.abs() >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title.bold().underline());
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<24} {}", label, value);
}

fn count_or_alert(value: i64) -> ColoredString {
    if value > 0 {
        value.to_string().red()
    } else {
        value.to_string().green()
    }
}

pub fn render_status(s: &StatusSnapshot) -> String {
    let mut out = String::new();

    heading(&mut out, "Scan");
    row(&mut out, "Last completed scan", format_epoch(s.last_completed_scan));
    row(
        &mut out,
        "Indexing in progress",
        if s.indexing_in_progress {
            "yes".yellow()
        } else {
            "no".normal()
        },
    );

    heading(&mut out, "Directories");
    row(&mut out, "Total", s.total_dirs);
    row(&mut out, "Pending", s.pending_dirs);
    row(&mut out, "Indexing", s.indexing_dirs);
    row(&mut out, "Done", s.done_dirs);

    heading(&mut out, "Files");
    row(&mut out, "Total", s.total_files);
    row(&mut out, "Seen in last scan", s.files_seen_last_scan);
    row(&mut out, "Stale", s.stale_files.to_string().yellow());
    row(&mut out, "Total size", format_bytes(s.total_bytes));

    heading(&mut out, "Duplicates");
    row(&mut out, "Unique hashes", s.unique_hashes.to_string().cyan());
    row(&mut out, "Duplicate groups", s.duplicate_groups.to_string().red());
    row(&mut out, "Duplicate files", s.duplicate_files.to_string().red());
    row(&mut out, "Unresolved groups", count_or_alert(s.unresolved_groups));
    row(&mut out, "Unresolved files", count_or_alert(s.unresolved_files));

    heading(&mut out, "Integrity");
    row(&mut out, "Orphaned files", count_or_alert(s.orphaned_files));
    row(&mut out, "Orphaned hashes", count_or_alert(s.orphaned_hashes));

    out
}

pub fn render_duplicate_group(group: &DuplicateGroup, paths: &[String]) -> String {
    let mut out = String::new();
    let marker = if group.unresolved {
        " (unresolved)".yellow().to_string()
    } else {
        String::new()
    };
    let _ = writeln!(
        out,
        "{} {} x {} wasting {}{}",
        group.hash[..12.min(group.hash.len())].cyan(),
        group.file_count,
        format_bytes(group.size),
        format_bytes(group.wasted_bytes).red(),
        marker
    );
    for path in paths {
        let _ = writeln!(out, "    {path}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_epoch_never() {
        assert_eq!(format_epoch(None), "never");
        assert_ne!(format_epoch(Some(1_700_000_000_000_000_000)), "never");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_render_status_has_every_section() {
        colored::control::set_override(false);
        let snapshot = StatusSnapshot {
            total_files: 3,
            unique_hashes: 2,
            duplicate_groups: 1,
            duplicate_files: 2,
            ..StatusSnapshot::default()
        };
        let text = render_status(&snapshot);
        for section in ["Scan", "Directories", "Files", "Duplicates", "Integrity"] {
            assert!(text.contains(section), "missing section {section}");
        }
        assert!(text.contains("never"));
        assert!(text.contains("Duplicate groups"));
    }
}
