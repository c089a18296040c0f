use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/idem.log";

/// First set variable among `keys`, else `default`. `IDEM_*` names come
/// first; the unprefixed ones are kept for existing `.env` files.
fn env_setting(keys: &[&str], default: &str) -> String {
    keys.iter()
        .find_map(|key| env::var(key).ok().filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default.to_string())
}

/// Split a log file path into the directory the appender writes in and the
/// file name inside it.
fn log_file_location(path: &str) -> (PathBuf, PathBuf) {
    let path = Path::new(path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("idem.log"));
    (dir, file)
}

/// Console (stderr) plus non-blocking file logging. Keep the returned guard
/// alive until exit so buffered lines reach the file.
pub fn init_logger() -> impl Drop {
    let filter = env_setting(&["IDEM_LOG", "TRACING_LEVEL"], "info");
    let log_file = env_setting(&["IDEM_LOG_FILE", "LOG_FILE_PATH"], DEFAULT_LOG_FILE);
    let (log_dir, log_name) = log_file_location(&log_file);

    let file_appender = tracing_appender::rolling::never(&log_dir, &log_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(EnvFilter::new(filter))
        .init();

    debug!("Logging to stderr and {}", log_dir.join(&log_name).display());

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_location_splits_path() {
        assert_eq!(
            log_file_location("./logs/idem.log"),
            (PathBuf::from("./logs"), PathBuf::from("idem.log"))
        );
        assert_eq!(
            log_file_location("/var/log/idem/run.log"),
            (PathBuf::from("/var/log/idem"), PathBuf::from("run.log"))
        );
        assert_eq!(
            log_file_location("plain.log"),
            (PathBuf::from("."), PathBuf::from("plain.log"))
        );
    }

    #[test]
    fn test_env_setting_falls_back_in_order() {
        assert_eq!(
            env_setting(&["IDEM_TEST_UNSET_A", "IDEM_TEST_UNSET_B"], "info"),
            "info"
        );
        env::set_var("IDEM_TEST_LOGGING_SECOND", "debug");
        assert_eq!(
            env_setting(&["IDEM_TEST_UNSET_A", "IDEM_TEST_LOGGING_SECOND"], "info"),
            "debug"
        );
        env::set_var("IDEM_TEST_LOGGING_FIRST", "trace");
        assert_eq!(
            env_setting(&["IDEM_TEST_LOGGING_FIRST", "IDEM_TEST_LOGGING_SECOND"], "info"),
            "trace"
        );
    }
}
