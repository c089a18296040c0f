use crate::error::{Error, Result};
use config::{Config, Environment, File as ConfigFile, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

pub const DEFAULT_CONFIG_FILE: &str = "idem.toml";

/// Longest bucket prefix accepted; 16^4 buckets is already 65536 directories.
pub const MAX_PREFIX_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub root_paths: Vec<PathBuf>,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_dest_root")]
    pub dest_root: PathBuf,
    #[serde(default = "default_prefix_length")]
    pub prefix_length: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("idem.db")
}

fn default_dest_root() -> PathBuf {
    PathBuf::from("root")
}

fn default_prefix_length() -> usize {
    3
}

pub fn default_max_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn default_max_inflight() -> usize {
    200
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_batch_size() -> usize {
    1000
}

impl AppConfig {
    pub fn new(root_paths: Vec<PathBuf>) -> Self {
        Self {
            root_paths,
            db_path: default_db_path(),
            dest_root: default_dest_root(),
            prefix_length: default_prefix_length(),
            max_workers: default_max_workers(),
            max_inflight: default_max_inflight(),
            chunk_size: default_chunk_size(),
            batch_size: default_batch_size(),
            ignore_patterns: Vec::new(),
        }
    }

    /// Load `idem.toml` from the working directory, with `IDEM_*` overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigMissing(path.to_path_buf()));
        }

        let builder = Config::builder()
            .add_source(ConfigFile::from(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix("IDEM")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("root_paths")
                    .with_list_parse_key("ignore_patterns"),
            )
            .build()?;

        let config = builder.try_deserialize::<AppConfig>()?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as TOML. An existing file is only replaced when `force` is set.
    pub fn save(&self, path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(Error::ConfigExists(path.to_path_buf()));
        }
        self.validate()?;
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_paths.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one root path is required".to_string(),
            ));
        }
        positive("max_workers", self.max_workers)?;
        positive("max_inflight", self.max_inflight)?;
        positive("chunk_size", self.chunk_size)?;
        positive("batch_size", self.batch_size)?;
        validate_prefix_length(self.prefix_length)?;
        Ok(())
    }
}

pub(crate) fn positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidArgument(format!("{name} must be positive")));
    }
    Ok(())
}

pub(crate) fn validate_prefix_length(prefix_length: usize) -> Result<()> {
    if !(1..=MAX_PREFIX_LENGTH).contains(&prefix_length) {
        return Err(Error::InvalidArgument(format!(
            "prefix_length must be between 1 and {MAX_PREFIX_LENGTH}, got {prefix_length}"
        )));
    }
    Ok(())
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for dir in dirs {
        if result.iter().any(|kept| dir.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !kept.starts_with(&dir));
        result.push(dir);
    }

    result
}
