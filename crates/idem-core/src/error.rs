use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Config serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{} does not exist or is not a directory", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Config file {} already exists. Use --force to overwrite.", .0.display())]
    ConfigExists(PathBuf),

    #[error("Missing config file {}. Run `idem init` first.", .0.display())]
    ConfigMissing(PathBuf),

    #[error("Failed to hash {}: {source}", .path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
