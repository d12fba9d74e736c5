use std::path::PathBuf;

use rup_core::IntrinsicsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read camera file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse camera file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write camera file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize camera parameters: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("Invalid camera parameters: {0}")]
    Invalid(#[from] IntrinsicsError),
}

impl ConfigError {
    /// Missing or unreadable source, as opposed to a file with bad values
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ConfigError::Read { .. } | ConfigError::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
