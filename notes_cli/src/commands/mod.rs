pub mod notes;
pub mod package;
pub mod tools;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] notes_core::config::ConfigError),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("{0}")]
    ToolError(String),

    #[error("Core library error: {0}")]
    Core(#[from] notes_core::error::ConnectorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, CommandError>;
