//! Error type shared by the library

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("WebP encoding error: {0}")]
    WebpEncoding(String),

    #[error("Invalid quality range: {0}..={1}. Bounds must satisfy 1 <= min <= max <= 100")]
    InvalidQualityRange(u8, u8),

    #[error("Invalid compression target: {0}")]
    InvalidTarget(String),

    #[error("Invalid size: {0:?}. Expected a number with an optional B, KB, MB or GB suffix")]
    InvalidSize(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Cannot derive an output path for {0}")]
    InvalidPath(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("Failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, CompressionError>;
