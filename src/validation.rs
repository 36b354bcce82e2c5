//! Input and output path checks, and size string parsing

use crate::error::{CompressionError, Result};
use parse_size::Config;
use std::fs;
use std::path::{Path, PathBuf};

/// What an input path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    File,
    Directory,
}

/// Validates that a file or directory exists at the given path.
///
/// # Example
/// ```
/// use std::path::Path;
/// use img_budget::validation::validate_file_exists;
///
/// let result = validate_file_exists(Path::new("nonexistent.jpg"));
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Validate an input path and classify it as a single file or a directory
pub fn validate_input_path(path: &Path) -> Result<InputKind> {
    validate_file_exists(path)?;

    let metadata = fs::metadata(path).map_err(|_| CompressionError::FileNotFound(path.to_path_buf()))?;
    if metadata.is_dir() {
        Ok(InputKind::Directory)
    } else if metadata.is_file() {
        Ok(InputKind::File)
    } else {
        Err(CompressionError::UnsupportedFormat(format!(
            "{} is neither a regular file nor a directory",
            path.display()
        )))
    }
}

/// Create the output directory if it doesn't exist and return its canonical path
pub fn prepare_output_dir(path: &Path) -> Result<PathBuf> {
    fs::create_dir_all(path).map_err(|_| CompressionError::DirectoryCreationFailed(path.to_path_buf()))?;
    path.canonicalize()
        .map_err(|_| CompressionError::DirectoryCreationFailed(path.to_path_buf()))
}

/// Parse a human-written size such as `500KB`, `1.5 MB` or `204800`.
///
/// Units are binary (1 KB = 1024 bytes) and case-insensitive. Zero is
/// rejected.
pub fn parse_size(input: &str) -> Result<u64> {
    let bytes = Config::new()
        .with_binary()
        .parse_size(input.trim())
        .map_err(|_| CompressionError::InvalidSize(input.to_string()))?;
    if bytes == 0 {
        return Err(CompressionError::InvalidSize(input.to_string()));
    }
    Ok(bytes)
}
