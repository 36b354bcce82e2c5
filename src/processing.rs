//! Single-image compression.
//!
//! Loads an asset, skips it when it already fits, normalizes its format, runs
//! the quality search and writes the winning encoding atomically. Every
//! failure is folded into the returned [`CompressionResult`].

use crate::codec::Codec;
use crate::error::{CompressionError, Result};
use crate::formats::{plan_normalization, ColorMode, OutputFormat, SourceFormat};
use crate::report::{ReportEvent, Reporter};
use crate::search::{search, QualityRange, SearchOutcome};
use image::DynamicImage;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Size budget for one run, applied to every asset against its own size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionTarget {
    /// Percentage of the original file size
    Percent(f64),
    /// Absolute ceiling in bytes
    AbsoluteBytes(u64),
}

impl CompressionTarget {
    pub fn percent(percent: f64) -> Result<Self> {
        if !percent.is_finite() || percent <= 0.0 {
            return Err(CompressionError::InvalidTarget(format!(
                "percentage must be greater than 0, got {}",
                percent
            )));
        }
        Ok(CompressionTarget::Percent(percent))
    }

    pub fn absolute_bytes(bytes: u64) -> Result<Self> {
        if bytes == 0 {
            return Err(CompressionError::InvalidTarget(
                "maximum size must be greater than 0 bytes".to_string(),
            ));
        }
        Ok(CompressionTarget::AbsoluteBytes(bytes))
    }

    /// Byte budget for an asset of `original_size` bytes, rounded down
    pub fn target_bytes(&self, original_size: u64) -> u64 {
        match *self {
            CompressionTarget::Percent(percent) => {
                (original_size as f64 * percent / 100.0).floor() as u64
            }
            CompressionTarget::AbsoluteBytes(bytes) => bytes,
        }
    }
}

impl fmt::Display for CompressionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionTarget::Percent(percent) => write!(f, "{}% of original size", percent),
            CompressionTarget::AbsoluteBytes(bytes) => {
                write!(f, "at most {}", crate::utils::format_file_size(*bytes))
            }
        }
    }
}

/// What to do when no quality in range meets the budget
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissPolicy {
    /// Write nothing and report `Failed`
    #[default]
    Discard,
    /// Write the lowest-quality encoding anyway and report `SuccessOverTarget`
    KeepClosest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionConfig {
    pub target: CompressionTarget,
    pub range: QualityRange,
    pub miss_policy: MissPolicy,
}

impl CompressionConfig {
    pub fn new(
        target: CompressionTarget,
        min_quality: Option<u8>,
        max_quality: Option<u8>,
        keep_closest: bool,
    ) -> Result<Self> {
        let defaults = QualityRange::default();
        let range = QualityRange::new(
            min_quality.unwrap_or(defaults.min()),
            max_quality.unwrap_or(defaults.max()),
        )?;

        let miss_policy = if keep_closest {
            MissPolicy::KeepClosest
        } else {
            MissPolicy::Discard
        };

        Ok(Self {
            target,
            range,
            miss_policy,
        })
    }
}

/// Classification of one compression attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Already within budget; nothing written
    Skipped,
    Success,
    /// Written above budget under [`MissPolicy::KeepClosest`]
    SuccessOverTarget,
    /// No quality in range met the budget; nothing written
    Failed,
    /// Decode, encode or filesystem failure
    Error(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::SuccessOverTarget)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    pub input_path: PathBuf,
    pub outcome: Outcome,
    pub output_path: Option<PathBuf>,
    pub original_size: Option<u64>,
    pub target_bytes: Option<u64>,
    pub final_size: Option<u64>,
    pub quality_used: Option<u8>,
}

impl CompressionResult {
    fn new(input_path: &Path, outcome: Outcome) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            outcome,
            output_path: None,
            original_size: None,
            target_bytes: None,
            final_size: None,
            quality_used: None,
        }
    }

    pub fn skipped(input_path: &Path, original_size: u64, target_bytes: u64) -> Self {
        Self {
            original_size: Some(original_size),
            target_bytes: Some(target_bytes),
            ..Self::new(input_path, Outcome::Skipped)
        }
    }

    pub fn error(input_path: &Path, message: String) -> Self {
        Self::new(input_path, Outcome::Error(message))
    }
}

/// A decoded input image and the facts about it the compressor needs
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub source_path: PathBuf,
    pub format: SourceFormat,
    pub color_mode: ColorMode,
    pub original_size: u64,
    pub image: DynamicImage,
}

/// Reads the on-disk size of `path` and decodes it with `codec`.
pub fn load_image_asset<C: Codec + ?Sized>(codec: &C, path: &Path) -> Result<ImageAsset> {
    let original_size = fs::metadata(path)
        .map_err(|_| CompressionError::FileNotFound(path.to_path_buf()))?
        .len();
    let decoded = codec.decode(path)?;

    Ok(ImageAsset {
        source_path: path.to_path_buf(),
        format: decoded.format,
        color_mode: ColorMode::from_color_type(decoded.image.color()),
        original_size,
        image: decoded.image,
    })
}

/// Pixels and destination ready for trial encodes
#[derive(Debug, Clone)]
pub struct NormalizedAsset {
    pub source_path: PathBuf,
    pub image: DynamicImage,
    pub format: OutputFormat,
    pub output_path: PathBuf,
    pub transparency_dropped: bool,
}

/// Applies the format normalization plan to an asset's pixels.
pub fn normalize(asset: ImageAsset, output_path: &Path) -> NormalizedAsset {
    let plan = plan_normalization(asset.format, asset.color_mode, output_path);
    NormalizedAsset {
        source_path: asset.source_path,
        image: plan.color_mode.apply(asset.image),
        format: plan.format,
        output_path: plan.output_path,
        transparency_dropped: plan.transparency_dropped,
    }
}

/// Compresses one image to the configured budget.
///
/// # Arguments
/// * `codec` - Decoder and trial encoder
/// * `input_path` - Image to compress
/// * `output_path` - Destination; its extension may be rewritten by normalization
/// * `config` - Budget, quality range and miss policy
/// * `reporter` - Receives transparency warnings and trial events
///
/// # Returns
/// * A classified [`CompressionResult`]. Failures never escape as `Err`; they
///   become [`Outcome::Error`] and leave no file behind.
pub fn compress_image<C: Codec + ?Sized>(
    codec: &C,
    input_path: &Path,
    output_path: &Path,
    config: &CompressionConfig,
    reporter: &dyn Reporter,
) -> CompressionResult {
    match try_compress_image(codec, input_path, output_path, config, reporter) {
        Ok(result) => result,
        Err(e) => CompressionResult::error(input_path, e.to_string()),
    }
}

fn try_compress_image<C: Codec + ?Sized>(
    codec: &C,
    input_path: &Path,
    output_path: &Path,
    config: &CompressionConfig,
    reporter: &dyn Reporter,
) -> Result<CompressionResult> {
    let asset = load_image_asset(codec, input_path)?;
    let original_size = asset.original_size;
    let target_bytes = config.target.target_bytes(original_size);

    if original_size <= target_bytes {
        return Ok(CompressionResult::skipped(input_path, original_size, target_bytes));
    }

    let normalized = normalize(asset, output_path);
    if normalized.transparency_dropped {
        reporter.report(ReportEvent::TransparencyDropped {
            path: normalized.source_path.clone(),
        });
    }

    let searched = search(
        codec,
        &normalized.image,
        normalized.format,
        target_bytes,
        config.range,
        |trial| {
            reporter.report(ReportEvent::Trial {
                path: normalized.source_path.clone(),
                trial,
                target_bytes,
            })
        },
    )?;

    let (outcome, quality, bytes) = match searched {
        SearchOutcome::Found { quality, bytes, .. } => (Outcome::Success, quality, bytes),
        SearchOutcome::NotFound => match config.miss_policy {
            MissPolicy::Discard => {
                return Ok(CompressionResult {
                    original_size: Some(original_size),
                    target_bytes: Some(target_bytes),
                    ..CompressionResult::new(input_path, Outcome::Failed)
                });
            }
            MissPolicy::KeepClosest => {
                // Smallest output when size grows with quality
                let quality = config.range.min();
                let bytes = codec.encode(&normalized.image, normalized.format, quality)?;
                (Outcome::SuccessOverTarget, quality, bytes)
            }
        },
    };

    let final_size = persist_bytes(&normalized.output_path, &bytes)?;

    Ok(CompressionResult {
        input_path: normalized.source_path,
        outcome,
        output_path: Some(normalized.output_path),
        original_size: Some(original_size),
        target_bytes: Some(target_bytes),
        final_size: Some(final_size),
        quality_used: Some(quality),
    })
}

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// so a failed write never leaves a partial file at `path`.
///
/// # Returns
/// * Number of bytes written
pub fn persist_bytes(path: &Path, bytes: &[u8]) -> Result<u64> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .map_err(|_| CompressionError::DirectoryCreationFailed(parent.to_path_buf()))?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    let file = temp.persist(path).map_err(|e| CompressionError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    // Temp files are created 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    #[cfg(not(unix))]
    drop(file);

    Ok(bytes.len() as u64)
}
