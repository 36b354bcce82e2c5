//! Directory walking and run totals

use crate::codec::Codec;
use crate::error::{CompressionError, Result};
use crate::formats::is_supported_image;
use crate::processing::{compress_image, CompressionConfig, CompressionResult, Outcome};
use crate::report::{ReportEvent, Reporter};
use crate::validation::{validate_input_path, InputKind};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-run tally. Only supported files count towards `total_files`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total_files: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub skipped_count: usize,
    pub unsupported_count: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        self.total_files += 1;
        match outcome {
            Outcome::Skipped => self.skipped_count += 1,
            Outcome::Success | Outcome::SuccessOverTarget => self.success_count += 1,
            Outcome::Failed | Outcome::Error(_) => self.fail_count += 1,
        }
    }

    pub fn record_unsupported(&mut self) {
        self.unsupported_count += 1;
    }
}

/// Compresses a single file or a whole directory tree into `output_dir`.
///
/// A single file is written as `output_dir/<file name>` whatever its
/// extension; `preserve_structure` only matters for directories.
pub fn compress_input<C: Codec + ?Sized>(
    codec: &C,
    input: &Path,
    output_dir: &Path,
    config: &CompressionConfig,
    preserve_structure: bool,
    reporter: &dyn Reporter,
) -> Result<BatchSummary> {
    match validate_input_path(input)? {
        InputKind::Directory => {
            compress_tree(codec, input, output_dir, config, preserve_structure, reporter)
        }
        InputKind::File => {
            let file_name = input
                .file_name()
                .ok_or_else(|| CompressionError::InvalidPath(input.to_path_buf()))?;
            let output_path = output_dir.join(file_name);

            let mut summary = BatchSummary::default();
            let result = compress_entry(codec, input, &output_path, config, reporter);
            summary.record(&result.outcome);
            reporter.report(ReportEvent::BatchFinished(summary));
            Ok(summary)
        }
    }
}

/// Walks `input_dir` depth-first and compresses every supported image.
///
/// # Arguments
/// * `preserve_structure` - Mirror subdirectories under `output_dir`; when
///   false every output lands directly in `output_dir` and later files
///   overwrite earlier ones with the same name
///
/// # Returns
/// * `Ok(BatchSummary)` once the walk is over. Per-file failures are counted,
///   not returned; only an unusable input or output directory is an `Err`.
pub fn compress_tree<C: Codec + ?Sized>(
    codec: &C,
    input_dir: &Path,
    output_dir: &Path,
    config: &CompressionConfig,
    preserve_structure: bool,
    reporter: &dyn Reporter,
) -> Result<BatchSummary> {
    let input_root = input_dir
        .canonicalize()
        .map_err(|_| CompressionError::FileNotFound(input_dir.to_path_buf()))?;
    fs::create_dir_all(output_dir)
        .map_err(|_| CompressionError::DirectoryCreationFailed(output_dir.to_path_buf()))?;
    let output_root = output_dir
        .canonicalize()
        .map_err(|_| CompressionError::DirectoryCreationFailed(output_dir.to_path_buf()))?;

    reporter.report(ReportEvent::Scanning {
        root: input_dir.to_path_buf(),
    });

    let mut summary = BatchSummary::default();
    // Outputs written into a nested output directory must not be picked up
    // as inputs. Each directory listing is read in full before its entries
    // are yielded, so writing into the input root itself is safe.
    let walker = WalkDir::new(&input_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || entry.path() != output_root);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                reporter.report(ReportEvent::WalkFailed {
                    path: err.path().map(Path::to_path_buf),
                    message: err.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_supported_image(path) {
            summary.record_unsupported();
            reporter.report(ReportEvent::Unsupported {
                path: path.to_path_buf(),
            });
            continue;
        }

        let result = match derive_output_path(&input_root, path, &output_root, preserve_structure) {
            Ok(output_path) => compress_entry(codec, path, &output_path, config, reporter),
            Err(e) => {
                let result = CompressionResult::error(path, e.to_string());
                reporter.report(ReportEvent::Finished(result.clone()));
                result
            }
        };
        summary.record(&result.outcome);
    }

    reporter.report(ReportEvent::BatchFinished(summary));
    Ok(summary)
}

fn compress_entry<C: Codec + ?Sized>(
    codec: &C,
    input_path: &Path,
    output_path: &Path,
    config: &CompressionConfig,
    reporter: &dyn Reporter,
) -> CompressionResult {
    reporter.report(ReportEvent::Started {
        path: input_path.to_path_buf(),
    });
    let result = compress_image(codec, input_path, output_path, config, reporter);
    reporter.report(ReportEvent::Finished(result.clone()));
    result
}

/// Output location for `file` found under `input_root`, before format
/// normalization rewrites its extension.
pub fn derive_output_path(
    input_root: &Path,
    file: &Path,
    output_dir: &Path,
    preserve_structure: bool,
) -> Result<PathBuf> {
    if preserve_structure {
        let relative = file
            .strip_prefix(input_root)
            .map_err(|_| CompressionError::InvalidPath(file.to_path_buf()))?;
        if relative.as_os_str().is_empty() {
            return Err(CompressionError::InvalidPath(file.to_path_buf()));
        }
        Ok(output_dir.join(relative))
    } else {
        let file_name = file
            .file_name()
            .ok_or_else(|| CompressionError::InvalidPath(file.to_path_buf()))?;
        Ok(output_dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DecodedImage;
    use crate::formats::{OutputFormat, SourceFormat};
    use crate::processing::CompressionTarget;
    use crate::report::{NullReporter, RecordingReporter};
    use image::DynamicImage;
    use tempfile::TempDir;

    /// Rejects empty files and files starting with `bad`, encodes everything
    /// else to `quality * 10` bytes
    struct StubCodec;

    impl Codec for StubCodec {
        fn decode(&self, path: &Path) -> Result<DecodedImage> {
            let bytes = fs::read(path)?;
            if bytes.is_empty() || bytes.starts_with(b"bad") {
                return Err(CompressionError::UnsupportedFormat("stub".to_string()));
            }
            let format = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(SourceFormat::from_extension)
                .unwrap_or(SourceFormat::Jpeg);
            Ok(DecodedImage {
                image: DynamicImage::new_rgb8(2, 2),
                format,
            })
        }

        fn encode(&self, _image: &DynamicImage, _format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
            Ok(vec![0u8; usize::from(quality) * 10])
        }
    }

    fn half() -> CompressionConfig {
        CompressionConfig::new(CompressionTarget::Percent(50.0), None, None, false).unwrap()
    }

    fn write_file(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_summary_record() {
        let mut summary = BatchSummary::default();
        summary.record(&Outcome::Success);
        summary.record(&Outcome::SuccessOverTarget);
        summary.record(&Outcome::Failed);
        summary.record(&Outcome::Error("x".to_string()));
        summary.record(&Outcome::Skipped);
        summary.record_unsupported();

        assert_eq!(
            summary,
            BatchSummary {
                total_files: 5,
                success_count: 2,
                fail_count: 2,
                skipped_count: 1,
                unsupported_count: 1,
            }
        );
    }

    #[test]
    fn test_derive_output_path() {
        let root = Path::new("/in");
        let file = Path::new("/in/a/b/photo.jpg");
        let out = Path::new("/out");

        assert_eq!(
            derive_output_path(root, file, out, true).unwrap(),
            PathBuf::from("/out/a/b/photo.jpg")
        );
        assert_eq!(
            derive_output_path(root, file, out, false).unwrap(),
            PathBuf::from("/out/photo.jpg")
        );
        assert!(matches!(
            derive_output_path(Path::new("/elsewhere"), file, out, true),
            Err(CompressionError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_tree_counts_supported_only() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        for name in ["a.jpg", "b.JPEG", "c.png", "sub/d.webp", "sub/deeper/e.jpg"] {
            write_file(&input.join(name), &[1u8; 10_000]);
        }
        write_file(&input.join("notes.txt"), b"hello");
        write_file(&input.join("sub/anim.gif"), b"GIF89a");

        let reporter = RecordingReporter::new();
        let output = temp_dir.path().join("out");
        let summary = compress_tree(&StubCodec, &input, &output, &half(), true, &reporter).unwrap();

        assert_eq!(summary.total_files, 5);
        assert_eq!(summary.success_count, 5);
        assert_eq!(summary.unsupported_count, 2);
        assert!(output.join("sub/deeper/e.jpg").exists());
        assert!(output.join("c.jpg").exists());
        assert!(matches!(
            reporter.events().last(),
            Some(ReportEvent::BatchFinished(s)) if *s == summary
        ));
    }

    #[test]
    fn test_tree_continues_after_errors() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        write_file(&input.join("1_bad.jpg"), b"bad bytes");
        write_file(&input.join("2_empty.jpg"), b"");
        write_file(&input.join("3_good.jpg"), &[1u8; 10_000]);

        let reporter = RecordingReporter::new();
        let summary =
            compress_tree(&StubCodec, &input, &temp_dir.path().join("out"), &half(), true, &reporter)
                .unwrap();

        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.fail_count, 2);
        assert_eq!(reporter.results().len(), 3);
    }

    #[test]
    fn test_nested_output_dir_is_not_walked() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().to_path_buf();
        write_file(&input.join("photo.jpg"), &[1u8; 10_000]);
        write_file(&input.join("out/previous.jpg"), &[1u8; 10_000]);

        let summary =
            compress_tree(&StubCodec, &input, &input.join("out"), &half(), true, &NullReporter)
                .unwrap();

        assert_eq!(summary.total_files, 1);
    }

    #[test]
    fn test_flatten_writes_into_output_root() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in");
        write_file(&input.join("a/photo.jpg"), &[1u8; 10_000]);
        write_file(&input.join("b/photo.jpg"), &[1u8; 10_000]);

        let output = temp_dir.path().join("out");
        let summary = compress_tree(&StubCodec, &input, &output, &half(), false, &NullReporter)
            .unwrap();

        assert_eq!(summary.success_count, 2);
        let written: Vec<_> = fs::read_dir(&output).unwrap().collect();
        assert_eq!(written.len(), 1);
        assert!(output.join("photo.jpg").is_file());
    }

    #[test]
    fn test_compress_input_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.jpg");
        write_file(&input, &[1u8; 10_000]);
        let output = temp_dir.path().join("out");

        let summary =
            compress_input(&StubCodec, &input, &output, &half(), true, &NullReporter).unwrap();

        assert_eq!(summary.total_files, 1);
        assert_eq!(summary.success_count, 1);
        assert!(output.join("photo.jpg").is_file());
    }

    #[test]
    fn test_compress_input_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = compress_input(
            &StubCodec,
            &temp_dir.path().join("missing"),
            temp_dir.path(),
            &half(),
            true,
            &NullReporter,
        );
        assert!(matches!(result, Err(CompressionError::FileNotFound(_))));
    }
}
