//! Image format handling and output normalization
//!
//! Decides, once per asset and before any trial encode, which format and
//! color mode the quality search will encode to. PNG sources are re-encoded
//! as JPEG, and alpha is flattened whenever the chosen format cannot carry it.

use crate::constants::SUPPORTED_IMAGE_EXTENSIONS;
use image::{ColorType, DynamicImage, ImageFormat};
use std::fmt;
use std::path::{Path, PathBuf};

/// Formats the compressor accepts as input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
}

impl SourceFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(SourceFormat::Jpeg),
            "png" => Some(SourceFormat::Png),
            "webp" => Some(SourceFormat::WebP),
            _ => None,
        }
    }

    /// Maps the container format detected by the decoder
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(SourceFormat::Jpeg),
            ImageFormat::Png => Some(SourceFormat::Png),
            ImageFormat::WebP => Some(SourceFormat::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
            SourceFormat::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

/// Lossy formats the quality search can encode to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JPEG, no alpha channel
    Jpeg,
    /// Lossy WebP, alpha preserved
    WebP,
}

impl OutputFormat {
    /// Returns the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn supports_alpha(&self) -> bool {
        matches!(self, OutputFormat::WebP)
    }

    /// PNG has no quality knob, so it is re-encoded as JPEG.
    pub fn for_source(source: SourceFormat) -> Self {
        match source {
            SourceFormat::Jpeg | SourceFormat::Png => OutputFormat::Jpeg,
            SourceFormat::WebP => OutputFormat::WebP,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

/// Channel layout of a decoded image, independent of bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
    Luma,
    LumaAlpha,
}

impl ColorMode {
    pub fn from_color_type(color: ColorType) -> Self {
        match (color.has_color(), color.has_alpha()) {
            (true, false) => ColorMode::Rgb,
            (true, true) => ColorMode::Rgba,
            (false, false) => ColorMode::Luma,
            (false, true) => ColorMode::LumaAlpha,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, ColorMode::Rgba | ColorMode::LumaAlpha)
    }

    /// Converts pixel data to this mode at 8 bits per channel
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        match (*self, image) {
            (ColorMode::Rgb, img @ DynamicImage::ImageRgb8(_))
            | (ColorMode::Rgba, img @ DynamicImage::ImageRgba8(_))
            | (ColorMode::Luma, img @ DynamicImage::ImageLuma8(_))
            | (ColorMode::LumaAlpha, img @ DynamicImage::ImageLumaA8(_)) => img,
            (ColorMode::Rgb, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
            (ColorMode::Rgba, img) => DynamicImage::ImageRgba8(img.to_rgba8()),
            (ColorMode::Luma, img) => DynamicImage::ImageLuma8(img.to_luma8()),
            (ColorMode::LumaAlpha, img) => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorMode::Rgb => "RGB",
            ColorMode::Rgba => "RGBA",
            ColorMode::Luma => "L",
            ColorMode::LumaAlpha => "LA",
        };
        write!(f, "{}", name)
    }
}

/// Format, mode and destination every trial encode of one asset shares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    pub format: OutputFormat,
    pub color_mode: ColorMode,
    pub output_path: PathBuf,
    /// Alpha was present and will be discarded
    pub transparency_dropped: bool,
}

/// Decides the effective output format, color mode and path for an input.
///
/// The output path keeps its directory and stem; only the extension is
/// rewritten, and only when the format changes.
pub fn plan_normalization(
    source: SourceFormat,
    color_mode: ColorMode,
    output_path: &Path,
) -> Normalization {
    let format = OutputFormat::for_source(source);
    let transparency_dropped = color_mode.has_alpha() && !format.supports_alpha();
    let effective_mode = if transparency_dropped {
        ColorMode::Rgb
    } else {
        color_mode
    };

    let output_path = if source == SourceFormat::Png {
        output_path.with_extension(format.extension())
    } else {
        output_path.to_path_buf()
    };

    Normalization {
        format,
        color_mode: effective_mode,
        output_path,
        transparency_dropped,
    }
}

/// Check if a file path carries one of the supported image extensions
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(SourceFormat::from_extension("JPG"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("jpeg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("Png"), Some(SourceFormat::Png));
        assert_eq!(SourceFormat::from_extension("webp"), Some(SourceFormat::WebP));
        assert_eq!(SourceFormat::from_extension("gif"), None);
    }

    #[test]
    fn test_color_mode_from_color_type() {
        assert_eq!(ColorMode::from_color_type(ColorType::Rgb8), ColorMode::Rgb);
        assert_eq!(ColorMode::from_color_type(ColorType::Rgba16), ColorMode::Rgba);
        assert_eq!(ColorMode::from_color_type(ColorType::L8), ColorMode::Luma);
        assert_eq!(ColorMode::from_color_type(ColorType::La16), ColorMode::LumaAlpha);
    }

    #[test]
    fn test_png_is_forced_to_jpeg() {
        let plan = plan_normalization(SourceFormat::Png, ColorMode::Rgb, Path::new("out/a.png"));
        assert_eq!(plan.format, OutputFormat::Jpeg);
        assert_eq!(plan.output_path, Path::new("out/a.jpg"));
        assert!(!plan.transparency_dropped);
    }

    #[test]
    fn test_png_alpha_is_flattened() {
        for mode in [ColorMode::Rgba, ColorMode::LumaAlpha] {
            let plan = plan_normalization(SourceFormat::Png, mode, Path::new("a.PNG"));
            assert_eq!(plan.color_mode, ColorMode::Rgb);
            assert!(plan.transparency_dropped);
            assert_eq!(plan.output_path, Path::new("a.jpg"));
        }
    }

    #[test]
    fn test_jpeg_and_webp_pass_through() {
        let plan = plan_normalization(SourceFormat::Jpeg, ColorMode::Luma, Path::new("a.jpeg"));
        assert_eq!(plan.format, OutputFormat::Jpeg);
        assert_eq!(plan.color_mode, ColorMode::Luma);
        assert_eq!(plan.output_path, Path::new("a.jpeg"));

        let plan = plan_normalization(SourceFormat::WebP, ColorMode::Rgba, Path::new("a.webp"));
        assert_eq!(plan.format, OutputFormat::WebP);
        assert_eq!(plan.color_mode, ColorMode::Rgba);
        assert!(!plan.transparency_dropped);
    }

    #[test]
    fn test_apply_flattens_alpha() {
        let img = DynamicImage::new_rgba8(4, 4);
        let flat = ColorMode::Rgb.apply(img);
        assert_eq!(flat.color(), ColorType::Rgb8);

        let img = DynamicImage::new_luma16(4, 4);
        assert_eq!(ColorMode::Luma.apply(img).color(), ColorType::L8);
    }

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("test.jpg")));
        assert!(is_supported_image(Path::new("test.JPEG")));
        assert!(is_supported_image(Path::new("test.png")));
        assert!(is_supported_image(Path::new("test.WebP")));

        assert!(!is_supported_image(Path::new("test.gif")));
        assert!(!is_supported_image(Path::new("test.txt")));
        assert!(!is_supported_image(Path::new("test")));
    }
}
