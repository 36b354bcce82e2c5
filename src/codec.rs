//! Encode/decode capability used by the compressor.
//!
//! The quality search only needs two things from a codec: decoding a file
//! into pixels with its detected format, and encoding pixels in memory at a
//! given quality. `ImageCodec` is the production implementation; tests swap in
//! their own to exercise the search without real encoders.

use crate::error::{CompressionError, Result};
use crate::formats::{OutputFormat, SourceFormat};
use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageReader, RgbImage, RgbaImage};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A decoded image together with the container format it was read from
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: SourceFormat,
}

pub trait Codec {
    /// Decode the file at `path`. The format is sniffed from content first,
    /// falling back to the extension.
    fn decode(&self, path: &Path) -> Result<DecodedImage>;

    /// Encode `image` in memory at `quality` (1-100).
    ///
    /// Output size is assumed to be non-decreasing in `quality` for a fixed
    /// image and format; the quality search relies on it.
    fn encode(&self, image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>>;
}

/// Codec backed by the `image` crate for decoding, mozjpeg for progressive
/// optimized JPEG, and libwebp for lossy WebP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl Codec for ImageCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;

        let format = match reader.format() {
            Some(detected) => SourceFormat::from_image_format(detected).ok_or_else(|| {
                CompressionError::UnsupportedFormat(format!("{:?} content", detected))
            })?,
            None => path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(SourceFormat::from_extension)
                .ok_or_else(|| {
                    CompressionError::UnsupportedFormat(format!(
                        "cannot detect image format of {}",
                        path.display()
                    ))
                })?,
        };

        let image = match reader.decode() {
            Ok(image) => image,
            Err(err) if format == SourceFormat::Png => match decode_partial_png(path) {
                Some(image) => image,
                None => return Err(err.into()),
            },
            Err(err) => return Err(err.into()),
        };
        Ok(DecodedImage { image, format })
    }

    fn encode(&self, image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Jpeg => encode_jpeg(image, quality),
            OutputFormat::WebP => encode_webp(image, quality),
        }
    }
}

/// Rows of a truncated or damaged PNG that can still be read, with the
/// missing rows zero-filled. `None` when the header or the first row is gone.
fn decode_partial_png(path: &Path) -> Option<DynamicImage> {
    let file = File::open(path).ok()?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().ok()?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    // Adam7 rows arrive pass by pass and would need reassembly
    if interlaced {
        return None;
    }

    let (color_type, _) = reader.output_color_type();
    let channels = match color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => return None,
    };
    let row_len = width as usize * channels;
    if row_len == 0 {
        return None;
    }

    let mut pixels = vec![0u8; row_len * height as usize];
    let mut rows_read = 0;
    for dest in pixels.chunks_exact_mut(row_len) {
        match reader.next_row() {
            Ok(Some(row)) => {
                let data = row.data();
                let count = data.len().min(row_len);
                dest[..count].copy_from_slice(&data[..count]);
                rows_read += 1;
            }
            _ => break,
        }
    }
    if rows_read == 0 {
        return None;
    }

    match color_type {
        png::ColorType::Grayscale => {
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        png::ColorType::GrayscaleAlpha => {
            GrayAlphaImage::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8)
        }
        png::ColorType::Rgb => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        png::ColorType::Rgba => {
            RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
        }
        png::ColorType::Indexed => None,
    }
}

/// Progressive JPEG with optimized Huffman tables and scan order. Neither
/// changes the decoded pixels, only the byte count.
fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb;
    let (color_space, pixels): (ColorSpace, &[u8]) = match image {
        DynamicImage::ImageLuma8(gray) => (ColorSpace::JCS_GRAYSCALE, gray.as_raw()),
        DynamicImage::ImageRgb8(rgb8) => (ColorSpace::JCS_RGB, rgb8.as_raw()),
        other => {
            // JPEG has no alpha; anything else goes through RGB
            rgb = other.to_rgb8();
            (ColorSpace::JCS_RGB, rgb.as_raw())
        }
    };

    let mut compress = Compress::new(color_space);
    compress.set_size(image.width() as usize, image.height() as usize);
    compress.set_quality(f32::from(quality));
    compress.set_progressive_mode();
    compress.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
    compress.set_optimize_coding(true);
    compress.set_optimize_scans(true);

    let mut started = compress.start_compress(Vec::new())?;
    started.write_scanlines(pixels)?;
    Ok(started.finish()?)
}

fn encode_webp(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let quality = f32::from(quality);
    let (width, height) = (image.width(), image.height());

    let encoded = if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, quality)
    } else {
        let rgb = image.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, quality)
    };

    encoded
        .map(|memory| memory.to_vec())
        .map_err(|e| CompressionError::WebpEncoding(format!("{:?}", e)))
}
