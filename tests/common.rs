#![allow(dead_code)]

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Deterministic pseudo-random bytes so generated images do not compress away
fn noise(seed: u32) -> impl FnMut() -> u8 {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 24) as u8
    }
}

/// Gradient with noise on top, closer to a photo than pure noise
pub fn photo_like(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut next = noise(seed);
    RgbImage::from_fn(width, height, |x, y| {
        let base_r = (x * 255 / width.max(1)) as u8;
        let base_g = (y * 255 / height.max(1)) as u8;
        Rgb([
            base_r.wrapping_add(next() / 2),
            base_g.wrapping_add(next() / 2),
            128u8.wrapping_add(next() / 2),
        ])
    })
}

pub fn write_jpeg(path: &Path, width: u32, height: u32, seed: u32) -> PathBuf {
    let img = photo_like(width, height, seed);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 100)
        .encode_image(&img)
        .unwrap();
    File::create(path).unwrap().write_all(&buf).unwrap();
    path.to_path_buf()
}

pub fn write_rgba_png(path: &Path, width: u32, height: u32, seed: u32) -> PathBuf {
    let mut next = noise(seed);
    let img = RgbaImage::from_fn(width, height, |_, y| {
        Rgba([next(), next(), next(), if y % 2 == 0 { 255 } else { 64 }])
    });
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    img.save_with_format(path, ImageFormat::Png).unwrap();
    path.to_path_buf()
}

pub fn write_webp(path: &Path, width: u32, height: u32, seed: u32) -> PathBuf {
    let img = DynamicImage::ImageRgb8(photo_like(width, height, seed));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    img.save_with_format(path, ImageFormat::WebP).unwrap();
    path.to_path_buf()
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(bytes).unwrap();
    path.to_path_buf()
}

pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).unwrap().len()
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}
