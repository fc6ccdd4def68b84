//! Turns player-supplied files and built-in demo pictures into the
//! `ImageRef` + encoded bytes pair the core stores with a puzzle record.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use piecework_core::{ImageRef, PuzzleError, StoredImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Larger uploads are downscaled before they are stored.
pub const MAX_IMAGE_DIM: u32 = 2048;
pub const DEMO_HANDLE_PREFIX: &str = "demo:";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image read failed: {0}")]
    Read(String),
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("image encode failed: {0}")]
    Encode(String),
    #[error("unknown demo image: {0}")]
    UnknownDemo(String),
    #[error("invalid image dimensions")]
    Dimensions,
}

impl From<ImageError> for PuzzleError {
    fn from(err: ImageError) -> Self {
        PuzzleError::ImageUnavailable(err.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemoPattern {
    Gradient,
    Checker,
    Rings,
}

#[derive(Clone, Copy, Debug)]
pub struct DemoImage {
    pub label: &'static str,
    pub slug: &'static str,
    pub width: u32,
    pub height: u32,
    pub pattern: DemoPattern,
}

pub const DEFAULT_DEMO_SLUG: &str = "sunset";

pub const DEMO_CATALOG: &[DemoImage] = &[
    DemoImage {
        label: "Sunset",
        slug: DEFAULT_DEMO_SLUG,
        width: 1200,
        height: 800,
        pattern: DemoPattern::Gradient,
    },
    DemoImage {
        label: "Checkerboard",
        slug: "checker",
        width: 960,
        height: 960,
        pattern: DemoPattern::Checker,
    },
    DemoImage {
        label: "Ripples",
        slug: "ripples",
        width: 720,
        height: 1080,
        pattern: DemoPattern::Rings,
    },
];

pub fn demo_by_slug(slug: &str) -> Option<&'static DemoImage> {
    let trimmed = slug.trim();
    DEMO_CATALOG
        .iter()
        .find(|entry| entry.slug.eq_ignore_ascii_case(trimmed))
}

#[derive(Clone, Debug)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Demo(String),
}

#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub image_ref: ImageRef,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl LoadedImage {
    pub fn into_stored(self) -> StoredImage {
        StoredImage::from_bytes(self.image_ref, self.mime, &self.bytes)
    }
}

pub fn load_image(source: &ImageSource) -> Result<LoadedImage, ImageError> {
    match source {
        ImageSource::Bytes(bytes) => load_bytes(bytes),
        ImageSource::Demo(slug) => {
            let entry = demo_by_slug(slug).ok_or_else(|| ImageError::UnknownDemo(slug.clone()))?;
            load_demo(entry)
        }
    }
}

pub fn load_bytes(bytes: &[u8]) -> Result<LoadedImage, ImageError> {
    let format = image::guess_format(bytes).map_err(|err| ImageError::Decode(err.to_string()))?;
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|err| ImageError::Decode(err.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ImageError::Dimensions);
    }
    let (width, height) = logical_image_size(decoded.width(), decoded.height(), MAX_IMAGE_DIM);
    let (bytes, mime) = if (width, height) == (decoded.width(), decoded.height()) {
        (bytes.to_vec(), format.to_mime_type().to_string())
    } else {
        debug!(
            from_w = decoded.width(),
            from_h = decoded.height(),
            width,
            height,
            "downscaling upload"
        );
        let resized = decoded.resize_exact(width, height, FilterType::Triangle);
        (encode_png(&resized)?, ImageFormat::Png.to_mime_type().to_string())
    };
    let handle = sha256_hex(&bytes);
    let image_ref = ImageRef::new(handle, width, height).map_err(|_| ImageError::Dimensions)?;
    info!(handle = %image_ref.handle, width, height, %mime, "image loaded");
    Ok(LoadedImage {
        image_ref,
        mime,
        bytes,
    })
}

pub fn load_demo(entry: &DemoImage) -> Result<LoadedImage, ImageError> {
    let rendered = DynamicImage::ImageRgb8(render_demo(entry));
    let bytes = encode_png(&rendered)?;
    let handle = format!("{DEMO_HANDLE_PREFIX}{}", entry.slug);
    let image_ref =
        ImageRef::new(handle, entry.width, entry.height).map_err(|_| ImageError::Dimensions)?;
    Ok(LoadedImage {
        image_ref,
        mime: ImageFormat::Png.to_mime_type().to_string(),
        bytes,
    })
}

/// Decodes a stored image again and checks it still matches its reference.
pub fn decode_stored(stored: &StoredImage) -> Result<DynamicImage, PuzzleError> {
    let bytes = stored.bytes()?;
    let decoded = image::load_from_memory(&bytes).map_err(|err| ImageError::Decode(err.to_string()))?;
    let expected = (stored.image_ref.width, stored.image_ref.height);
    if (decoded.width(), decoded.height()) != expected {
        return Err(ImageError::Dimensions.into());
    }
    Ok(decoded)
}

pub fn render_demo(entry: &DemoImage) -> RgbImage {
    let (w, h) = (entry.width.max(1), entry.height.max(1));
    match entry.pattern {
        DemoPattern::Gradient => RgbImage::from_fn(w, h, |x, y| {
            let fx = x as f32 / w as f32;
            let fy = y as f32 / h as f32;
            Rgb([
                (255.0 * (1.0 - fy * 0.6)) as u8,
                (90.0 + 120.0 * fx * (1.0 - fy)) as u8,
                (60.0 + 180.0 * fy) as u8,
            ])
        }),
        DemoPattern::Checker => {
            let cell = (w.min(h) / 12).max(1);
            RgbImage::from_fn(w, h, |x, y| {
                let dark = ((x / cell) + (y / cell)) % 2 == 0;
                let tint = ((x * 255) / w) as u8;
                if dark {
                    Rgb([30, tint / 2, 70])
                } else {
                    Rgb([230, 220 - tint / 3, tint])
                }
            })
        }
        DemoPattern::Rings => {
            let cx = w as f32 / 2.0;
            let cy = h as f32 / 2.0;
            RgbImage::from_fn(w, h, |x, y| {
                let dist = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                let wave = (dist / 18.0).sin() * 0.5 + 0.5;
                Rgb([
                    (40.0 + 60.0 * wave) as u8,
                    (110.0 + 100.0 * wave) as u8,
                    (160.0 + 90.0 * (1.0 - wave)) as u8,
                ])
            })
        }
    }
}

pub fn logical_image_size(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let max_axis = width.max(height).max(1);
    let logical_max = max_dim.max(1);
    let scale = if max_axis > logical_max {
        logical_max as f64 / max_axis as f64
    } else {
        1.0
    };
    let logical_w = ((width as f64) * scale).round().max(1.0) as u32;
    let logical_h = ((height as f64) * scale).round().max(1.0) as u32;
    (logical_w, logical_h)
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|err| ImageError::Encode(err.to_string()))?;
    Ok(out.into_inner())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])));
        encode_png(&image).unwrap()
    }

    #[test]
    fn uploads_are_content_addressed() {
        let bytes = png_bytes(40, 30);
        let loaded = load_image(&ImageSource::Bytes(bytes.clone())).unwrap();
        assert_eq!(loaded.image_ref.width, 40);
        assert_eq!(loaded.image_ref.height, 30);
        assert_eq!(loaded.mime, "image/png");
        assert_eq!(loaded.image_ref.handle, sha256_hex(&bytes));
        assert_eq!(loaded.image_ref.handle.len(), 64);
        assert_eq!(loaded.bytes, bytes);
    }

    #[test]
    fn sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn oversized_uploads_are_downscaled() {
        let loaded = load_bytes(&png_bytes(4096, 1024)).unwrap();
        assert_eq!((loaded.image_ref.width, loaded.image_ref.height), (2048, 512));
        let stored = loaded.into_stored();
        let decoded = decode_stored(&stored).unwrap();
        assert_eq!(decoded.width(), 2048);
    }

    #[test]
    fn garbage_is_not_an_image() {
        let err = load_bytes(b"definitely not a picture").unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
        let err: PuzzleError = err.into();
        assert!(matches!(err, PuzzleError::ImageUnavailable(_)));
    }

    #[test]
    fn demos_render_at_catalog_size() {
        for entry in DEMO_CATALOG {
            let loaded = load_demo(entry).unwrap();
            assert_eq!(loaded.image_ref.handle, format!("demo:{}", entry.slug));
            let decoded = decode_stored(&loaded.into_stored()).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (entry.width, entry.height));
        }
    }

    #[test]
    fn unknown_demo_is_reported() {
        let err = load_image(&ImageSource::Demo("nope".to_string())).unwrap_err();
        assert!(matches!(err, ImageError::UnknownDemo(_)));
        assert!(demo_by_slug(" SUNSET ").is_some());
    }

    #[test]
    fn logical_size_keeps_small_images() {
        assert_eq!(logical_image_size(800, 600, 2048), (800, 600));
        assert_eq!(logical_image_size(3000, 3000, 1500), (1500, 1500));
    }
}
