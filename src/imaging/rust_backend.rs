//! Production image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Identify | `image::image_dimensions` (header only, no full decode) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → WebP | `webp::Encoder` (lossy, libwebp) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const RASTER_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    RASTER_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has a raster extension this backend can decode.
pub fn is_supported_raster(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            let lower = e.to_ascii_lowercase();
            supported_input_extensions().contains(&lower.as_str())
        })
}

/// Backend built on the `image` crate plus libwebp for lossy WebP.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode as baseline JPEG. Alpha is dropped.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, quality as u8);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

/// Encode as lossy WebP. libwebp takes 8-bit RGB or RGBA only.
fn save_webp(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let pixels = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&pixels)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {}", e)))?;
    let encoded = encoder
        .encode_simple(false, quality as f32)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {:?}", e)))?;
    std::fs::write(path, &*encoded).map_err(BackendError::Io)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn encode(&self, params: &EncodeParams) -> Result<(), BackendError> {
        if !params.fits_format() {
            return Err(BackendError::TooLarge {
                format: params.format,
                width: params.width,
                height: params.height,
            });
        }
        let img = load_image(&params.source)?;
        let img = if (img.width(), img.height()) == (params.width, params.height) {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        match params.format {
            OutputFormat::Jpeg => save_jpeg(&img, &params.output, params.quality.value()),
            OutputFormat::WebP => save_webp(&img, &params.output, params.quality.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{write_jpeg, write_png_rgba};
    use std::path::PathBuf;

    fn params(source: PathBuf, output: PathBuf, w: u32, h: u32, format: OutputFormat) -> EncodeParams {
        EncodeParams {
            source,
            output,
            width: w,
            height: h,
            format,
            quality: Quality::new(80),
        }
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = super::supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
        assert!(!exts.contains(&"svg"));
    }

    #[test]
    fn raster_detection_is_case_insensitive() {
        assert!(is_supported_raster(Path::new("a/HERO.JPG")));
        assert!(is_supported_raster(Path::new("b.png")));
        assert!(!is_supported_raster(Path::new("logo.svg")));
        assert!(!is_supported_raster(Path::new("README")));
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        write_jpeg(&path, 200, 150);

        let backend = RustBackend::new();
        let dims = backend.identify(&path).unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let backend = RustBackend::new();
        let result = backend.identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn identify_garbage_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("fake.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(RustBackend::new().identify(&path).is_err());
    }

    #[test]
    fn encode_jpeg_resized() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_jpeg(&source, 400, 300);
        let output = tmp.path().join("out.jpg");

        let backend = RustBackend::new();
        backend
            .encode(&params(source, output.clone(), 200, 150, OutputFormat::Jpeg))
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 150));
    }

    #[test]
    fn encode_webp_same_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_jpeg(&source, 120, 80);
        let output = tmp.path().join("out.webp");

        RustBackend::new()
            .encode(&params(source, output.clone(), 120, 80, OutputFormat::WebP))
            .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
        assert_eq!(image::image_dimensions(&output).unwrap(), (120, 80));
    }

    #[test]
    fn encode_png_with_alpha_to_both_formats() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("logo.png");
        write_png_rgba(&source, 64, 32);

        let backend = RustBackend::new();
        let jpg = tmp.path().join("logo.jpg");
        let webp = tmp.path().join("logo.webp");
        backend
            .encode(&params(source.clone(), jpg.clone(), 64, 32, OutputFormat::Jpeg))
            .unwrap();
        backend
            .encode(&params(source, webp.clone(), 64, 32, OutputFormat::WebP))
            .unwrap();

        assert_eq!(image::image_dimensions(&jpg).unwrap(), (64, 32));
        assert_eq!(image::image_dimensions(&webp).unwrap(), (64, 32));
    }

    #[test]
    fn encode_corrupt_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"\xFF\xD8\xFF\xE0 truncated").unwrap();
        let result = RustBackend::new().encode(&params(
            source,
            tmp.path().join("out.jpg"),
            10,
            10,
            OutputFormat::Jpeg,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn webp_beyond_dimension_limit_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("tall.png");
        image::GrayImage::from_pixel(4, 17_000, image::Luma([128]))
            .save(&source)
            .unwrap();
        let output = tmp.path().join("tall.webp");

        let result = RustBackend::new().encode(&params(
            source,
            output.clone(),
            4,
            17_000,
            OutputFormat::WebP,
        ));

        assert!(matches!(result, Err(BackendError::TooLarge { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn lower_quality_produces_smaller_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        write_jpeg(&source, 300, 200);
        let backend = RustBackend::new();

        let encode_at = |q: u32, name: &str| {
            let output = tmp.path().join(name);
            let mut p = params(source.clone(), output.clone(), 300, 200, OutputFormat::Jpeg);
            p.quality = Quality::new(q);
            backend.encode(&p).unwrap();
            std::fs::metadata(output).unwrap().len()
        };
        assert!(encode_at(20, "low.jpg") < encode_at(95, "high.jpg"));
    }
}
