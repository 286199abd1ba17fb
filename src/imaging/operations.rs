//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{ResizePolicy, target_dimensions};
use super::params::{EncodeParams, OutputFormat, Quality};
use crate::config::ImagesConfig;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Configuration for derived image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeConfig {
    pub policy: ResizePolicy,
    pub jpeg_quality: Quality,
    pub webp_quality: Quality,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self::from(&ImagesConfig::default())
    }
}

impl From<&ImagesConfig> for EncodeConfig {
    fn from(config: &ImagesConfig) -> Self {
        Self {
            policy: ResizePolicy::from(config),
            jpeg_quality: Quality::new(config.jpeg_quality),
            webp_quality: Quality::new(config.webp_quality),
        }
    }
}

impl EncodeConfig {
    pub fn quality_for(&self, format: OutputFormat) -> Quality {
        match format {
            OutputFormat::Jpeg => self.jpeg_quality,
            OutputFormat::WebP => self.webp_quality,
        }
    }
}

/// Path of a derived artifact: the same relative path with the format's extension.
///
/// `photos/hero.png` → `photos/hero.jpg` / `photos/hero.webp`.
pub fn derived_path(relative: &Path, format: OutputFormat) -> PathBuf {
    relative.with_extension(format.extension())
}

/// Both encodes for one source image, sharing one resize decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlan {
    pub original: (u32, u32),
    pub target: (u32, u32),
    pub encodes: Vec<EncodeParams>,
}

impl ImagePlan {
    /// Fail before any encode runs if one format cannot hold the target size.
    pub fn check_limits(&self) -> Result<()> {
        match self.encodes.iter().find(|params| !params.fits_format()) {
            Some(params) => Err(BackendError::TooLarge {
                format: params.format,
                width: params.width,
                height: params.height,
            }),
            None => Ok(()),
        }
    }
}

/// Plan the JPEG and WebP encodes of `source` without executing them.
///
/// `output_root` is the images output directory; `relative` is the source path
/// relative to the images input directory.
pub fn plan_image(
    source: &Path,
    relative: &Path,
    output_root: &Path,
    original: (u32, u32),
    config: &EncodeConfig,
) -> ImagePlan {
    let (width, height) = target_dimensions(&config.policy, original);
    let encodes = OutputFormat::ALL
        .iter()
        .map(|&format| EncodeParams {
            source: source.to_path_buf(),
            output: output_root.join(derived_path(relative, format)),
            width,
            height,
            format,
            quality: config.quality_for(format),
        })
        .collect();

    ImagePlan {
        original,
        target: (width, height),
        encodes,
    }
}
