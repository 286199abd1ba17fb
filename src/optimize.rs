//! Asset optimization: every raster image becomes a resized JPEG + WebP pair.
//!
//! Stage 6 of the build pipeline. Walks the images directory and, per image:
//!
//! 1. reads byte size and dimensions,
//! 2. picks the width ceiling from the original width (see
//!    [`ResizePolicy`](crate::imaging::ResizePolicy)),
//! 3. encodes a JPEG and a WebP at the shared target size,
//! 4. counts `min(jpeg, webp)` bytes towards the optimized total.
//!
//! ## Output Structure
//!
//! ```text
//! src/images/                 dist/images/
//! ├── hero.png          →     ├── hero.jpg
//! │                           ├── hero.webp
//! ├── team/alice.jpg    →     ├── team/alice.jpg
//! │                           ├── team/alice.webp
//! └── logo.svg          →     └── logo.svg          (copied verbatim)
//! ```
//!
//! ## Failure isolation
//!
//! Any per-image error (unreadable header, decode or encode failure) is
//! reported as an [`ImageEvent::Fallback`]. Derivatives already written for
//! that image are removed and the original file is copied unmodified to the
//! same relative path. Its original size counts as its optimized size. Only
//! failing to write that fallback copy aborts the build.
//!
//! The encode cache is auxiliary: a cache that cannot be written produces an
//! [`ImageEvent::CacheWarning`] and the freshly encoded output is kept.
//!
//! Two sources that differ only by extension (`hero.png`, `hero.jpg`) would
//! derive the same outputs. That is rejected up front by [`collect_inputs`].
//!
//! ## Parallel Processing
//!
//! Images are processed in parallel using [rayon](https://docs.rs/rayon).
//! Results are collected in input order, so statistics match a serial run;
//! only the arrival order of progress events varies.

use crate::cache::{self, CacheManifest, CacheStats};
use crate::imaging::{
    BackendError, EncodeConfig, ImageBackend, OutputFormat, RustBackend, derived_path,
    get_dimensions, is_supported_raster, plan_image,
};
use crate::pipeline::BuildEvent;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to copy {path} after it could not be optimized: {source}")]
    Fallback {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(
        "{} and {} would both be written as {}.jpg/.webp; rename one of them",
        .first.display(),
        .second.display(),
        .stem.display()
    )]
    Collision {
        first: PathBuf,
        second: PathBuf,
        stem: PathBuf,
    },
}

/// Whether a derived artifact came from the cache or a fresh encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    Cached,
    Encoded,
}

/// One derived artifact of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantInfo {
    pub format: OutputFormat,
    pub bytes: u64,
    pub status: VariantStatus,
}

/// Progress events emitted while images are processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEvent {
    /// Stage began; `rasters` images will be optimized.
    Started { rasters: usize, others: usize },
    Optimized {
        /// 1-based position in sorted input order.
        index: usize,
        /// Path relative to the images directory.
        path: String,
        original: (u32, u32),
        target: (u32, u32),
        original_bytes: u64,
        variants: Vec<VariantInfo>,
    },
    Fallback {
        index: usize,
        path: String,
        error: String,
    },
    /// A non-raster file copied verbatim.
    Copied { path: String, bytes: u64 },
    /// The cache could not be written; the build output is unaffected.
    CacheWarning { path: String, error: String },
}

/// Byte totals for the image stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    /// Raster images seen, including fallbacks.
    pub images: usize,
    pub original_bytes: u64,
    /// Sum of `min(jpeg, webp)` per image; original size for fallbacks.
    pub optimized_bytes: u64,
    pub fallbacks: usize,
    /// Non-raster files copied verbatim.
    pub copied: usize,
    pub copied_bytes: u64,
}

impl OptimizeStats {
    /// Percentage of original image bytes saved (0 when there are no images).
    pub fn saved_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.optimized_bytes as f64 / self.original_bytes as f64) * 100.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptimizeResult {
    pub stats: OptimizeStats,
    pub cache_stats: CacheStats,
}

/// Where the encode cache lives and whether lookups are allowed.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub dir: PathBuf,
    /// `false` forces every image to re-encode (fresh results are still stored).
    pub use_cache: bool,
}

/// Outcome of one raster image, in input order.
enum Outcome {
    Optimized {
        original_bytes: u64,
        variants: Vec<VariantInfo>,
    },
    Fallback {
        original_bytes: u64,
    },
}

pub fn optimize_images(
    images_dir: &Path,
    output_dir: &Path,
    config: &EncodeConfig,
    cache: &CacheOptions,
    progress: Option<&Sender<BuildEvent>>,
) -> Result<OptimizeResult, OptimizeError> {
    let backend = RustBackend::new();
    optimize_images_with_backend(&backend, images_dir, output_dir, config, cache, progress)
}

/// Optimize images using a specific backend (allows testing with mock).
pub fn optimize_images_with_backend(
    backend: &impl ImageBackend,
    images_dir: &Path,
    output_dir: &Path,
    config: &EncodeConfig,
    cache: &CacheOptions,
    progress: Option<&Sender<BuildEvent>>,
) -> Result<OptimizeResult, OptimizeError> {
    let emit = |event: ImageEvent| {
        if let Some(tx) = progress {
            let _ = tx.send(BuildEvent::Image(event));
        }
    };

    let (rasters, others) = collect_inputs(images_dir)?;
    emit(ImageEvent::Started {
        rasters: rasters.len(),
        others: others.len(),
    });

    let mut result = OptimizeResult::default();
    if rasters.is_empty() && others.is_empty() {
        return Ok(result);
    }
    std::fs::create_dir_all(output_dir)?;

    for relative in &others {
        let target = output_dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = std::fs::copy(images_dir.join(relative), &target)?;
        result.stats.copied += 1;
        result.stats.copied_bytes += bytes;
        emit(ImageEvent::Copied {
            path: display_path(relative),
            bytes,
        });
    }

    let manifest = Mutex::new(if cache.use_cache {
        CacheManifest::load(&cache.dir)
    } else {
        CacheManifest::empty()
    });

    let outcomes: Vec<Result<Outcome, OptimizeError>> = rasters
        .par_iter()
        .enumerate()
        .map(|(i, relative)| {
            let source = images_dir.join(relative);
            let run = ImageRun {
                backend,
                output_dir,
                config,
                cache,
                manifest: &manifest,
                emit: &emit,
            };
            match run.optimize_one(&source, relative) {
                Ok((outcome, event)) => {
                    emit(event.with_index(i + 1));
                    Ok(outcome)
                }
                Err(err) => {
                    let original_bytes = copy_original(&source, output_dir, relative)?;
                    emit(ImageEvent::Fallback {
                        index: i + 1,
                        path: display_path(relative),
                        error: err.to_string(),
                    });
                    Ok(Outcome::Fallback { original_bytes })
                }
            }
        })
        .collect();

    for outcome in outcomes {
        result.stats.images += 1;
        match outcome? {
            Outcome::Optimized {
                original_bytes,
                variants,
            } => {
                result.stats.original_bytes += original_bytes;
                result.stats.optimized_bytes += variants
                    .iter()
                    .map(|v| v.bytes)
                    .min()
                    .unwrap_or(original_bytes);
                for variant in &variants {
                    match variant.status {
                        VariantStatus::Cached => result.cache_stats.hit(),
                        VariantStatus::Encoded => result.cache_stats.miss(),
                    }
                }
            }
            Outcome::Fallback { original_bytes } => {
                result.stats.fallbacks += 1;
                result.stats.original_bytes += original_bytes;
                result.stats.optimized_bytes += original_bytes;
            }
        }
    }

    let manifest = manifest.into_inner().unwrap_or_else(|e| e.into_inner());
    if let Err(err) = manifest.save(&cache.dir) {
        emit(ImageEvent::CacheWarning {
            path: cache::manifest_path(&cache.dir).display().to_string(),
            error: err.to_string(),
        });
    }

    Ok(result)
}

impl ImageEvent {
    fn with_index(self, position: usize) -> Self {
        match self {
            ImageEvent::Optimized {
                path,
                original,
                target,
                original_bytes,
                variants,
                ..
            } => ImageEvent::Optimized {
                index: position,
                path,
                original,
                target,
                original_bytes,
                variants,
            },
            other => other,
        }
    }
}

/// Sorted relative paths of raster images and of everything else.
///
/// Hidden files and directories are skipped. A missing directory is empty.
/// Rasters whose derived outputs would overwrite each other are an error.
pub fn collect_inputs(images_dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), OptimizeError> {
    let mut rasters = Vec::new();
    let mut others = Vec::new();
    if !images_dir.is_dir() {
        return Ok((rasters, others));
    }

    for entry in WalkDir::new(images_dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(images_dir)
            .map_err(std::io::Error::other)?
            .to_path_buf();
        if is_hidden(&relative) {
            continue;
        }
        if is_supported_raster(&relative) {
            rasters.push(relative);
        } else {
            others.push(relative);
        }
    }
    check_collisions(&rasters)?;
    Ok((rasters, others))
}

/// `hero.png` and `hero.JPG` both derive `hero.jpg`; case is folded so the
/// check also holds on case-insensitive filesystems.
fn check_collisions(rasters: &[PathBuf]) -> Result<(), OptimizeError> {
    let mut owners: HashMap<String, &PathBuf> = HashMap::new();
    for relative in rasters {
        let stem = relative.with_extension("");
        let key = display_path(&stem).to_lowercase();
        if let Some(first) = owners.insert(key, relative) {
            return Err(OptimizeError::Collision {
                first: first.clone(),
                second: relative.clone(),
                stem,
            });
        }
    }
    Ok(())
}

fn is_hidden(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

fn display_path(relative: &Path) -> String {
    relative.to_string_lossy().replace('\\', "/")
}

/// Replace whatever was written for `relative` with a verbatim copy.
fn copy_original(source: &Path, output_dir: &Path, relative: &Path) -> Result<u64, OptimizeError> {
    let copy = || -> std::io::Result<u64> {
        for format in OutputFormat::ALL {
            let partial = output_dir.join(derived_path(relative, format));
            if partial.is_file() {
                std::fs::remove_file(&partial)?;
            }
        }
        let target = output_dir.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(source, &target)
    };
    copy().map_err(|source_err| OptimizeError::Fallback {
        path: source.to_path_buf(),
        source: source_err,
    })
}

/// Everything a worker needs to optimize one image.
struct ImageRun<'a, B, E> {
    backend: &'a B,
    output_dir: &'a Path,
    config: &'a EncodeConfig,
    cache: &'a CacheOptions,
    manifest: &'a Mutex<CacheManifest>,
    emit: &'a E,
}

impl<B: ImageBackend, E: Fn(ImageEvent)> ImageRun<'_, B, E> {
    /// Identify, plan, and produce both variants of one image.
    fn optimize_one(
        &self,
        source: &Path,
        relative: &Path,
    ) -> Result<(Outcome, ImageEvent), BackendError> {
        let original_bytes = std::fs::metadata(source)?.len();
        let dimensions = get_dimensions(self.backend, source)?;
        let plan = plan_image(source, relative, self.output_dir, dimensions, self.config);
        plan.check_limits()?;
        let source_hash = cache::hash_file(source)?;

        let mut variants = Vec::with_capacity(plan.encodes.len());
        for params in &plan.encodes {
            if let Some(parent) = params.output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let params_hash = cache::hash_encode_params(
                params.format.extension(),
                params.width,
                params.height,
                params.quality.value(),
            );

            let cached = self
                .manifest
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .find_cached(&source_hash, &params_hash, &self.cache.dir);
            // An unreadable artifact is re-encoded like a miss.
            let restored =
                cached.is_some_and(|stored| std::fs::copy(stored, &params.output).is_ok());

            let status = if restored {
                VariantStatus::Cached
            } else {
                self.backend.encode(params)?;
                self.remember(&params.output, &source_hash, params_hash);
                VariantStatus::Encoded
            };

            variants.push(VariantInfo {
                format: params.format,
                bytes: std::fs::metadata(&params.output)?.len(),
                status,
            });
        }

        let event = ImageEvent::Optimized {
            index: 0,
            path: display_path(relative),
            original: plan.original,
            target: plan.target,
            original_bytes,
            variants: variants.clone(),
        };
        Ok((
            Outcome::Optimized {
                original_bytes,
                variants,
            },
            event,
        ))
    }

    /// Store a fresh encode in the cache. Failure only costs a future re-encode.
    fn remember(&self, output: &Path, source_hash: &str, params_hash: String) {
        match cache::store_artifact(&self.cache.dir, output, source_hash, &params_hash) {
            Ok(artifact) => self
                .manifest
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(artifact, source_hash.to_string(), params_hash),
            Err(err) => (self.emit)(ImageEvent::CacheWarning {
                path: output.display().to_string(),
                error: err.to_string(),
            }),
        }
    }
}
