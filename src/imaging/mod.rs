//! Image processing.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3, never upscaling |
//! | **Encode → JPEG** | `image` JPEG encoder |
//! | **Encode → WebP** | `webp` (libwebp, lossy) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Planning both encodes of one image from its dimensions

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{ResizePolicy, fit_within, target_dimensions};
pub use operations::{EncodeConfig, ImagePlan, derived_path, get_dimensions, plan_image};
pub use params::{EncodeParams, OutputFormat, Quality};
pub use rust_backend::{RustBackend, is_supported_raster, supported_input_extensions};
