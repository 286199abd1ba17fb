//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what to encode and at which size) and the
//! [`backend`](super::backend) (which does the pixel work). The split lets
//! tests swap in a mock backend without touching the planning logic.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`OutputFormat`]: the two delivery formats, JPEG and WebP.
//! - [`EncodeParams`]: everything one encode needs: source, output, target size, format, quality.

use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Delivery format of a derived image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    WebP,
}

impl OutputFormat {
    /// Both formats, in the order they are encoded.
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Jpeg, OutputFormat::WebP];

    /// File extension of derived artifacts.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    /// Largest width or height the encoder accepts.
    pub fn max_dimension(self) -> u32 {
        match self {
            OutputFormat::Jpeg => 65_535,
            OutputFormat::WebP => 16_383,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::WebP => "WebP",
        })
    }
}

/// Parameters for one encode (decode source, resize, encode, write).
///
/// When `width`/`height` equal the source dimensions no resampling happens.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: Quality,
}

impl EncodeParams {
    /// Whether the target size fits the format's dimension limit.
    pub fn fits_format(&self) -> bool {
        let max = self.format.max_dimension();
        self.width <= max && self.height <= max
    }
}
