//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::config::ImagesConfig;

/// Width ceilings chosen by the original width of an image.
///
/// Images wider than `large_threshold` are hero-class and may stay up to
/// `large_max_width`; everything else is capped at `small_max_width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePolicy {
    pub large_threshold: u32,
    pub large_max_width: u32,
    pub small_max_width: u32,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self::from(&ImagesConfig::default())
    }
}

impl From<&ImagesConfig> for ResizePolicy {
    fn from(config: &ImagesConfig) -> Self {
        Self {
            large_threshold: config.large_threshold,
            large_max_width: config.large_max_width,
            small_max_width: config.small_max_width,
        }
    }
}

impl ResizePolicy {
    /// Whether an image of this width is in the large class.
    pub fn is_large(&self, width: u32) -> bool {
        width > self.large_threshold
    }

    /// Maximum output width for an image of this original width.
    pub fn ceiling_for(&self, width: u32) -> u32 {
        if self.is_large(width) {
            self.large_max_width
        } else {
            self.small_max_width
        }
    }
}

/// Scale `original` down so its width fits `ceiling`, keeping the aspect ratio.
///
/// Never upscales: a width at or below the ceiling returns `original`
/// unchanged. The scaled height is rounded and at least 1.
///
/// # Examples
/// ```
/// # use pagepress::imaging::fit_within;
/// assert_eq!(fit_within((2400, 1600), 1920), (1920, 1280));
/// assert_eq!(fit_within((640, 480), 800), (640, 480));
/// ```
pub fn fit_within(original: (u32, u32), ceiling: u32) -> (u32, u32) {
    let (width, height) = original;
    if width <= ceiling {
        return original;
    }
    let scaled = (height as f64 * ceiling as f64 / width as f64).round() as u32;
    (ceiling, scaled.max(1))
}

/// Output dimensions for an image under `policy`.
pub fn target_dimensions(policy: &ResizePolicy, original: (u32, u32)) -> (u32, u32) {
    fit_within(original, policy.ceiling_for(original.0))
}
