//! Style pipeline: Tailwind CLI → vendor prefixing → bundling.
//!
//! The generated utility CSS always comes first in the bundle and the
//! hand-written CSS extracted from the document second, so custom overrides
//! win on cascade conflicts.

use crate::config::{BundleConfig, ConfigError};
use crate::minify::{self, MinifyError};
use crate::tailwind::{self, TailwindError};
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("invalid style configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("generated CSS failed to parse: {0}")]
    Parse(String),
    #[error("vendor prefixing failed: {0}")]
    Prefix(String),
    #[error(transparent)]
    Minify(#[from] MinifyError),
    #[error("utility CSS: {0}")]
    Tailwind(#[from] TailwindError),
}

/// Prefixed CSS and the number of style rules it was printed from.
#[derive(Debug, Clone)]
pub struct Prefixed {
    pub css: String,
    pub rules: usize,
}

/// Add vendor prefixes required by `browsers`.
///
/// Output is pretty-printed; minification is a separate step. Rules are
/// counted as parsed, before minification merges any of them.
pub fn prefix(css: &str, browsers: Browsers) -> Result<Prefixed, StyleError> {
    let targets = Targets::from(browsers);
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| StyleError::Parse(e.to_string()))?;
    let rules = count_style_rules(&sheet.rules);
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| StyleError::Prefix(e.to_string()))?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: false,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| StyleError::Prefix(e.to_string()))?;
    Ok(Prefixed {
        css: printed.code,
        rules,
    })
}

/// Style rules at any depth of `@media`, `@supports` and `@layer` blocks.
fn count_style_rules<R>(rules: &CssRuleList<'_, R>) -> usize {
    rules
        .0
        .iter()
        .map(|rule| match rule {
            CssRule::Style(_) => 1,
            CssRule::Media(media) => count_style_rules(&media.rules),
            CssRule::Supports(supports) => count_style_rules(&supports.rules),
            CssRule::LayerBlock(layer) => count_style_rules(&layer.rules),
            _ => 0,
        })
        .sum()
}

/// Concatenate utility CSS and custom CSS, utility first.
pub fn bundle(utility_css: &str, custom_css: &str) -> String {
    match (utility_css.trim().is_empty(), custom_css.trim().is_empty()) {
        (true, _) => custom_css.to_string(),
        (false, true) => utility_css.to_string(),
        (false, false) => format!("{utility_css}\n{custom_css}"),
    }
}

/// Sizes of each step, for the build log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleStats {
    /// Style rules in the Tailwind output.
    pub utility_rules: usize,
    pub utility_bytes: usize,
    pub custom_bytes: usize,
    pub minified_bytes: usize,
}

/// Final CSS payload plus statistics.
#[derive(Debug, Clone)]
pub struct StyleOutput {
    pub css: String,
    pub stats: StyleStats,
}

/// Run the full style pipeline for one build.
///
/// `root` is the working directory for the Tailwind command and
/// `content_dir` the tree it scans for class names.
pub fn build_styles(
    config: &BundleConfig,
    root: &Path,
    content_dir: &Path,
    custom_css: &str,
) -> Result<StyleOutput, StyleError> {
    let browsers = config.styles.browsers()?;
    let utility_css = tailwind::run_tailwind(root, content_dir, &config.theme, &config.styles)?;
    let prefixed = prefix(&utility_css, browsers)?;
    let combined = bundle(&prefixed.css, custom_css);
    let css = minify::minify_css(&combined, browsers)?;

    Ok(StyleOutput {
        stats: StyleStats {
            utility_rules: prefixed.rules,
            utility_bytes: prefixed.css.len(),
            custom_bytes: custom_css.len(),
            minified_bytes: css.len(),
        },
        css,
    })
}
