//! Build configuration module.
//!
//! Handles loading, validating, and merging `pagepress.toml`. The file lives at
//! the project root and is entirely optional: stock defaults are serialized to a
//! TOML table and the user file is merged on top of it, key by key.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! source = "src/index.html"      # The single source document
//! content_dir = "src"            # Scanned by Tailwind for class usage
//! images = "src/images"          # Raster images to optimize (optional dir)
//! domain_pin = "CNAME"           # Copied verbatim when present
//! output = "dist"                # Wiped and recreated on every build
//! cache_dir = ".pagepress-cache" # Encoded image cache (survives builds)
//!
//! [theme.colors]
//! travertino = "#E8E0D5"         # -> bg-travertino, text-travertino, ...
//!
//! [theme.fonts]
//! serif = ["Cormorant Garamond", "Georgia", "serif"]
//!
//! [styles]
//! mode = "external"              # "external" (styles.css) or "inline"
//! stylesheet = "styles.css"
//! preflight = true
//! strip_script_prefixes = ["https://cdn.tailwindcss.com"]
//! config_script_markers = ["tailwind.config"]
//!
//! [styles.tailwind]
//! command = ["tailwindcss"]      # v3 CLI, e.g. ["npx", "tailwindcss@3"]
//!
//! [styles.targets]
//! safari = "14"                  # Browser versions for vendor prefixing
//!
//! [images]
//! large_threshold = 1200         # Wider than this counts as "large"
//! large_max_width = 1920         # Ceiling for large images
//! small_max_width = 800          # Ceiling for everything else
//! jpeg_quality = 80
//! webp_quality = 80
//!
//! [processing]
//! max_processes = 4              # Max parallel image workers (omit for auto)
//! ```
//!
//! ## Theme Merging
//!
//! Theme tables merge the same way every other table does, so a user file that
//! declares `[theme.colors] brand = "#123456"` *extends* the stock palette
//! rather than replacing it.
//!
//! Unknown keys are rejected to catch typos early.

use lightningcss::targets::Browsers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the project root.
pub const CONFIG_FILENAME: &str = "pagepress.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `pagepress.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Input and output locations, relative to the project root.
    pub paths: PathsConfig,
    /// Color and font tokens passed to Tailwind's `theme.extend`.
    pub theme: ThemeConfig,
    /// CSS handling: inline vs external, preflight, prefix targets.
    pub styles: StylesConfig,
    /// Resize ceilings and encoder qualities.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl BundleConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let images = &self.images;
        for (key, quality) in [
            ("images.jpeg_quality", images.jpeg_quality),
            ("images.webp_quality", images.webp_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::Validation(format!("{key} must be 1-100")));
            }
        }
        if images.large_threshold == 0 || images.large_max_width == 0 || images.small_max_width == 0
        {
            return Err(ConfigError::Validation(
                "images.large_threshold, large_max_width and small_max_width must be non-zero"
                    .into(),
            ));
        }
        for name in self.theme.colors.keys().chain(self.theme.fonts.keys()) {
            if !is_token_name(name) {
                return Err(ConfigError::Validation(format!(
                    "theme token '{name}' must be lowercase letters, digits and dashes"
                )));
            }
        }
        if let Some((name, _)) = self.theme.colors.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "theme.colors.{name} must not be empty"
            )));
        }
        if let Some((name, _)) = self.theme.fonts.iter().find(|(_, v)| v.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "theme.fonts.{name} must list at least one family"
            )));
        }
        let stylesheet = self.styles.stylesheet.trim();
        if stylesheet.is_empty()
            || stylesheet.contains(['/', '\\'])
            || stylesheet == "."
            || stylesheet == ".."
            || stylesheet.eq_ignore_ascii_case("index.html")
        {
            return Err(ConfigError::Validation(format!(
                "styles.stylesheet must be a plain file name inside the output directory, got '{}'",
                self.styles.stylesheet
            )));
        }
        if self
            .styles
            .tailwind
            .command
            .first()
            .is_none_or(|program| program.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "styles.tailwind.command must name a program".into(),
            ));
        }
        self.styles.browsers()?;
        Ok(())
    }
}

fn is_token_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Input and output paths, all relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub source: String,
    pub content_dir: String,
    pub images: String,
    pub domain_pin: String,
    pub output: String,
    pub cache_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: "src/index.html".to_string(),
            content_dir: "src".to_string(),
            images: "src/images".to_string(),
            domain_pin: "CNAME".to_string(),
            output: "dist".to_string(),
            cache_dir: ".pagepress-cache".to_string(),
        }
    }
}

/// Color and font tokens.
///
/// Colors map a token name to any CSS color (`bg-notte`, `text-notte/80`).
/// Fonts map a token name to a family list (`font-serif`). Both extend
/// Tailwind's defaults rather than replacing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub colors: BTreeMap<String, String>,
    pub fonts: BTreeMap<String, Vec<String>>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        let colors = [
            ("travertino", "#E8E0D5"),
            ("terracotta", "#C4703D"),
            ("bronzo", "#8B6914"),
            ("notte", "#1a1a2e"),
            ("oliva", "#4A5043"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let fonts = [
            ("serif", vec!["Cormorant Garamond", "Georgia", "serif"]),
            ("sans", vec!["Montserrat", "system-ui", "sans-serif"]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
        .collect();

        Self { colors, fonts }
    }
}

/// Where the final CSS ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CssMode {
    /// Written to a separate stylesheet and linked from the document.
    External,
    /// Inlined into the document's `<style>` element.
    Inline,
}

/// CSS handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    pub mode: CssMode,
    /// File name of the external stylesheet (external mode only).
    pub stylesheet: String,
    /// Include Tailwind's preflight reset.
    pub preflight: bool,
    /// `<script src=...>` tags whose URL starts with one of these are dropped.
    pub strip_script_prefixes: Vec<String>,
    /// Inline scripts whose body starts with one of these are dropped.
    pub config_script_markers: Vec<String>,
    /// Browser name → minimum version, used for vendor prefixing.
    pub targets: BTreeMap<String, String>,
    pub tailwind: TailwindConfig,
}

/// How to run the Tailwind CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TailwindConfig {
    /// Program and leading arguments; `-c`, `-i` and `-o` are appended.
    pub command: Vec<String>,
}

impl Default for TailwindConfig {
    fn default() -> Self {
        Self {
            command: vec!["tailwindcss".to_string()],
        }
    }
}

impl Default for StylesConfig {
    fn default() -> Self {
        let targets = [
            ("chrome", "100"),
            ("edge", "100"),
            ("firefox", "100"),
            ("safari", "14"),
            ("ios_saf", "14"),
            ("samsung", "16"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            mode: CssMode::External,
            stylesheet: "styles.css".to_string(),
            preflight: true,
            strip_script_prefixes: vec!["https://cdn.tailwindcss.com".to_string()],
            config_script_markers: vec!["tailwind.config".to_string()],
            targets,
            tailwind: TailwindConfig::default(),
        }
    }
}

impl StylesConfig {
    /// Resolve `targets` into lightningcss browser versions.
    pub fn browsers(&self) -> Result<Browsers, ConfigError> {
        let mut browsers = Browsers::default();
        for (name, version) in &self.targets {
            let parsed = parse_browser_version(version).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "styles.targets.{name}: '{version}' is not a version like \"14\" or \"14.1\""
                ))
            })?;
            let slot = match name.as_str() {
                "android" => &mut browsers.android,
                "chrome" => &mut browsers.chrome,
                "edge" => &mut browsers.edge,
                "firefox" => &mut browsers.firefox,
                "ie" => &mut browsers.ie,
                "ios_saf" => &mut browsers.ios_saf,
                "opera" => &mut browsers.opera,
                "safari" => &mut browsers.safari,
                "samsung" => &mut browsers.samsung,
                other => {
                    return Err(ConfigError::Validation(format!(
                        "styles.targets: unknown browser '{other}'"
                    )));
                }
            };
            *slot = Some(parsed);
        }
        Ok(browsers)
    }
}

/// Parse `"major[.minor[.patch]]"` into lightningcss' packed version format.
pub fn parse_browser_version(version: &str) -> Option<u32> {
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
    let patch: u32 = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() || major > 0xff || minor > 0xff || patch > 0xff {
        return None;
    }
    Some((major << 16) | (minor << 8) | patch)
}

/// Resize ceilings and encoder qualities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Images wider than this are "large".
    pub large_threshold: u32,
    /// Width ceiling for large images.
    pub large_max_width: u32,
    /// Width ceiling for all other images.
    pub small_max_width: u32,
    pub jpeg_quality: u32,
    pub webp_quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            large_threshold: 1200,
            large_max_width: 1920,
            small_max_width: 800,
            jpeg_quality: 80,
            webp_quality: 80,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BundleConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `pagepress.toml` from the project root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BundleConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BundleConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `pagepress.toml` in the project root.
pub fn load_config(root: &Path) -> Result<BundleConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Returns a fully-commented stock `pagepress.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pagepress configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Paths (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
# The single source document.
source = "src/index.html"
# Tailwind scans every .html/.htm/.js file below this directory for class names.
content_dir = "src"
# Raster images to optimize. Missing directory = no images.
images = "src/images"
# Custom-domain file for the hosting platform, copied verbatim if present.
domain_pin = "CNAME"
# Output directory. DELETED and recreated on every build.
output = "dist"
# Encoded image cache, kept between builds.
cache_dir = ".pagepress-cache"

# ---------------------------------------------------------------------------
# Theme tokens (merged into Tailwind's theme.extend, so the default palette
# and font stacks stay available)
# ---------------------------------------------------------------------------
[theme.colors]
travertino = "#E8E0D5"
terracotta = "#C4703D"
bronzo = "#8B6914"
notte = "#1a1a2e"
oliva = "#4A5043"

[theme.fonts]
serif = ["Cormorant Garamond", "Georgia", "serif"]
sans = ["Montserrat", "system-ui", "sans-serif"]

# ---------------------------------------------------------------------------
# Styles
# ---------------------------------------------------------------------------
[styles]
# "external" writes styles.css and links it; "inline" keeps a <style> block.
mode = "external"
# File name of the external stylesheet, written at the top of the output dir.
stylesheet = "styles.css"
# Include Tailwind's preflight reset before the utilities.
preflight = true
# <script src="..."> tags starting with these URLs are removed.
strip_script_prefixes = ["https://cdn.tailwindcss.com"]
# Inline <script> blocks starting with these markers are removed.
config_script_markers = ["tailwind.config"]

# Minimum browser versions used for vendor prefixing.
# Known browsers: android, chrome, edge, firefox, ie, ios_saf, opera, safari, samsung
[styles.targets]
chrome = "100"
edge = "100"
firefox = "100"
safari = "14"
ios_saf = "14"
samsung = "16"

# The Tailwind v3 CLI. pagepress appends -c <config> -i <input> -o <output>.
# Use ["npx", "tailwindcss@3"] when the standalone binary is not installed.
[styles.tailwind]
command = ["tailwindcss"]

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# Images wider than this get the large ceiling, everything else the small one.
large_threshold = 1200
large_max_width = 1920
small_max_width = 800
# Encoder quality (1 = worst, 100 = best).
jpeg_quality = 80
webp_quality = 80

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
