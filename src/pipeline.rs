//! The build pipeline.
//!
//! Six strictly sequential stages; only image optimization fans out:
//!
//! ```text
//! 1. Reset     dist/ removed and recreated
//! 2. Load      src/index.html → Document (regions)
//! 3. Styles    Tailwind CLI → prefix → + inline CSS → minify
//! 4. Assemble  strip CDN/config scripts, swap styles, minify script + HTML
//! 5. Images    src/images/** → dist/images/**.jpg + .webp   (rayon)
//! 6. Write     index.html, styles.css, CNAME
//! ```
//!
//! Progress is reported as [`BuildEvent`]s over an optional channel so the
//! binary can print while images are still being encoded.

use crate::assemble::{self, AssembleReport};
use crate::cache::CacheStats;
use crate::config::{BundleConfig, ConfigError, CssMode};
use crate::document::{Document, DocumentError};
use crate::imaging::EncodeConfig;
use crate::minify::MinifyError;
use crate::optimize::{self, CacheOptions, ImageEvent, OptimizeError, OptimizeStats};
use crate::styles::{self, StyleError, StyleStats};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("source document not found: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("source document: {0}")]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error(transparent)]
    Minify(#[from] MinifyError),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
    #[error("refusing to use {} as output directory: {reason}", .output.display())]
    UnsafeOutput { output: PathBuf, reason: String },
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reset,
    Load,
    Styles,
    Assemble,
    Images,
    Write,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Reset,
        Stage::Load,
        Stage::Styles,
        Stage::Assemble,
        Stage::Images,
        Stage::Write,
    ];

    /// 1-based position.
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Reset => "Resetting output",
            Stage::Load => "Loading source",
            Stage::Styles => "Generating styles",
            Stage::Assemble => "Assembling document",
            Stage::Images => "Optimizing images",
            Stage::Write => "Writing bundle",
        })
    }
}

/// Progress events for the printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Stage(Stage),
    /// Detail line for the current stage.
    Note(String),
    Image(ImageEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// `false` re-encodes every image.
    pub use_cache: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

/// Every location the build touches, resolved against the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub source: PathBuf,
    pub content_dir: PathBuf,
    pub images: PathBuf,
    pub domain_pin: PathBuf,
    pub output: PathBuf,
    pub cache_dir: PathBuf,
}

impl ProjectPaths {
    pub fn resolve(root: &Path, config: &BundleConfig) -> Self {
        let paths = &config.paths;
        Self {
            root: root.to_path_buf(),
            source: root.join(&paths.source),
            content_dir: root.join(&paths.content_dir),
            images: root.join(&paths.images),
            domain_pin: root.join(&paths.domain_pin),
            output: root.join(&paths.output),
            cache_dir: root.join(&paths.cache_dir),
        }
    }

    pub fn output_images(&self) -> PathBuf {
        self.output.join("images")
    }
}

/// Build statistics. Ephemeral, for reporting only.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub output: PathBuf,
    pub source_bytes: u64,
    pub html_bytes: u64,
    /// Bytes of the external stylesheet; 0 in inline mode.
    pub stylesheet_bytes: u64,
    pub styles: StyleStats,
    pub assemble: AssembleReport,
    pub images: OptimizeStats,
    pub cache: CacheStats,
    pub domain_pin_copied: bool,
}

impl BuildReport {
    /// Source document plus original images.
    pub fn input_bytes(&self) -> u64 {
        self.source_bytes + self.images.original_bytes
    }

    /// Written document, stylesheet, and optimized images.
    pub fn output_bytes(&self) -> u64 {
        self.html_bytes + self.stylesheet_bytes + self.images.optimized_bytes
    }
}

/// Run the full pipeline for the project at `root`.
pub fn build(
    root: &Path,
    config: &BundleConfig,
    options: &BuildOptions,
    progress: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    let emit = |event: BuildEvent| {
        if let Some(tx) = &progress {
            let _ = tx.send(event);
        }
    };
    let paths = ProjectPaths::resolve(root, config);
    check_output_safe(&paths)?;
    let mut report = BuildReport {
        output: paths.output.clone(),
        ..BuildReport::default()
    };

    emit(BuildEvent::Stage(Stage::Reset));
    reset_output(&paths.output)?;

    emit(BuildEvent::Stage(Stage::Load));
    let source = read_source(&paths.source)?;
    report.source_bytes = source.len() as u64;
    let doc = Document::parse(&source)?;
    emit(BuildEvent::Note(format!(
        "{} ({} regions, {} style, {} script)",
        paths.source.display(),
        doc.regions.len(),
        doc.style_indices().len(),
        doc.count_scripts()
    )));

    emit(BuildEvent::Stage(Stage::Styles));
    let style_output =
        styles::build_styles(config, &paths.root, &paths.content_dir, &doc.inline_css())?;
    emit(BuildEvent::Note(format!(
        "{} utility rules, {} B custom CSS",
        style_output.stats.utility_rules, style_output.stats.custom_bytes
    )));
    report.styles = style_output.stats.clone();

    emit(BuildEvent::Stage(Stage::Assemble));
    let (doc, assembled) = assemble::assemble(doc, &config.styles, &style_output.css);
    let html = assemble::render_minified(&doc)?;
    if let Some((before, after)) = assembled.script_bytes {
        emit(BuildEvent::Note(format!("trailing script {before} B → {after} B")));
    }
    emit(BuildEvent::Note(format!(
        "removed {} script(s), merged {} style block(s)",
        assembled.removed_scripts, assembled.style_blocks
    )));
    report.assemble = assembled;

    emit(BuildEvent::Stage(Stage::Images));
    let optimized = optimize::optimize_images(
        &paths.images,
        &paths.output_images(),
        &EncodeConfig::from(&config.images),
        &CacheOptions {
            dir: paths.cache_dir.clone(),
            use_cache: options.use_cache,
        },
        progress.as_ref(),
    )?;
    report.images = optimized.stats;
    report.cache = optimized.cache_stats;

    emit(BuildEvent::Stage(Stage::Write));
    let index = paths.output.join("index.html");
    std::fs::write(&index, &html)?;
    report.html_bytes = html.len() as u64;
    emit(BuildEvent::Note(index.display().to_string()));

    if config.styles.mode == CssMode::External {
        let stylesheet = paths.output.join(&config.styles.stylesheet);
        if let Some(parent) = stylesheet.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&stylesheet, &style_output.css)?;
        report.stylesheet_bytes = style_output.css.len() as u64;
        emit(BuildEvent::Note(stylesheet.display().to_string()));
    }

    if paths.domain_pin.is_file() {
        let target = paths
            .output
            .join(paths.domain_pin.file_name().unwrap_or_default());
        std::fs::copy(&paths.domain_pin, &target)?;
        report.domain_pin_copied = true;
        emit(BuildEvent::Note(target.display().to_string()));
    }

    Ok(report)
}

/// What a build would do, without writing anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub source: PathBuf,
    pub regions: usize,
    pub style_blocks: usize,
    pub scripts: usize,
    /// CDN runtime and theme-config scripts that would be removed.
    pub removable_scripts: usize,
    pub has_trailing_script: bool,
    /// Style rules Tailwind generated for the content tree.
    pub utility_rules: usize,
    pub rasters: usize,
    pub other_assets: usize,
}

/// Validate the project: config, source document, style generation.
pub fn check(root: &Path, config: &BundleConfig) -> Result<CheckReport, BuildError> {
    let paths = ProjectPaths::resolve(root, config);
    check_output_safe(&paths)?;
    let source = read_source(&paths.source)?;
    let doc = Document::parse(&source)?;
    let style_output =
        styles::build_styles(config, &paths.root, &paths.content_dir, &doc.inline_css())?;
    let (rasters, others) = optimize::collect_inputs(&paths.images)?;

    Ok(CheckReport {
        source: paths.source,
        regions: doc.regions.len(),
        style_blocks: doc.style_indices().len(),
        scripts: doc.count_scripts(),
        removable_scripts: doc
            .scripts_with_src_prefix(&config.styles.strip_script_prefixes)
            .len()
            + doc
                .scripts_with_body_marker(&config.styles.config_script_markers)
                .len(),
        has_trailing_script: doc.trailing_script().is_some(),
        utility_rules: style_output.stats.utility_rules,
        rasters: rasters.len(),
        other_assets: others.len(),
    })
}

fn read_source(path: &Path) -> Result<String, BuildError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BuildError::MissingSource(path.to_path_buf()),
        _ => BuildError::Io(e),
    })
}

fn reset_output(output: &Path) -> std::io::Result<()> {
    if output.exists() {
        std::fs::remove_dir_all(output)?;
    }
    std::fs::create_dir_all(output)
}

/// Canonical form when the path exists, absolute form otherwise.
fn normalize(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// The output directory is deleted on every build; make sure that cannot
/// take the project or its inputs with it.
fn check_output_safe(paths: &ProjectPaths) -> Result<(), BuildError> {
    let output = normalize(&paths.output);
    let unsafe_output = |reason: String| BuildError::UnsafeOutput {
        output: paths.output.clone(),
        reason,
    };

    if normalize(&paths.root).starts_with(&output) {
        return Err(unsafe_output("it contains the project root".into()));
    }
    for (what, input) in [
        ("source document", &paths.source),
        ("content directory", &paths.content_dir),
        ("images directory", &paths.images),
        ("cache directory", &paths.cache_dir),
    ] {
        if normalize(input).starts_with(&output) {
            return Err(unsafe_output(format!(
                "it contains the {what} {}",
                input.display()
            )));
        }
    }
    Ok(())
}
