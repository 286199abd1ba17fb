//! CLI output formatting for the build pipeline.
//!
//! # Output Format
//!
//! ```text
//! ==> Stage 1/6: Resetting output
//! ==> Stage 2/6: Loading source
//!     src/index.html (9 regions, 1 style, 3 script)
//! ...
//! ==> Stage 5/6: Optimizing images
//!     3 images, 1 other file
//!     001 hero.png (2400x1600 → 1920x1280)
//!         JPEG: 212.4 KB encoded
//!         WebP: 141.0 KB encoded
//!     002 broken.jpg: copied unmodified (Processing failed: ...)
//!     logo.svg: copied (1.2 KB)
//! ...
//! HTML: 9.1 KB → 3.2 KB, CSS: 6.4 KB
//! Images: 3 optimized, 1 unmodified, 4210.0 KB → 602.5 KB (85.7% saved)
//! Cache: 4 cached, 2 encoded (6 total)
//! Total: 4219.1 KB → 612.1 KB (85.5% saved)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Fallback
//! warnings go to stderr. Format functions are pure: no I/O, no side effects.

use crate::optimize::{ImageEvent, VariantStatus};
use crate::pipeline::{BuildEvent, BuildReport, CheckReport, Stage};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Bytes as kilobytes with one decimal.
pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Share of `original` saved by shrinking it to `optimized`. 0 for empty input.
pub fn percent_saved(original: u64, optimized: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - optimized as f64 / original as f64) * 100.0
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Progress events
// ============================================================================

pub fn format_stage(stage: Stage) -> String {
    format!(
        "==> Stage {}/{}: {}",
        stage.number(),
        Stage::ALL.len(),
        stage
    )
}

/// Format one progress event as display lines.
pub fn format_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::Stage(stage) => vec![format_stage(*stage)],
        BuildEvent::Note(note) => vec![format!("{}{}", indent(1), note)],
        BuildEvent::Image(image) => format_image_event(image),
    }
}

/// Format an image event.
///
/// Each image leads with its positional index and path; per-format size and
/// cache status are indented context.
pub fn format_image_event(event: &ImageEvent) -> Vec<String> {
    match event {
        ImageEvent::Started { rasters, others } => {
            if *rasters == 0 && *others == 0 {
                vec![format!("{}no images", indent(1))]
            } else {
                vec![format!(
                    "{}{}, {}",
                    indent(1),
                    plural(*rasters, "image"),
                    plural(*others, "other file")
                )]
            }
        }
        ImageEvent::Optimized {
            index,
            path,
            original,
            target,
            variants,
            ..
        } => {
            let mut lines = Vec::with_capacity(variants.len() + 1);
            let size = if original == target {
                format!("{}x{}", original.0, original.1)
            } else {
                format!(
                    "{}x{} \u{2192} {}x{}",
                    original.0, original.1, target.0, target.1
                )
            };
            lines.push(format!(
                "{}{} {} ({})",
                indent(1),
                format_index(*index),
                path,
                size
            ));
            for variant in variants {
                let status = match variant.status {
                    VariantStatus::Cached => "cached",
                    VariantStatus::Encoded => "encoded",
                };
                lines.push(format!(
                    "{}{}: {} {}",
                    indent(2),
                    variant.format,
                    format_kb(variant.bytes),
                    status
                ));
            }
            lines
        }
        ImageEvent::Fallback { index, path, error } => vec![format!(
            "{}{} {}: copied unmodified ({})",
            indent(1),
            format_index(*index),
            path,
            error
        )],
        ImageEvent::Copied { path, bytes } => vec![format!(
            "{}{}: copied ({})",
            indent(1),
            path,
            format_kb(*bytes)
        )],
        ImageEvent::CacheWarning { path, error } => vec![format!(
            "{}cache: could not store {} ({})",
            indent(1),
            path,
            error
        )],
    }
}

/// Events that belong on stderr.
pub fn is_warning(event: &BuildEvent) -> bool {
    matches!(
        event,
        BuildEvent::Image(ImageEvent::Fallback { .. } | ImageEvent::CacheWarning { .. })
    )
}

pub fn print_event(event: &BuildEvent) {
    for line in format_event(event) {
        if is_warning(event) {
            eprintln!("warning: {}", line.trim_start());
        } else {
            println!("{}", line);
        }
    }
}

// ============================================================================
// Build summary
// ============================================================================

/// Format the end-of-build statistics.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    let mut documents = format!(
        "HTML: {} \u{2192} {}",
        format_kb(report.source_bytes),
        format_kb(report.html_bytes)
    );
    if report.stylesheet_bytes > 0 {
        documents.push_str(&format!(", CSS: {}", format_kb(report.stylesheet_bytes)));
    }
    lines.push(documents);

    let images = &report.images;
    if images.images == 0 {
        lines.push("Images: none".to_string());
    } else {
        let mut line = format!(
            "Images: {} optimized",
            images.images - images.fallbacks
        );
        if images.fallbacks > 0 {
            line.push_str(&format!(", {} unmodified", images.fallbacks));
        }
        line.push_str(&format!(
            ", {} \u{2192} {} ({:.1}% saved)",
            format_kb(images.original_bytes),
            format_kb(images.optimized_bytes),
            images.saved_percent()
        ));
        lines.push(line);
        lines.push(format!("Cache: {}", report.cache));
    }
    if images.copied > 0 {
        lines.push(format!(
            "Assets: {} copied ({})",
            images.copied,
            format_kb(images.copied_bytes)
        ));
    }

    lines.push(format!(
        "Total: {} \u{2192} {} ({:.1}% saved)",
        format_kb(report.input_bytes()),
        format_kb(report.output_bytes()),
        percent_saved(report.input_bytes(), report.output_bytes())
    ));
    lines.push(format!("==> Build complete: {}", report.output.display()));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    let trailing = if report.has_trailing_script {
        "trailing script will be minified"
    } else {
        "no trailing script"
    };
    vec![
        format!("Source: {}", report.source.display()),
        format!(
            "{}{}, {} style, {} script",
            indent(1),
            plural(report.regions, "region"),
            report.style_blocks,
            report.scripts
        ),
        format!(
            "{}{} to remove, {}",
            indent(1),
            plural(report.removable_scripts, "script"),
            trailing
        ),
        format!("Styles: {} utility rules", report.utility_rules),
        format!(
            "Images: {}, {}",
            plural(report.rasters, "raster"),
            plural(report.other_assets, "other file")
        ),
    ]
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}
