//! Utility CSS through the Tailwind CLI.
//!
//! pagepress does not resolve utility classes itself. Each build writes a
//! throwaway Tailwind project and runs the configured command over it:
//!
//! ```text
//! <tmp>/tailwind.config.js   content globs, theme.extend, corePlugins
//! <tmp>/input.css            @tailwind base; @tailwind components; @tailwind utilities;
//!
//! tailwindcss -c <tmp>/tailwind.config.js -i <tmp>/input.css -o <tmp>/output.css
//! ```
//!
//! The content globs cover every `.html`, `.htm` and `.js` file below
//! `paths.content_dir`, so only classes the site actually references are
//! emitted. Theme tokens from `[theme]` go into `theme.extend`, the same shape
//! the page's inline `tailwind.config` script uses for the CDN runtime.
//!
//! The command is a v3 CLI (`-c` takes a JavaScript config): the standalone
//! binary or `npx tailwindcss@3`.

use crate::config::{StylesConfig, ThemeConfig};
use serde_json::json;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// File extensions Tailwind scans for class names.
pub const CONTENT_EXTENSIONS: &[&str] = &["html", "htm", "js"];

/// Entry stylesheet: all three layers, nothing custom.
const ENTRY_CSS: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

/// Lines of stderr kept in [`TailwindError::Failed`].
const STDERR_TAIL: usize = 20;

#[derive(Error, Debug)]
pub enum TailwindError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("styles.tailwind.command is empty")]
    EmptyCommand,
    #[error("failed to run `{command}` (is the Tailwind CLI installed?): {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` failed with {status}:\n{stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// The `content` glob for `content_dir`, with forward slashes.
pub fn content_glob(content_dir: &Path) -> String {
    let dir = content_dir.to_string_lossy().replace('\\', "/");
    format!(
        "{}/**/*.{{{}}}",
        dir.trim_end_matches('/'),
        CONTENT_EXTENSIONS.join(",")
    )
}

/// `tailwind.config.js` for one build.
pub fn config_js(content_dir: &Path, theme: &ThemeConfig, preflight: bool) -> String {
    let mut config = json!({
        "content": [content_glob(content_dir)],
        "theme": {
            "extend": {
                "colors": theme.colors,
                "fontFamily": theme.fonts,
            }
        },
        "plugins": [],
    });
    if !preflight {
        config["corePlugins"] = json!({ "preflight": false });
    }
    format!("module.exports = {config:#};\n")
}

/// Run the Tailwind CLI for the project at `root` and return its CSS.
///
/// `content_dir` is made absolute so the globs do not depend on where the
/// CLI resolves paths from.
pub fn run_tailwind(
    root: &Path,
    content_dir: &Path,
    theme: &ThemeConfig,
    styles: &StylesConfig,
) -> Result<String, TailwindError> {
    let (program, args) = styles
        .tailwind
        .command
        .split_first()
        .ok_or(TailwindError::EmptyCommand)?;
    let content_dir = std::path::absolute(content_dir)?;

    let work = tempfile::Builder::new()
        .prefix("pagepress-tailwind")
        .tempdir()?;
    let config = work.path().join("tailwind.config.js");
    let input = work.path().join("input.css");
    let output = work.path().join("output.css");
    fs::write(&config, config_js(&content_dir, theme, styles.preflight))?;
    fs::write(&input, ENTRY_CSS)?;

    let command_line = styles.tailwind.command.join(" ");
    let result = Command::new(program)
        .args(args)
        .args([OsStr::new("-c"), config.as_os_str()])
        .args([OsStr::new("-i"), input.as_os_str()])
        .args([OsStr::new("-o"), output.as_os_str()])
        .current_dir(root)
        .output()
        .map_err(|source| TailwindError::Spawn {
            command: command_line.clone(),
            source,
        })?;

    if !result.status.success() {
        return Err(TailwindError::Failed {
            command: command_line,
            status: result.status,
            stderr: stderr_tail(&result.stderr),
        });
    }
    Ok(fs::read_to_string(&output)?)
}

/// Last lines of a failed run's stderr, without the version banner.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.to_lowercase().contains("tailwindcss v"))
        .collect();
    lines[lines.len().saturating_sub(STDERR_TAIL)..].join("\n")
}
