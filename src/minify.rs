//! Minification for CSS, inline JavaScript, and the final HTML document.
//!
//! | Input | How |
//! |---|---|
//! | CSS | `lightningcss` parse → minify (rule merging, dead declarations) → minified print |
//! | JS | naive text transform, see [`minify_js`] |
//! | HTML | `minify_html` with comment removal and whitespace collapsing |

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinifyError {
    #[error("CSS parse error: {0}")]
    CssParse(String),
    #[error("CSS minify error: {0}")]
    CssMinify(String),
    #[error("CSS print error: {0}")]
    CssPrint(String),
    #[error("minified HTML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)//.*$").expect("valid comment regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static PUNCT_PADDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([{}();,:])\s*").expect("valid punctuation regex"));

/// Minify a stylesheet.
///
/// Output is stable under repeated application: feeding the result back in
/// yields the same bytes.
pub fn minify_css(css: &str, browsers: Browsers) -> Result<String, MinifyError> {
    let targets = Targets::from(browsers);
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| MinifyError::CssParse(e.to_string()))?;
    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| MinifyError::CssMinify(e.to_string()))?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| MinifyError::CssPrint(e.to_string()))?;
    Ok(printed.code)
}

/// Best-effort JavaScript shrinking for a small hand-written inline script.
///
/// Strips `//` line comments, collapses whitespace runs to a single space, and
/// drops whitespace around `{ } ( ) ; , :`. This is a text transform, not a
/// parser: a `//` inside a string or regex literal is treated as a comment.
pub fn minify_js(js: &str) -> String {
    let without_comments = LINE_COMMENT.replace_all(js, "");
    let collapsed = WHITESPACE_RUN.replace_all(&without_comments, " ");
    let tightened = PUNCT_PADDING.replace_all(&collapsed, "$1");
    tightened.trim().to_string()
}

/// Minify a full HTML document.
///
/// Inline `<script>` bodies are left alone; they are minified separately by
/// [`minify_js`] before the document is assembled.
pub fn minify_html(html: &str) -> Result<String, MinifyError> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = false;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    Ok(String::from_utf8(minify_html::minify(html.as_bytes(), &cfg))?)
}
