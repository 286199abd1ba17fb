//! Document assembly.
//!
//! Structural edits on the parsed [`Document`] that turn the authoring page
//! into the deployable one:
//!
//! ```text
//! <script src="https://cdn.tailwindcss.com">   → removed
//! <script>tailwind.config = {...}</script>     → removed
//! first <style>                                → <link rel="stylesheet"> or minified <style>
//! other <style>                                → removed (their CSS is in the bundle)
//! <script>...</script></body>                  → body passed through minify_js
//! ```
//!
//! HTML minification happens afterwards, on the rendered result.

use crate::config::{CssMode, StylesConfig};
use crate::document::{Document, RawElement, Region};
use crate::minify::{self, MinifyError};
use maud::{Markup, html};
use std::collections::BTreeSet;

/// What assembly changed, for the build log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembleReport {
    /// CDN runtime and inline theme-config scripts dropped.
    pub removed_scripts: usize,
    /// `<style>` regions found in the source.
    pub style_blocks: usize,
    /// Trailing script size before and after minification.
    pub script_bytes: Option<(usize, usize)>,
}

/// `<link>` element pointing at the external stylesheet.
pub fn stylesheet_link(href: &str) -> Markup {
    html! {
        link rel="stylesheet" href=(href);
    }
}

/// Apply every structural edit to `doc`.
///
/// `css` is the final minified stylesheet; it is only embedded in
/// [`CssMode::Inline`].
pub fn assemble(mut doc: Document, styles: &StylesConfig, css: &str) -> (Document, AssembleReport) {
    let mut report = AssembleReport::default();

    if let Some(index) = doc.trailing_script()
        && let Region::Script(el) = &mut doc.regions[index]
    {
        let minified = minify::minify_js(&el.body);
        report.script_bytes = Some((el.body.len(), minified.len()));
        el.body = minified;
    }

    let mut removals: BTreeSet<usize> = doc
        .scripts_with_src_prefix(&styles.strip_script_prefixes)
        .into_iter()
        .chain(doc.scripts_with_body_marker(&styles.config_script_markers))
        .collect();
    report.removed_scripts = removals.len();

    let style_indices = doc.style_indices();
    report.style_blocks = style_indices.len();
    let replacement = stylesheet_region(styles, css);

    // In-place replacement keeps every index valid until the removals below.
    let pending = match style_indices.split_first() {
        Some((&first, rest)) => {
            doc.regions[first] = replacement;
            removals.extend(rest.iter().copied());
            None
        }
        None => Some(replacement),
    };

    for index in removals.into_iter().rev() {
        doc.regions.remove(index);
    }
    if let Some(region) = pending {
        inject_into_head(&mut doc, region);
    }

    (doc, report)
}

/// Render the assembled document and minify it.
pub fn render_minified(doc: &Document) -> Result<String, MinifyError> {
    minify::minify_html(&doc.render())
}

fn stylesheet_region(styles: &StylesConfig, css: &str) -> Region {
    match styles.mode {
        CssMode::External => Region::Text(stylesheet_link(&styles.stylesheet).into_string()),
        CssMode::Inline => Region::Style(RawElement::new("", css)),
    }
}

/// Insert `region` right before `</head>`, or at the very start when the
/// document has no head.
fn inject_into_head(doc: &mut Document, region: Region) {
    let head_close = doc.regions.iter().enumerate().find_map(|(i, r)| match r {
        Region::Text(text) => text
            .to_ascii_lowercase()
            .find("</head")
            .map(|at| (i, text[..at].to_string(), text[at..].to_string())),
        _ => None,
    });

    match head_close {
        Some((i, before, after)) => {
            doc.regions
                .splice(i..=i, [Region::Text(before), region, Region::Text(after)]);
        }
        None => doc.regions.insert(0, region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SAMPLE_PAGE;

    fn external() -> StylesConfig {
        StylesConfig::default()
    }

    fn inline() -> StylesConfig {
        StylesConfig {
            mode: CssMode::Inline,
            ..StylesConfig::default()
        }
    }

    fn run(html: &str, styles: &StylesConfig, css: &str) -> (String, AssembleReport) {
        let doc = Document::parse(html).unwrap();
        let (doc, report) = assemble(doc, styles, css);
        (doc.render(), report)
    }

    // =========================================================================
    // Script removal
    // =========================================================================

    #[test]
    fn strips_cdn_and_config_scripts() {
        let (html, report) = run(SAMPLE_PAGE, &external(), ".a{}");
        assert!(!html.contains("cdn.tailwindcss.com"));
        assert!(!html.contains("tailwind.config"));
        assert_eq!(report.removed_scripts, 2);
    }

    #[test]
    fn keeps_unrelated_scripts() {
        let page = r#"<head><script src="/app.js"></script><script>window.x = 1</script></head>"#;
        let (html, report) = run(page, &external(), "");
        assert!(html.contains(r#"<script src="/app.js"></script>"#));
        assert!(html.contains("<script>window.x = 1</script>"));
        assert_eq!(report.removed_scripts, 0);
    }

    #[test]
    fn custom_prefixes_and_markers() {
        let styles = StylesConfig {
            strip_script_prefixes: vec!["https://unpkg.com/".to_string()],
            config_script_markers: vec!["window.themeConfig".to_string()],
            ..StylesConfig::default()
        };
        let page = concat!(
            r#"<script src="https://unpkg.com/x.js"></script>"#,
            "<script>\n  window.themeConfig = {}</script>",
            r#"<script src="https://cdn.tailwindcss.com"></script>"#,
        );
        let (html, report) = run(page, &styles, "");
        assert_eq!(report.removed_scripts, 2);
        assert!(html.contains("cdn.tailwindcss.com"));
        assert!(!html.contains("unpkg"));
    }

    // =========================================================================
    // Style replacement
    // =========================================================================

    #[test]
    fn external_mode_links_stylesheet() {
        let page = "<head><style>.a{color:red}</style></head><body></body>";
        let (html, report) = run(page, &external(), ".a{color:red}");
        assert_eq!(
            html,
            r#"<head><link rel="stylesheet" href="styles.css"></head><body></body>"#
        );
        assert_eq!(report.style_blocks, 1);
    }

    #[test]
    fn inline_mode_replaces_first_and_drops_rest() {
        let page = "<head><style>.a { color: red }</style><style>.b{}</style></head>\
                    <body><style>.c{}</style></body>";
        let (html, report) = run(page, &inline(), ".a{color:red}");
        assert_eq!(
            html,
            "<head><style>.a{color:red}</style></head><body></body>"
        );
        assert_eq!(report.style_blocks, 3);
    }

    #[test]
    fn missing_style_is_injected_before_head_close() {
        let page = "<html><head><title>x</title></head><body></body></html>";
        let (html, _) = run(page, &inline(), ".u{}");
        assert_eq!(
            html,
            "<html><head><title>x</title><style>.u{}</style></head><body></body></html>"
        );
    }

    #[test]
    fn head_close_match_is_case_insensitive() {
        let page = "<HEAD></HEAD><body></body>";
        let (html, _) = run(page, &external(), "");
        assert_eq!(
            html,
            r#"<HEAD><link rel="stylesheet" href="styles.css"></HEAD><body></body>"#
        );
    }

    #[test]
    fn headless_document_gets_stylesheet_prepended() {
        let (html, _) = run("<p>hi</p>", &inline(), ".u{}");
        assert_eq!(html, "<style>.u{}</style><p>hi</p>");
    }

    #[test]
    fn stylesheet_link_escapes_href() {
        assert_eq!(
            stylesheet_link("a\"b.css").into_string(),
            r#"<link rel="stylesheet" href="a&quot;b.css">"#
        );
    }

    // =========================================================================
    // Trailing script
    // =========================================================================

    #[test]
    fn trailing_script_is_minified() {
        let page = "<body><p>x</p><script>console.log('hi'); // note</script></body>";
        let (html, report) = run(page, &external(), "");
        assert!(html.ends_with("<script>console.log('hi');</script></body>"));
        assert_eq!(report.script_bytes, Some((26, 18)));
    }

    #[test]
    fn non_trailing_script_is_untouched() {
        let page = "<head><script>let a = 1;  // keep</script></head><body><p>x</p></body>";
        let (html, report) = run(page, &external(), "");
        assert!(html.contains("let a = 1;  // keep"));
        assert_eq!(report.script_bytes, None);
    }

    // =========================================================================
    // Full page
    // =========================================================================

    #[test]
    fn sample_page_renders_minified() {
        let doc = Document::parse(SAMPLE_PAGE).unwrap();
        let (doc, _) = assemble(doc, &external(), "");
        let html = render_minified(&doc).unwrap();

        assert!(!html.contains("<style"));
        assert!(!html.contains("tailwind"));
        assert!(html.contains("styles.css"));
        assert!(html.contains("document.body.classList.toggle('open');"));
        assert!(!html.contains("toggle the menu"));
        assert!(html.len() < SAMPLE_PAGE.len());
    }
}
