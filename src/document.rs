//! Source document region model.
//!
//! The source HTML is split into an ordered list of typed regions instead of
//! being patched with position-sensitive patterns:
//!
//! ```text
//! <html><head>            → Text
//! <style>...</style>      → Style
//! </head><body>...        → Text
//! <script src=cdn>        → Script (external)
//! <script>...</script>    → Script (inline)
//! \n</body></html>        → Text
//! ```
//!
//! Rendering an untouched document reproduces the input byte-for-byte, so every
//! later substitution is a structural edit on the region list. HTML comments are
//! kept as opaque text: a `<script>` inside `<!-- -->` is not a region.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DocumentError {
    #[error("unterminated <{tag}> starting at byte {offset}")]
    Unterminated { tag: &'static str, offset: usize },
}

/// Opening `<style ...>` / `<script ...>` tags, or a whole comment.
static OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<(style|script)\b([^>]*)>").expect("valid opener regex")
});

static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid src regex")
});

/// An element whose body is raw text (`<style>` or `<script>`).
///
/// Parsed elements remember how their tags were spelled so an untouched
/// element renders exactly as it was read. Elements built with
/// [`RawElement::new`] render with canonical lowercase tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElement {
    /// Tag name as written (`SCRIPT`, `Style`); empty for canonical.
    pub name: String,
    /// Everything between the tag name and `>`, verbatim (e.g. ` type="module"`).
    pub attrs: String,
    pub body: String,
    /// Closing tag as written (`</SCRIPT >`); empty for canonical.
    pub close: String,
}

impl RawElement {
    pub fn new(attrs: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            attrs: attrs.into(),
            body: body.into(),
            close: String::new(),
        }
    }

    fn render_into(&self, tag: &str, out: &mut String) {
        out.push('<');
        out.push_str(if self.name.is_empty() { tag } else { &self.name });
        out.push_str(&self.attrs);
        out.push('>');
        out.push_str(&self.body);
        if self.close.is_empty() {
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        } else {
            out.push_str(&self.close);
        }
    }

    /// Value of the `src` attribute, if any.
    pub fn src(&self) -> Option<&str> {
        let caps = SRC_ATTR.captures(&self.attrs)?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    Text(String),
    Style(RawElement),
    Script(RawElement),
}

impl Region {
    fn render_into(&self, out: &mut String) {
        match self {
            Region::Text(text) => out.push_str(text),
            Region::Style(el) => el.render_into("style", out),
            Region::Script(el) => el.render_into("script", out),
        }
    }
}

/// A parsed source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub regions: Vec<Region>,
}

impl Document {
    /// Split `source` into regions.
    pub fn parse(source: &str) -> Result<Self, DocumentError> {
        let mut regions = Vec::new();
        let mut text_start = 0;
        let mut pos = 0;

        while let Some(caps) = OPENER.captures_at(source, pos) {
            let Some(whole) = caps.get(0) else { break };
            let Some(name) = caps.get(1) else {
                // Comment: stays inside the surrounding text.
                pos = whole.end();
                continue;
            };

            let tag: &'static str = if name.as_str().eq_ignore_ascii_case("style") {
                "style"
            } else {
                "script"
            };
            let body_start = whole.end();
            let (body_end, close_end) = find_close(source, body_start, tag).ok_or(
                DocumentError::Unterminated {
                    tag,
                    offset: whole.start(),
                },
            )?;

            if whole.start() > text_start {
                regions.push(Region::Text(source[text_start..whole.start()].to_string()));
            }
            let element = RawElement {
                name: name.as_str().to_string(),
                attrs: caps.get(2).map_or("", |m| m.as_str()).to_string(),
                body: source[body_start..body_end].to_string(),
                close: source[body_end..close_end].to_string(),
            };
            regions.push(match tag {
                "style" => Region::Style(element),
                _ => Region::Script(element),
            });

            text_start = close_end;
            pos = close_end;
        }

        if text_start < source.len() {
            regions.push(Region::Text(source[text_start..].to_string()));
        }
        Ok(Self { regions })
    }

    /// Render regions back to HTML.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for region in &self.regions {
            region.render_into(&mut out);
        }
        out
    }

    /// Indices of all `<style>` regions, in document order.
    pub fn style_indices(&self) -> Vec<usize> {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r, Region::Style(_)))
            .map(|(i, _)| i)
            .collect()
    }

    /// The inline script that sits directly before `</body>` (whitespace allowed).
    pub fn trailing_script(&self) -> Option<usize> {
        self.regions
            .iter()
            .enumerate()
            .find(|(i, region)| match region {
                Region::Script(el) if el.src().is_none() => match self.regions.get(i + 1) {
                    Some(Region::Text(next)) => starts_with_ignore_case(next.trim_start(), "</body"),
                    _ => false,
                },
                _ => false,
            })
            .map(|(i, _)| i)
    }

    /// External scripts whose `src` starts with any of `prefixes`.
    pub fn scripts_with_src_prefix(&self, prefixes: &[String]) -> Vec<usize> {
        self.scripts_matching(|el| {
            el.src()
                .is_some_and(|src| prefixes.iter().any(|p| src.starts_with(p.as_str())))
        })
    }

    /// Inline scripts whose trimmed body starts with any of `markers`.
    pub fn scripts_with_body_marker(&self, markers: &[String]) -> Vec<usize> {
        self.scripts_matching(|el| {
            el.src().is_none() && {
                let body = el.body.trim_start();
                markers.iter().any(|m| body.starts_with(m.as_str()))
            }
        })
    }

    fn scripts_matching(&self, pred: impl Fn(&RawElement) -> bool) -> Vec<usize> {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r, Region::Script(el) if pred(el)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Concatenated bodies of all style regions, in document order.
    pub fn inline_css(&self) -> String {
        self.regions
            .iter()
            .filter_map(|r| match r {
                Region::Style(el) => Some(el.body.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn count_scripts(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| matches!(r, Region::Script(_)))
            .count()
    }
}

/// Find `</tag>` (case-insensitive) at or after `from`.
///
/// Returns `(body_end, close_end)`: where the body stops and where the closing
/// tag's `>` ends.
fn find_close(source: &str, from: usize, tag: &str) -> Option<(usize, usize)> {
    let needle = format!("</{tag}");
    let haystack = source[from..].to_ascii_lowercase();
    let rel = haystack.find(&needle)?;
    let body_end = from + rel;
    let gt = source[body_end..].find('>')?;
    Some((body_end, body_end + gt + 1))
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<script src="https://cdn.tailwindcss.com"></script>
<script>
  tailwind.config = { theme: {} }
</script>
<style>.a{color:red}</style>
</head>
<body>
<!-- <script>ignored()</script> -->
<p class="text-terracotta">Hi</p>
<script>console.log('hi'); // note</script>
</body>
</html>
"#;

    #[test]
    fn render_roundtrips_input() {
        let doc = Document::parse(PAGE).unwrap();
        assert_eq!(doc.render(), PAGE);
    }

    #[test]
    fn parse_finds_regions_in_order() {
        let doc = Document::parse(PAGE).unwrap();
        let kinds: Vec<&str> = doc
            .regions
            .iter()
            .map(|r| match r {
                Region::Text(_) => "text",
                Region::Style(_) => "style",
                Region::Script(_) => "script",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "text", "script", "text", "script", "text", "style", "text", "script", "text"
            ]
        );
    }

    #[test]
    fn comments_are_opaque_text() {
        let doc = Document::parse(PAGE).unwrap();
        assert_eq!(doc.count_scripts(), 3);
    }

    #[test]
    fn src_attribute_variants() {
        assert_eq!(RawElement::new(r#" src="a.js""#, "").src(), Some("a.js"));
        assert_eq!(RawElement::new(" src='b.js' defer", "").src(), Some("b.js"));
        assert_eq!(RawElement::new(" SRC=c.js", "").src(), Some("c.js"));
        assert_eq!(RawElement::new(r#" type="module""#, "").src(), None);
    }

    #[test]
    fn trailing_script_is_last_before_body_close() {
        let doc = Document::parse(PAGE).unwrap();
        let idx = doc.trailing_script().unwrap();
        match &doc.regions[idx] {
            Region::Script(el) => assert!(el.body.contains("console.log")),
            other => panic!("expected script, got {other:?}"),
        }
    }

    #[test]
    fn trailing_script_requires_body_close() {
        let doc = Document::parse("<body><script>a()</script><p>x</p></body>").unwrap();
        assert_eq!(doc.trailing_script(), None);
    }

    #[test]
    fn trailing_script_does_not_span_multiple_scripts() {
        let doc =
            Document::parse("<body><script>one()</script><p>x</p><script>two()</script>\n</body>")
                .unwrap();
        let idx = doc.trailing_script().unwrap();
        match &doc.regions[idx] {
            Region::Script(el) => assert_eq!(el.body, "two()"),
            other => panic!("expected script, got {other:?}"),
        }
    }

    #[test]
    fn trailing_script_ignores_external() {
        let doc = Document::parse(r#"<body><script src="x.js"></script></body>"#).unwrap();
        assert_eq!(doc.trailing_script(), None);
    }

    #[test]
    fn finds_framework_and_config_scripts() {
        let doc = Document::parse(PAGE).unwrap();
        let cdn = doc.scripts_with_src_prefix(&["https://cdn.tailwindcss.com".to_string()]);
        let cfg = doc.scripts_with_body_marker(&["tailwind.config".to_string()]);
        assert_eq!(cdn.len(), 1);
        assert_eq!(cfg.len(), 1);
        assert_ne!(cdn[0], cfg[0]);
    }

    #[test]
    fn inline_css_joins_all_style_blocks() {
        let doc = Document::parse("<style>.a{}</style><p></p><STYLE media=print>.b{}</STYLE>")
            .unwrap();
        assert_eq!(doc.style_indices().len(), 2);
        assert_eq!(doc.inline_css(), ".a{}\n.b{}");
    }

    #[test]
    fn uppercase_tags_are_recognised() {
        let source = "<SCRIPT type=module>x()</SCRIPT ><Style>.a{}</STYLE>";
        let doc = Document::parse(source).unwrap();
        assert_eq!(doc.regions.len(), 2);
        assert_eq!(doc.count_scripts(), 1);
        assert_eq!(doc.style_indices(), vec![1]);
        assert_eq!(doc.render(), source);
    }

    #[test]
    fn edited_body_keeps_original_tag_spelling() {
        let mut doc = Document::parse("<Script>a  =  1</SCRIPT>").unwrap();
        if let Region::Script(el) = &mut doc.regions[0] {
            el.body = "a=1".to_string();
        }
        assert_eq!(doc.render(), "<Script>a=1</SCRIPT>");
    }

    #[test]
    fn built_elements_render_canonical_tags() {
        let doc = Document {
            regions: vec![Region::Style(RawElement::new("", ".a{}"))],
        };
        assert_eq!(doc.render(), "<style>.a{}</style>");
    }

    #[test]
    fn unterminated_style_is_error() {
        let err = Document::parse("<p></p><style>.a{}").unwrap_err();
        assert_eq!(
            err,
            DocumentError::Unterminated {
                tag: "style",
                offset: 7
            }
        );
    }

    #[test]
    fn empty_document() {
        let doc = Document::parse("").unwrap();
        assert!(doc.regions.is_empty());
        assert_eq!(doc.render(), "");
    }
}
