//! # pagepress
//!
//! A build tool for single-page sites authored against a CDN utility-CSS
//! runtime. It turns the authoring page into a deployable bundle: a purged,
//! prefixed, minified stylesheet, a minified document without the runtime,
//! and resized JPEG + WebP images.
//!
//! # Architecture: Sequential Pipeline
//!
//! ```text
//! 1. Reset     dist/ wiped
//! 2. Load      src/index.html      →  Document (typed regions)
//! 3. Styles    Tailwind CLI        →  utility CSS + inline CSS → minified
//! 4. Assemble  Document            →  minified index.html
//! 5. Images    src/images/         →  dist/images/*.jpg + *.webp
//! 6. Write     index.html, styles.css, CNAME
//! ```
//!
//! Each stage is a plain function over in-memory values, so unit tests can
//! exercise it without running the ones before it. Only stage 5 is
//! parallel, and a failure there is isolated to the image that caused it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Stage orchestration, [`pipeline::BuildReport`], output-directory safety |
//! | [`config`] | `pagepress.toml` loading, merging over stock defaults, validation |
//! | [`document`] | Source HTML as an ordered list of text / style / script regions |
//! | [`tailwind`] | Utility CSS from the Tailwind CLI over the content tree |
//! | [`styles`] | Vendor prefixing and bundling of utility + inline CSS |
//! | [`minify`] | CSS (`lightningcss`), naive JS, HTML (`minify-html`) |
//! | [`assemble`] | Structural edits: strip runtime scripts, swap styles |
//! | [`imaging`] | Identify, resize, encode: backend trait + `image`/`webp` backend |
//! | [`optimize`] | Parallel per-image optimization with verbatim fallback |
//! | [`cache`] | Content-addressed encode cache kept between builds |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Regions, Not Patterns
//!
//! The source page is parsed once into [`document::Region`]s. Removing the
//! runtime script or swapping the stylesheet is an edit on that list, so it
//! cannot accidentally match text inside a comment or another element.
//! Rendering an untouched document reproduces the input byte for byte.
//!
//! ## Utilities First, Page CSS Second
//!
//! The page's own `<style>` blocks are appended after the generated
//! utilities. Equal-specificity conflicts resolve in favour of the author.
//!
//! ## Two Formats Per Image
//!
//! Every raster becomes a JPEG and a WebP at the same dimensions, so a
//! `<picture>` element can offer both. The width ceiling depends on the
//! original width: wide images keep more pixels than small ones.

pub mod assemble;
pub mod cache;
pub mod config;
pub mod document;
pub mod imaging;
pub mod minify;
pub mod optimize;
pub mod output;
pub mod pipeline;
pub mod styles;
pub mod tailwind;

#[cfg(test)]
pub(crate) mod test_helpers;
