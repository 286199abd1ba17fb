//! Shared test utilities.
//!
//! Synthetic image writers and a throwaway project layout for exercising the
//! pipeline end to end.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_project(SAMPLE_PAGE);
//! write_jpeg(&tmp.path().join("src/images/hero.jpg"), 2400, 1600);
//! let config = test_config(tmp.path());
//! ```

use crate::config::BundleConfig;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// Write a gradient JPEG. The gradient keeps quality differences measurable.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    JpegEncoder::new_with_quality(writer, 95)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a PNG with a translucent alpha channel.
pub fn write_png_rgba(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, 64, (y % 256) as u8, 128])
    });
    img.save(path).unwrap();
}

// =========================================================================
// Project layout
// =========================================================================

/// A page using a CDN utility runtime, its inline config, custom styles,
/// and a trailing inline script.
pub const SAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Villa</title>
  <script src="https://cdn.tailwindcss.com"></script>
  <script>
    tailwind.config = { theme: { extend: {} } }
  </script>
  <style>
    .hero-overlay { background: linear-gradient(to bottom, transparent, #1a1a2e); }
  </style>
</head>
<body class="bg-notte text-travertino">
  <section class="flex items-center p-4 md:p-8">
    <h1 class="text-4xl font-serif hover:text-terracotta">Welcome</h1>
    <img src="images/hero.jpg" alt="">
  </section>
  <script>
    // toggle the menu
    document.querySelector('h1').addEventListener('click', function () {
      document.body.classList.toggle('open');
    });
  </script>
</body>
</html>
"#;

/// Create a temp project with `src/index.html` and an empty `src/images/`.
pub fn setup_project(html: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(src.join("images")).unwrap();
    std::fs::write(src.join("index.html"), html).unwrap();
    tmp
}

// =========================================================================
// Tailwind stand-in
// =========================================================================

/// What the stand-in CLI writes, whatever the content tree holds.
pub const FAKE_UTILITIES: &str = r"*, ::before, ::after {
  box-sizing: border-box;
}
.flex {
  display: flex;
}
.bg-notte {
  background-color: #1a1a2e;
}
.p-4 {
  padding: 1rem;
}
.text-4xl {
  font-size: 2.25rem;
  line-height: 2.5rem;
}
.select-none {
  user-select: none;
}
@media (min-width: 768px) {
  .md\:p-8 {
    padding: 2rem;
  }
}
";

/// Install a shell stand-in for the Tailwind CLI under `root/.tailwind-fake`
/// and return the command that runs it.
///
/// It copies the `-c` config and `-i` entry it receives to `seen.config.js`
/// and `seen.input.css` next to itself, then writes [`FAKE_UTILITIES`] to
/// the `-o` path.
pub fn fake_tailwind(root: &Path) -> Vec<String> {
    let dir = root.join(".tailwind-fake");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("utilities.css"), FAKE_UTILITIES).unwrap();
    let dir = dir.display();
    let script = format!(
        r#"while [ "$#" -gt 0 ]; do
  case "$1" in
    -c) cp "$2" "{dir}/seen.config.js"; shift ;;
    -i) cp "$2" "{dir}/seen.input.css"; shift ;;
    -o) out="$2"; shift ;;
  esac
  shift
done
cat "{dir}/utilities.css" > "$out"
"#
    );
    let script_path = root.join(".tailwind-fake/tailwindcss.sh");
    std::fs::write(&script_path, script).unwrap();
    vec!["sh".to_string(), script_path.display().to_string()]
}

/// Stock config whose Tailwind command is the stand-in.
pub fn test_config(root: &Path) -> BundleConfig {
    let mut config = BundleConfig::default();
    config.styles.tailwind.command = fake_tailwind(root);
    config
}
