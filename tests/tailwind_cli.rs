//! Builds against the real Tailwind v3 CLI.
//!
//! These need `tailwindcss` on PATH, or `PAGEPRESS_TAILWIND` set to the
//! command to use instead (for example `npx tailwindcss@3`).
//!
//! Run with: `cargo test --test tailwind_cli -- --ignored`

use pagepress::config;
use pagepress::pipeline::{self, BuildOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <script src="https://cdn.tailwindcss.com"></script>
  <style>.hero{min-height:100vh}</style>
</head>
<body class="bg-notte p-4 font-serif">
  <div class="absolute top-1/2 -translate-y-1/2 ring-2 ring-terracotta blur-sm"></div>
  <div class="bg-gradient-to-b from-notte to-transparent hover:bg-notte/80"></div>
  <ul class="list-disc md:w-1/2"></ul>
</body>
</html>
"#;

fn build_css(files: &[(&str, &str)]) -> String {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("src")).unwrap();
    for (name, content) in files {
        fs::write(tmp.path().join("src").join(name), content).unwrap();
    }
    let mut config = config::load_config(tmp.path()).unwrap();
    if let Ok(command) = std::env::var("PAGEPRESS_TAILWIND") {
        config.styles.tailwind.command = command.split_whitespace().map(String::from).collect();
    }
    pipeline::build(tmp.path(), &config, &BuildOptions::default(), None).unwrap();
    read(&tmp.path().join("dist/styles.css"))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
#[ignore]
fn utility_families_across_the_palette_are_generated() {
    let css = build_css(&[("index.html", PAGE)]);

    for selector in [
        r".top-1\/2",
        r".-translate-y-1\/2",
        ".ring-2",
        ".ring-terracotta",
        ".blur-sm",
        ".bg-gradient-to-b",
        ".from-notte",
        ".to-transparent",
        r".hover\:bg-notte\/80:hover",
        ".list-disc",
        r".md\:w-1\/2",
        ".font-serif",
    ] {
        assert!(css.contains(selector), "missing {selector}");
    }
    assert!(css.contains("Cormorant Garamond"));
    assert!(css.find(".bg-notte").unwrap() < css.find(".hero").unwrap());
}

#[test]
#[ignore]
fn unreferenced_utilities_are_purged() {
    let css = build_css(&[("index.html", PAGE)]);

    assert!(!css.contains(".p-8"));
    assert!(!css.contains(".bg-terracotta"));
    assert!(!css.contains(".grid"));
}

#[test]
#[ignore]
fn classes_used_only_in_scripts_are_kept() {
    let css = build_css(&[
        ("index.html", PAGE),
        ("app.js", "document.body.classList.add('text-terracotta');\n"),
    ]);

    assert!(css.contains(".text-terracotta"));
}
