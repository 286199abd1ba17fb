//! Encode cache kept between builds.
//!
//! Encoding dominates build time, and most builds touch few images. The
//! optimize stage asks this cache before encoding and copies the stored
//! artifact on a hit.
//!
//! The output directory is wiped at the start of every build, so artifacts
//! live in their own directory (`paths.cache_dir`, default
//! `.pagepress-cache/`):
//!
//! ```text
//! .pagepress-cache/
//! ├── manifest.json
//! └── artifacts/
//!     ├── <source_hash>-<params_hash>.jpg
//!     └── <source_hash>-<params_hash>.webp
//! ```
//!
//! ## Keys
//!
//! Entries are addressed by content, never by image path, so renaming an
//! image keeps its artifacts.
//!
//! - **`source_hash`**: SHA-256 of the source bytes. File times are ignored;
//!   a fresh checkout still hits.
//! - **`params_hash`**: SHA-256 of format, target width and height, and
//!   quality. The target size already reflects the large threshold and both
//!   ceilings.
//!
//! A hit needs a manifest entry for both hashes and the artifact file on disk.
//! A manifest that is missing, unreadable, or from another format version
//! counts as empty.
//!
//! ## `--no-cache`
//!
//! Starts from an empty manifest: every image is encoded and the fresh
//! artifacts replace the stored ones.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the cache directory.
const MANIFEST_FILENAME: &str = "manifest.json";

/// Subdirectory holding stored artifacts.
const ARTIFACTS_DIR: &str = "artifacts";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached artifact.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk cache manifest mapping artifact paths to their cache entries.
///
/// Lookups go through a runtime `content_index` that maps
/// `"{source_hash}:{params_hash}"` to the stored artifact path.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    /// Artifact path (relative to the cache directory) → entry.
    pub entries: HashMap<String, CacheEntry>,
    /// Runtime reverse index: `"{source_hash}:{params_hash}"` → artifact path.
    /// Built at load time, maintained on insert. Never serialized.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from the cache directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(cache_dir: &Path) -> Self {
        let parsed = std::fs::read_to_string(manifest_path(cache_dir))
            .ok()
            .and_then(|json| serde_json::from_str::<Self>(&json).ok())
            .filter(|m| m.version == MANIFEST_VERSION);
        match parsed {
            Some(mut manifest) => {
                manifest.content_index = build_content_index(&manifest.entries);
                manifest
            }
            None => Self::empty(),
        }
    }

    /// Save to the cache directory, creating it if needed.
    pub fn save(&self, cache_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(cache_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(cache_dir), json)
    }

    /// Look up a stored artifact by content hashes.
    ///
    /// Returns the absolute artifact path if an entry with matching
    /// `source_hash` and `params_hash` exists **and** the file is still
    /// on disk.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        cache_dir: &Path,
    ) -> Option<PathBuf> {
        let key = content_key(source_hash, params_hash);
        let stored = cache_dir.join(self.content_index.get(&key)?);
        stored.exists().then_some(stored)
    }

    /// Record a cache entry for an artifact path.
    ///
    /// If an entry with the same content (source_hash + params_hash) already
    /// exists under a different path, the old entry is removed.
    pub fn insert(&mut self, artifact: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);
        if let Some(previous) = self.content_index.get(&key)
            && *previous != artifact
        {
            self.entries.remove(previous.as_str());
        }
        self.content_index.insert(key, artifact.clone());
        self.entries.insert(
            artifact,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Relative path an artifact is stored under.
pub fn artifact_path(source_hash: &str, params_hash: &str, extension: &str) -> String {
    format!("{ARTIFACTS_DIR}/{source_hash}-{params_hash}.{extension}")
}

/// Copy a freshly encoded file into the cache directory.
///
/// Returns the relative artifact path to pass to [`CacheManifest::insert`].
pub fn store_artifact(
    cache_dir: &Path,
    produced: &Path,
    source_hash: &str,
    params_hash: &str,
) -> io::Result<String> {
    let extension = produced
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let artifact = artifact_path(source_hash, params_hash, extension);
    let target = cache_dir.join(&artifact);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(produced, target)?;
    Ok(artifact)
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

fn build_content_index(entries: &HashMap<String, CacheEntry>) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(artifact, entry)| {
            (
                content_key(&entry.source_hash, &entry.params_hash),
                artifact.clone(),
            )
        })
        .collect()
}

/// Hex SHA-256 of a file.
pub fn hash_file(path: &Path) -> io::Result<String> {
    Ok(format!("{:x}", Sha256::digest(std::fs::read(path)?)))
}

/// SHA-256 hash of the parameters of one encode.
///
/// Inputs: format extension, target width and height, quality. If any of
/// these change, the previously cached artifact is invalid.
pub fn hash_encode_params(format: &str, width: u32, height: u32, quality: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format.as_bytes());
    hasher.update(b"\0");
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update(quality.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}

/// Resolve the cache manifest path for a cache directory.
pub fn manifest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MANIFEST_FILENAME)
}
