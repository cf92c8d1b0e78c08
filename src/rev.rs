//! Content-hash revisioning.
//!
//! Every non-markup asset is renamed to embed a hash of its bytes, and a
//! manifest records the original → renamed mapping so references in shipped
//! HTML and CSS can be rewritten consistently. Identical bytes always yield
//! the identical name, which is what makes long-lived caching safe.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

/// Number of hex characters of the content hash embedded in file names.
const HASH_SEGMENT_LEN: usize = 10;

/// File name the manifest is written under in the dist root.
pub const REV_MANIFEST_FILENAME: &str = "rev-manifest.json";

/// Error during manifest serialization.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RevError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compute the hash segment for a blob of content.
///
/// SHA-256, truncated to [`HASH_SEGMENT_LEN`] lowercase hex characters.
pub fn hash_segment(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut hex = String::with_capacity(HASH_SEGMENT_LEN);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(hex, "{:02x}", byte);
        if hex.len() >= HASH_SEGMENT_LEN {
            break;
        }
    }
    hex.truncate(HASH_SEGMENT_LEN);
    hex
}

/// Produce the hash-embedded name for a relative path and its content.
///
/// `css/site.css` with hash `0a1b2c3d4e` becomes `css/site-0a1b2c3d4e.css`.
/// Extensionless files get the segment appended after the stem.
pub fn revved_path(rel: &str, content: &[u8]) -> String {
    let hash = hash_segment(content);
    let (dir, file) = match rel.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, rel),
    };
    let renamed = match file.rsplit_once('.') {
        Some((stem, ext)) => format!("{}-{}.{}", stem, hash, ext),
        None => format!("{}-{}", file, hash),
    };
    match dir {
        Some(dir) => format!("{}/{}", dir, renamed),
        None => renamed,
    }
}

/// Mapping from original relative paths to their hash-renamed paths.
///
/// Keys use forward slashes and no leading slash. A `BTreeMap` keeps the
/// serialized manifest deterministic across builds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevManifest {
    #[serde(flatten)]
    entries: BTreeMap<String, String>,
}

impl RevManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rename.
    pub fn insert(&mut self, original: impl Into<String>, renamed: impl Into<String>) {
        self.entries.insert(original.into(), renamed.into());
    }

    /// Look up the renamed path for an original.
    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over (original, renamed) pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    /// Rewrite every reference to an original path in `text`.
    ///
    /// Longer originals are replaced first so that one key being a prefix of
    /// another cannot corrupt the longer reference. References with no
    /// manifest entry are deliberately left untouched.
    pub fn rewrite(&self, text: &str) -> String {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut out = text.to_string();
        for key in keys {
            if let Some(renamed) = self.entries.get(key) {
                out = out.replace(key.as_str(), renamed.as_str());
            }
        }
        out
    }

    /// Save the manifest as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), RevError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
