//! Asset bundle annotations in markup.
//!
//! Markup may group individual asset references between paired comments:
//!
//! ```html
//! <!-- build:css /css/site.css -->
//! <link rel="stylesheet" href="/css/reset.css">
//! <link rel="stylesheet" href="/css/site.css">
//! <!-- endbuild -->
//! ```
//!
//! The block is replaced by a single tag referencing the target bundle, and
//! the referenced files are concatenated in source order to form the
//! bundle's content. Reference resolution tries each search root in order
//! (staging before source, so compiled artifacts shadow raw ones).

use regex::Regex;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of asset bundle an annotation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// Stylesheet bundle, replaced by a `<link>` tag
    Css,
    /// Script bundle, replaced by a `<script>` tag
    Js,
}

impl BundleKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "css" => Some(BundleKind::Css),
            "js" => Some(BundleKind::Js),
            _ => None,
        }
    }
}

/// A bundle produced by rewriting one annotation block.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Bundle kind
    pub kind: BundleKind,
    /// Target path as written in the annotation (e.g. `/css/site.css`)
    pub target: String,
    /// Concatenated content of the referenced files, in source order
    pub content: Vec<u8>,
}

/// Error while rewriting annotations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BundleError {
    /// Annotation named an unsupported bundle kind
    #[error("Unsupported bundle kind '{0}' in build annotation")]
    UnsupportedKind(String),
    /// A referenced asset was not found under any search root
    #[error("Bundle '{target}' references '{reference}', not found under any search root")]
    MissingReference { target: String, reference: String },
    /// IO error reading a referenced asset
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Internal regex construction failure
    #[error("Invalid annotation pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result of rewriting one markup file.
#[derive(Debug)]
pub struct RewriteOutcome {
    /// Markup with annotation blocks collapsed to single tags
    pub markup: String,
    /// Bundles discovered in this file, in document order
    pub bundles: Vec<Bundle>,
}

/// Rewrite all annotation blocks in `markup`.
///
/// `search_roots` are tried in order when resolving each reference; the
/// reference's leading `/` is stripped and the remainder joined to the root.
pub fn rewrite_markup(markup: &str, search_roots: &[PathBuf]) -> Result<RewriteOutcome, BundleError> {
    let block_re =
        Regex::new(r"(?s)<!--\s*build:(\w+)\s+(\S+)\s*-->(.*?)<!--\s*endbuild\s*-->")?;
    let ref_re = Regex::new(r#"(?:href|src)\s*=\s*"([^"]+)""#)?;

    let mut bundles = Vec::new();
    let mut out = String::with_capacity(markup.len());
    let mut last_end = 0;

    for caps in block_re.captures_iter(markup) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let kind_str = &caps[1];
        let target = caps[2].to_string();
        let body = &caps[3];

        let kind = BundleKind::parse(kind_str)
            .ok_or_else(|| BundleError::UnsupportedKind(kind_str.to_string()))?;

        let mut content = Vec::new();
        for ref_caps in ref_re.captures_iter(body) {
            let reference = &ref_caps[1];
            let bytes = resolve_reference(reference, search_roots).ok_or_else(|| {
                BundleError::MissingReference {
                    target: target.clone(),
                    reference: reference.to_string(),
                }
            })??;
            if !content.is_empty() {
                content.push(b'\n');
            }
            content.extend_from_slice(&bytes);
        }

        out.push_str(&markup[last_end..whole.start()]);
        out.push_str(&replacement_tag(kind, &target));
        last_end = whole.end();

        bundles.push(Bundle { kind, target, content });
    }
    out.push_str(&markup[last_end..]);

    Ok(RewriteOutcome { markup: out, bundles })
}

/// The single tag an annotation block collapses to.
fn replacement_tag(kind: BundleKind, target: &str) -> String {
    match kind {
        BundleKind::Css => format!(r#"<link rel="stylesheet" href="{}">"#, target),
        BundleKind::Js => format!(r#"<script src="{}"></script>"#, target),
    }
}

/// Try each search root in order; `None` when the reference matches nowhere.
fn resolve_reference(
    reference: &str,
    search_roots: &[PathBuf],
) -> Option<Result<Vec<u8>, BundleError>> {
    let rel = reference.trim_start_matches('/');
    for root in search_roots {
        let candidate = root.join(rel);
        if candidate.is_file() {
            return Some(
                std::fs::read(&candidate)
                    .map_err(|source| BundleError::Io { path: candidate, source }),
            );
        }
    }
    None
}
