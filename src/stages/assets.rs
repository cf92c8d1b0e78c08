//! Markup and asset pipeline stage.
//!
//! Assets flow through an explicit sequence of functions over a record
//! vector: collect, bundle, minify, optimize, rename, rewrite, publish. Each
//! step takes the records by value and returns the transformed set, so the
//! whole pipeline is ordinary data flow with no callbacks. Dist is replaced
//! only by the final publish step; any earlier failure leaves the previous
//! dist untouched.

use crate::build::BuildContext;
use crate::bundles::{self, BundleError, BundleKind};
use crate::rev::{self, RevError, RevManifest, REV_MANIFEST_FILENAME};
use crate::stages::stylesheet::{minify_css, StylesheetError};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions treated as images by the collector.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "ico"];

/// Error in the asset pipeline
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssetError {
    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Invalid markup glob pattern
    #[error("Invalid markup glob '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// A text asset was not valid UTF-8
    #[error("{path} is not valid UTF-8")]
    NonUtf8 { path: String },
    /// Bundle annotation error
    #[error(transparent)]
    Bundle(#[from] BundleError),
    /// Stylesheet minification error
    #[error(transparent)]
    Stylesheet(#[from] StylesheetError),
    /// Image re-encode error
    #[error("Image error on {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    /// Manifest serialization error
    #[error(transparent)]
    Rev(#[from] RevError),
}

/// What an asset record holds, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// HTML page
    Markup,
    /// Stylesheet
    Stylesheet,
    /// Script
    Script,
    /// Raster or vector image
    Image,
    /// Anything else
    Other,
}

impl AssetKind {
    /// Classify a relative path by extension.
    pub fn classify(rel: &str) -> Self {
        let ext = match rel.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return AssetKind::Other,
        };
        match ext.as_str() {
            "html" | "htm" => AssetKind::Markup,
            "css" => AssetKind::Stylesheet,
            "js" => AssetKind::Script,
            _ if IMAGE_EXTENSIONS.contains(&ext.as_str()) => AssetKind::Image,
            _ => AssetKind::Other,
        }
    }
}

/// One asset moving through the pipeline.
#[derive(Debug, Clone)]
pub struct AssetRecord {
    /// Path relative to the dist root, forward slashes, no leading slash
    pub rel: String,
    /// Asset kind
    pub kind: AssetKind,
    /// Current content bytes
    pub content: Vec<u8>,
}

/// Summary of one pipeline run.
#[derive(Debug)]
pub struct AssetReport {
    /// Records written to dist (manifest excluded)
    pub published: usize,
    /// Bundles produced from markup annotations
    pub bundles: usize,
    /// Renames recorded in the manifest
    pub revved: usize,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> AssetError + '_ {
    move |source| AssetError::Io { path: path.display().to_string(), source }
}

/// Forward-slash relative path for a file under `base`.
fn rel_string(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    Some(
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

/// Gather markup and image records from the source tree plus the staged
/// sprite sheet, in deterministic sorted order.
pub fn collect(ctx: &BuildContext) -> Result<Vec<AssetRecord>, AssetError> {
    let src = ctx.src_dir();
    let sprite_dir = ctx.sprite_dir();
    let favicon_master = ctx.favicon_master();
    let mut records = Vec::new();

    let pattern = src.join(&ctx.config().paths.markup_glob).display().to_string();
    let matches = glob::glob(&pattern)
        .map_err(|source| AssetError::Glob { pattern: pattern.clone(), source })?;
    for entry in matches {
        let path = match entry {
            Ok(p) => p,
            Err(_) => continue,
        };
        if !path.is_file() {
            continue;
        }
        push_record(&mut records, &src, &path)?;
    }

    for entry in WalkDir::new(&src).sort_by_file_name().into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.starts_with(&sprite_dir)
            || path == favicon_master
        {
            continue;
        }
        let is_image = path
            .extension()
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_string_lossy().to_lowercase().as_str()));
        if is_image {
            push_record(&mut records, &src, path)?;
        }
    }

    let sheet = ctx.staged_sprite_sheet();
    if sheet.is_file() {
        let rel = format!("img/{}", ctx.config().sprite.sheet_name);
        let content = std::fs::read(&sheet).map_err(io_err(&sheet))?;
        records.push(AssetRecord { kind: AssetKind::classify(&rel), rel, content });
    }

    records.sort_by(|a, b| a.rel.cmp(&b.rel));
    records.dedup_by(|a, b| a.rel == b.rel);
    Ok(records)
}

fn push_record(records: &mut Vec<AssetRecord>, base: &Path, path: &Path) -> Result<(), AssetError> {
    let rel = match rel_string(base, path) {
        Some(rel) => rel,
        None => return Ok(()),
    };
    let content = std::fs::read(path).map_err(io_err(path))?;
    records.push(AssetRecord { kind: AssetKind::classify(&rel), rel, content });
    Ok(())
}

/// Collapse annotation blocks in markup records and emit one record per
/// bundle target. Duplicate targets across pages are merged (first wins).
pub fn apply_bundles(
    ctx: &BuildContext,
    mut records: Vec<AssetRecord>,
) -> Result<Vec<AssetRecord>, AssetError> {
    let roots = vec![ctx.staging_dir(), ctx.src_dir()];
    let mut produced: BTreeMap<String, AssetRecord> = BTreeMap::new();

    for record in records.iter_mut() {
        if record.kind != AssetKind::Markup {
            continue;
        }
        let markup = std::str::from_utf8(&record.content)
            .map_err(|_| AssetError::NonUtf8 { path: record.rel.clone() })?;
        let outcome = bundles::rewrite_markup(markup, &roots)?;
        record.content = outcome.markup.into_bytes();

        for bundle in outcome.bundles {
            let rel = bundle.target.trim_start_matches('/').to_string();
            let kind = match bundle.kind {
                BundleKind::Css => AssetKind::Stylesheet,
                BundleKind::Js => AssetKind::Script,
            };
            produced
                .entry(rel.clone())
                .or_insert(AssetRecord { rel, kind, content: bundle.content });
        }
    }

    records.extend(produced.into_values());
    records.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(records)
}

/// Minify every stylesheet record in place.
pub fn minify_stylesheets(mut records: Vec<AssetRecord>) -> Result<Vec<AssetRecord>, AssetError> {
    for record in records.iter_mut() {
        if record.kind != AssetKind::Stylesheet {
            continue;
        }
        let css = std::str::from_utf8(&record.content)
            .map_err(|_| AssetError::NonUtf8 { path: record.rel.clone() })?;
        record.content = minify_css(css)?.into_bytes();
    }
    Ok(records)
}

/// Losslessly re-encode PNG records; other image types pass through.
pub fn optimize_images(mut records: Vec<AssetRecord>) -> Result<Vec<AssetRecord>, AssetError> {
    for record in records.iter_mut() {
        if record.kind != AssetKind::Image || !record.rel.ends_with(".png") {
            continue;
        }
        let decoded = image::load_from_memory(&record.content).map_err(|source| {
            AssetError::Image { path: record.rel.clone(), source }
        })?;
        let mut buf = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .map_err(|source| AssetError::Image { path: record.rel.clone(), source })?;
        record.content = buf;
    }
    Ok(records)
}

/// Rename every non-markup record to embed its content hash.
pub fn rev_assets(mut records: Vec<AssetRecord>) -> (Vec<AssetRecord>, RevManifest) {
    let mut manifest = RevManifest::new();
    for record in records.iter_mut() {
        if record.kind == AssetKind::Markup {
            continue;
        }
        let renamed = rev::revved_path(&record.rel, &record.content);
        manifest.insert(record.rel.clone(), renamed.clone());
        record.rel = renamed;
    }
    (records, manifest)
}

/// Rewrite manifest-keyed references inside markup and stylesheet records.
pub fn rewrite_references(
    mut records: Vec<AssetRecord>,
    manifest: &RevManifest,
) -> Result<Vec<AssetRecord>, AssetError> {
    for record in records.iter_mut() {
        if !matches!(record.kind, AssetKind::Markup | AssetKind::Stylesheet) {
            continue;
        }
        let text = std::str::from_utf8(&record.content)
            .map_err(|_| AssetError::NonUtf8 { path: record.rel.clone() })?;
        record.content = manifest.rewrite(text).into_bytes();
    }
    Ok(records)
}

/// Replace dist with the finished records plus the rename manifest.
pub fn publish(
    ctx: &BuildContext,
    records: &[AssetRecord],
    manifest: &RevManifest,
) -> Result<(), AssetError> {
    let dist = ctx.dist_dir();
    match std::fs::remove_dir_all(&dist) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => return Err(AssetError::Io { path: dist.display().to_string(), source }),
    }

    for record in records {
        let path = dist.join(&record.rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err(&path))?;
        }
        std::fs::write(&path, &record.content).map_err(io_err(&path))?;
    }
    manifest.save(&dist.join(REV_MANIFEST_FILENAME))?;
    Ok(())
}

/// Copy top-level loose files (robots.txt and the like) from the source root
/// into dist, unrevved.
pub fn copy_static(ctx: &BuildContext) -> Result<usize, AssetError> {
    let src = ctx.src_dir();
    let dist = ctx.dist_dir();
    let mut copied = 0;

    let entries = match std::fs::read_dir(&src) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => return Err(AssetError::Io { path: src.display().to_string(), source }),
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    for path in paths {
        let rel = match rel_string(&src, &path) {
            Some(rel) => rel,
            None => continue,
        };
        if AssetKind::classify(&rel) != AssetKind::Other {
            continue;
        }
        std::fs::create_dir_all(&dist).map_err(io_err(&dist))?;
        std::fs::copy(&path, dist.join(&rel)).map_err(io_err(&path))?;
        copied += 1;
    }
    Ok(copied)
}

/// Run the full pipeline: collect through publish.
pub fn run(ctx: &BuildContext) -> Result<AssetReport, AssetError> {
    let records = collect(ctx)?;
    let before_bundles = records.len();
    let records = apply_bundles(ctx, records)?;
    let bundle_count = records.len() - before_bundles;
    let records = minify_stylesheets(records)?;
    let records = optimize_images(records)?;
    let (records, manifest) = rev_assets(records);
    let records = rewrite_references(records, &manifest)?;
    publish(ctx, &records, &manifest)?;

    Ok(AssetReport { published: records.len(), bundles: bundle_count, revved: manifest.len() })
}
