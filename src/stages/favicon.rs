//! Favicon stage - renders the icon bundle and injects its markup.
//!
//! A single master image is resized into the conventional icon set, a web
//! manifest is written next to the icons, and the matching `<link>`/`<meta>`
//! markup is recorded in staging as `faviconData.json`. A second step splices
//! that markup into the published index page just before `</head>`.

use crate::build::BuildContext;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Icon sizes rendered from the master image, with their file names.
pub const ICON_SIZES: &[(u32, &str)] = &[
    (16, "favicon-16x16.png"),
    (32, "favicon-32x32.png"),
    (48, "favicon-48x48.png"),
    (180, "apple-touch-icon.png"),
    (192, "android-chrome-192x192.png"),
    (512, "android-chrome-512x512.png"),
];

/// File name of the web manifest inside the favicon directory.
pub const MANIFEST_FILENAME: &str = "site.webmanifest";
/// File name of the recorded markup inside staging.
pub const MARKUP_FILENAME: &str = "faviconData.json";

/// Error during favicon generation or injection
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FaviconError {
    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Image decode/encode error
    #[error("Image error on {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The published index page has no `</head>` to inject before
    #[error("No </head> tag in {path}")]
    MissingHead { path: String },
}

/// Markup recorded by generation and consumed by injection.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaviconMarkup {
    /// Tags to splice into the document head, in order
    pub html: Vec<String>,
}

/// Web manifest written alongside the icons.
#[derive(Debug, Serialize)]
struct WebManifest {
    name: String,
    short_name: String,
    icons: Vec<ManifestIcon>,
    theme_color: String,
    background_color: String,
    display: String,
}

#[derive(Debug, Serialize)]
struct ManifestIcon {
    src: String,
    sizes: String,
    #[serde(rename = "type")]
    mime: String,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FaviconError + '_ {
    move |source| FaviconError::Io { path: path.display().to_string(), source }
}

/// Render the icon bundle from the master image into the dist favicon
/// directory and record the head markup in staging.
pub fn generate_favicons(ctx: &BuildContext) -> Result<FaviconMarkup, FaviconError> {
    let master_path = ctx.favicon_master();
    let master = image::open(&master_path).map_err(|source| FaviconError::Image {
        path: master_path.display().to_string(),
        source,
    })?;

    let out_dir = ctx.favicon_dir();
    std::fs::create_dir_all(&out_dir).map_err(io_err(&out_dir))?;

    for &(size, name) in ICON_SIZES {
        let icon = master.resize_exact(size, size, FilterType::Lanczos3);
        let path = out_dir.join(name);
        icon.save(&path).map_err(|source| FaviconError::Image {
            path: path.display().to_string(),
            source,
        })?;
    }

    let public = format!("/{}", ctx.config().paths.favicon_dir);
    let manifest = WebManifest {
        name: ctx.config().project.name.clone(),
        short_name: ctx.config().project.name.clone(),
        icons: vec![
            ManifestIcon {
                src: format!("{}/android-chrome-192x192.png", public),
                sizes: "192x192".to_string(),
                mime: "image/png".to_string(),
            },
            ManifestIcon {
                src: format!("{}/android-chrome-512x512.png", public),
                sizes: "512x512".to_string(),
                mime: "image/png".to_string(),
            },
        ],
        theme_color: ctx.config().favicon.theme_color.clone(),
        background_color: ctx.config().favicon.background_color.clone(),
        display: "standalone".to_string(),
    };
    let manifest_path = out_dir.join(MANIFEST_FILENAME);
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .map_err(io_err(&manifest_path))?;

    let markup = head_markup(&public, &ctx.config().favicon.theme_color);
    let markup_path = ctx.staging_dir().join(MARKUP_FILENAME);
    if let Some(parent) = markup_path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(&markup_path))?;
    }
    std::fs::write(&markup_path, serde_json::to_string_pretty(&markup)?)
        .map_err(io_err(&markup_path))?;

    Ok(markup)
}

/// The `<link>`/`<meta>` tags pointing at the rendered bundle.
fn head_markup(public: &str, theme_color: &str) -> FaviconMarkup {
    FaviconMarkup {
        html: vec![
            format!(r#"<link rel="apple-touch-icon" sizes="180x180" href="{}/apple-touch-icon.png">"#, public),
            format!(r#"<link rel="icon" type="image/png" sizes="48x48" href="{}/favicon-48x48.png">"#, public),
            format!(r#"<link rel="icon" type="image/png" sizes="32x32" href="{}/favicon-32x32.png">"#, public),
            format!(r#"<link rel="icon" type="image/png" sizes="16x16" href="{}/favicon-16x16.png">"#, public),
            format!(r#"<link rel="manifest" href="{}/{}">"#, public, MANIFEST_FILENAME),
            format!(r#"<meta name="theme-color" content="{}">"#, theme_color),
        ],
    }
}

/// Splice the recorded markup into the published index page.
pub fn inject_markup(ctx: &BuildContext) -> Result<(), FaviconError> {
    let markup_path = ctx.staging_dir().join(MARKUP_FILENAME);
    let raw = std::fs::read_to_string(&markup_path).map_err(io_err(&markup_path))?;
    let markup: FaviconMarkup = serde_json::from_str(&raw)?;

    let index_path = ctx.dist_dir().join("index.html");
    let html = std::fs::read_to_string(&index_path).map_err(io_err(&index_path))?;
    let updated = splice_before_head_close(&html, &markup, &index_path)?;
    std::fs::write(&index_path, updated).map_err(io_err(&index_path))
}

fn splice_before_head_close(
    html: &str,
    markup: &FaviconMarkup,
    index_path: &Path,
) -> Result<String, FaviconError> {
    let at = html.find("</head>").ok_or_else(|| FaviconError::MissingHead {
        path: index_path.display().to_string(),
    })?;
    let mut out = String::with_capacity(html.len() + 256);
    out.push_str(&html[..at]);
    for line in &markup.html {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&html[at..]);
    Ok(out)
}
