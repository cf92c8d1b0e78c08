//! Stylesheet compiler stage.
//!
//! Bundles the root stylesheet's `@import` graph into a single file, applies
//! vendor prefixes for the supported browser set, and writes the result to
//! staging. Nothing is written on failure, so a broken partial leaves the
//! previously compiled output in place.

use crate::build::BuildContext;
use lightningcss::bundler::{Bundler, FileProvider};
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::PathBuf;
use thiserror::Error;

/// Error during stylesheet compilation
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StylesheetError {
    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// CSS parse or bundling error from lightningcss
    #[error("Failed to compile {path}: {message}")]
    Compile { path: String, message: String },
    /// CSS minification or printing error
    #[error("CSS transform error: {0}")]
    Transform(String),
}

/// Outcome of one compiler run
#[derive(Debug)]
pub struct StylesheetReport {
    /// Where the compiled stylesheet was written
    pub output: PathBuf,
    /// Size of the compiled output in bytes
    pub bytes: usize,
}

/// Browser set vendor prefixes are generated for.
fn browser_targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(90 << 16),
        edge: Some(90 << 16),
        firefox: Some(88 << 16),
        safari: Some(14 << 16),
        ios_saf: Some(14 << 16),
        ..Browsers::default()
    })
}

/// Bundle and prefix the root stylesheet into staging.
pub fn compile_stylesheet(ctx: &BuildContext) -> Result<StylesheetReport, StylesheetError> {
    let root = ctx.root_stylesheet();
    let path_str = root.display().to_string();

    let fs = FileProvider::new();
    let mut bundler = Bundler::new(&fs, None, ParserOptions::default());
    let mut sheet = bundler
        .bundle(&root)
        .map_err(|e| StylesheetError::Compile { path: path_str.clone(), message: e.to_string() })?;

    let targets = browser_targets();
    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| StylesheetError::Transform(e.to_string()))?;
    let css = sheet
        .to_css(PrinterOptions { minify: false, targets, ..PrinterOptions::default() })
        .map_err(|e| StylesheetError::Transform(e.to_string()))?;

    let output = ctx.staged_stylesheet();
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|source| StylesheetError::Io { path: output.display().to_string(), source })?;
    }
    std::fs::write(&output, &css.code)
        .map_err(|source| StylesheetError::Io { path: output.display().to_string(), source })?;

    Ok(StylesheetReport { output, bytes: css.code.len() })
}

/// Minify a standalone stylesheet, used by the asset pipeline on bundles.
pub fn minify_css(code: &str) -> Result<String, StylesheetError> {
    let targets = browser_targets();
    let mut sheet = StyleSheet::parse(code, ParserOptions::default())
        .map_err(|e| StylesheetError::Transform(e.to_string()))?;
    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| StylesheetError::Transform(e.to_string()))?;
    let out = sheet
        .to_css(PrinterOptions { minify: true, targets, ..PrinterOptions::default() })
        .map_err(|e| StylesheetError::Transform(e.to_string()))?;
    Ok(out.code)
}
