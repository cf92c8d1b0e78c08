//! Sprite builder stage - packs individual images into one sheet.
//!
//! Source images are packed top-to-bottom with configurable padding, and a
//! generated stylesheet partial maps each source image to a class carrying
//! the sheet's background position. The sheet lands in staging (it is hashed
//! later like any other asset); the partial lands in the generated-include
//! directory so the injector picks it up on the next stylesheet build.

use crate::build::BuildContext;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// File name of the generated stylesheet partial.
pub const SPRITE_PARTIAL_FILENAME: &str = "_sprite.css";

/// Error during sprite building
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpriteError {
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
}

/// One packed source image and its slot in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteSlot {
    /// Source file stem, used for the generated class name
    pub name: String,
    /// Horizontal offset in the sheet
    pub x: u32,
    /// Vertical offset in the sheet
    pub y: u32,
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
}

/// Outcome of one sprite build
#[derive(Debug, Default)]
pub struct SpriteReport {
    /// Number of images packed
    pub packed: usize,
    /// Path of the written sheet, when any image was packed
    pub sheet: Option<PathBuf>,
    /// Path of the generated stylesheet partial
    pub partial: Option<PathBuf>,
}

/// Pack the sprite source directory into a sheet plus a generated partial.
///
/// An absent or empty source directory is not an error; the stage simply
/// produces nothing.
pub fn build_sprite(ctx: &BuildContext) -> Result<SpriteReport, SpriteError> {
    let sources = list_sources(&ctx.sprite_dir());
    if sources.is_empty() {
        return Ok(SpriteReport::default());
    }

    let mut images = Vec::with_capacity(sources.len());
    for source in &sources {
        let img = image::open(source)
            .map_err(|source_err| SpriteError::Image {
                path: source.display().to_string(),
                source: source_err,
            })?
            .to_rgba8();
        let name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        images.push((name, img));
    }

    let padding = ctx.config().sprite.padding;
    let (sheet, slots) = pack_vertical(&images, padding);

    let sheet_path = ctx.staged_sprite_sheet();
    write_image(&sheet, &sheet_path)?;

    let partial_path = ctx.generated_dir().join(SPRITE_PARTIAL_FILENAME);
    let css = render_partial(
        &slots,
        &ctx.config().sprite.public_path,
        &ctx.config().sprite.class_prefix,
    );
    write_text(&css, &partial_path)?;

    Ok(SpriteReport {
        packed: slots.len(),
        sheet: Some(sheet_path),
        partial: Some(partial_path),
    })
}

/// Source images in deterministic (sorted) scan order.
fn list_sources(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect()
}

/// Pack images top-to-bottom with `padding` pixels between them.
pub fn pack_vertical(images: &[(String, RgbaImage)], padding: u32) -> (RgbaImage, Vec<SpriteSlot>) {
    let width = images.iter().map(|(_, img)| img.width()).max().unwrap_or(1);
    let height: u32 = images.iter().map(|(_, img)| img.height()).sum::<u32>()
        + padding * images.len().saturating_sub(1) as u32;

    let mut sheet = RgbaImage::from_pixel(width.max(1), height.max(1), image::Rgba([0, 0, 0, 0]));
    let mut slots = Vec::with_capacity(images.len());
    let mut y = 0u32;

    for (name, img) in images {
        image::imageops::replace(&mut sheet, img, 0, i64::from(y));
        slots.push(SpriteSlot {
            name: name.clone(),
            x: 0,
            y,
            width: img.width(),
            height: img.height(),
        });
        y += img.height() + padding;
    }

    (sheet, slots)
}

/// Render the generated stylesheet partial, one rule per packed image.
pub fn render_partial(slots: &[SpriteSlot], public_path: &str, class_prefix: &str) -> String {
    let mut out = String::new();
    for slot in slots {
        out.push_str(&format!(
            ".{prefix}{name} {{\n  background-image: url({url});\n  background-position: -{x}px -{y}px;\n  width: {w}px;\n  height: {h}px;\n}}\n",
            prefix = class_prefix,
            name = slot.name,
            url = public_path,
            x = slot.x,
            y = slot.y,
            w = slot.width,
            h = slot.height,
        ));
    }
    out
}

fn write_image(sheet: &RgbaImage, path: &Path) -> Result<(), SpriteError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|source| SpriteError::Io { path: path.display().to_string(), source })?;
    }
    sheet
        .save(path)
        .map_err(|source| SpriteError::Image { path: path.display().to_string(), source })
}

fn write_text(text: &str, path: &Path) -> Result<(), SpriteError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|source| SpriteError::Io { path: path.display().to_string(), source })?;
    }
    std::fs::write(path, text)
        .map_err(|source| SpriteError::Io { path: path.display().to_string(), source })
}
