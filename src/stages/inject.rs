//! Include injector stage - regenerates the root stylesheet's import block.
//!
//! The root stylesheet carries a marked region:
//!
//! ```css
//! /* inject:imports */
//! @import "partials/layout.css";
//! /* endinject */
//! ```
//!
//! This stage replaces the content strictly between the markers with one
//! `@import` line per partial, leaving everything else untouched. Running it
//! twice against unchanged directory contents yields identical output.

use crate::build::BuildContext;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Marker opening the generated region.
pub const START_MARKER: &str = "/* inject:imports */";
/// Marker closing the generated region.
pub const END_MARKER: &str = "/* endinject */";

/// Error during include injection
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InjectError {
    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The root stylesheet is missing one or both markers
    #[error("Missing '{marker}' marker in {path}")]
    MissingMarker { path: String, marker: &'static str },
    /// A partial lives outside the root stylesheet's directory tree
    #[error("Partial {partial} is not under the root stylesheet directory {root}")]
    PartialOutsideRoot { partial: String, root: String },
}

/// Outcome of one injector run
#[derive(Debug)]
pub struct InjectReport {
    /// Number of partials listed in the regenerated block
    pub partials: usize,
    /// Whether the root stylesheet's bytes changed
    pub changed: bool,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> InjectError + '_ {
    move |source| InjectError::Io { path: path.display().to_string(), source }
}

/// Regenerate the root stylesheet's import aggregation block in place.
pub fn inject_imports(ctx: &BuildContext) -> Result<InjectReport, InjectError> {
    let root_file = ctx.root_stylesheet();
    let partials = list_partials(&ctx.stylesheet_dir(), &ctx.generated_dir(), &root_file);

    let original = std::fs::read_to_string(&root_file).map_err(io_err(&root_file))?;
    let block = render_import_block(&root_file, &partials)?;
    let updated = replace_between_markers(&original, &block, &root_file)?;

    let changed = updated != original;
    if changed {
        std::fs::write(&root_file, &updated).map_err(io_err(&root_file))?;
    }

    Ok(InjectReport { partials: partials.len(), changed })
}

/// Partial stylesheets in injection order.
///
/// Hand-written partials come first (sorted scan order, excluding the root
/// file and the generated directory), then generated partials in sorted
/// order. The generated directory is excluded from the first scan so its
/// files appear exactly once.
pub fn list_partials(stylesheet_dir: &Path, generated_dir: &Path, root_file: &Path) -> Vec<PathBuf> {
    let mut partials = scan_css(stylesheet_dir, &[generated_dir], root_file);
    partials.extend(scan_css(generated_dir, &[], root_file));
    partials
}

fn scan_css(dir: &Path, excluded_dirs: &[&Path], root_file: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !excluded_dirs.iter().any(|x| e.path() == *x))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "css") && p != root_file)
        .collect()
}

/// Format the `@import` lines for the region between the markers.
fn render_import_block(root_file: &Path, partials: &[PathBuf]) -> Result<String, InjectError> {
    let base = root_file.parent().unwrap_or_else(|| Path::new("."));
    let mut lines = Vec::with_capacity(partials.len());
    for partial in partials {
        let rel = partial.strip_prefix(base).map_err(|_| InjectError::PartialOutsideRoot {
            partial: partial.display().to_string(),
            root: base.display().to_string(),
        })?;
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        lines.push(format!("@import \"{}\";", rel));
    }
    Ok(lines.join("\n"))
}

/// Replace the content strictly between the two markers, keeping both.
fn replace_between_markers(
    original: &str,
    block: &str,
    root_file: &Path,
) -> Result<String, InjectError> {
    let path = root_file.display().to_string();
    let start = original.find(START_MARKER).ok_or(InjectError::MissingMarker {
        path: path.clone(),
        marker: START_MARKER,
    })?;
    let after_start = start + START_MARKER.len();
    let end_rel = original[after_start..]
        .find(END_MARKER)
        .ok_or(InjectError::MissingMarker { path, marker: END_MARKER })?;
    let end = after_start + end_rel;

    let mut out = String::with_capacity(original.len() + block.len());
    out.push_str(&original[..after_start]);
    out.push('\n');
    if !block.is_empty() {
        out.push_str(block);
        out.push('\n');
    }
    out.push_str(&original[end..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::fs;
    use tempfile::TempDir;

    const ROOT_TEMPLATE: &str =
        "body { margin: 0; }\n/* inject:imports */\n/* endinject */\n.after { color: red; }\n";

    fn setup(temp: &TempDir) -> BuildContext {
        let css = temp.path().join("src/css");
        fs::create_dir_all(css.join("generated")).unwrap();
        fs::write(css.join("site.css"), ROOT_TEMPLATE).unwrap();
        BuildContext::new(default_config(), temp.path().to_path_buf())
    }

    #[test]
    fn test_injects_partials_in_scan_order() {
        let temp = TempDir::new().unwrap();
        let ctx = setup(&temp);
        let css = temp.path().join("src/css");
        fs::write(css.join("b.css"), "").unwrap();
        fs::write(css.join("a.css"), "").unwrap();

        let report = inject_imports(&ctx).unwrap();
        assert_eq!(report.partials, 2);
        assert!(report.changed);

        let out = fs::read_to_string(css.join("site.css")).unwrap();
        let a = out.find("@import \"a.css\";").unwrap();
        let b = out.find("@import \"b.css\";").unwrap();
        assert!(a < b, "scan order must be preserved: {}", out);
        // Content outside the markers is untouched
        assert!(out.starts_with("body { margin: 0; }\n"));
        assert!(out.ends_with(".after { color: red; }\n"));
    }

    #[test]
    fn test_idempotent_across_reruns() {
        let temp = TempDir::new().unwrap();
        let ctx = setup(&temp);
        let css = temp.path().join("src/css");
        fs::write(css.join("a.css"), "").unwrap();
        fs::create_dir_all(css.join("partials")).unwrap();
        fs::write(css.join("partials/deep.css"), "").unwrap();

        inject_imports(&ctx).unwrap();
        let first = fs::read_to_string(css.join("site.css")).unwrap();

        let report = inject_imports(&ctx).unwrap();
        let second = fs::read_to_string(css.join("site.css")).unwrap();
        assert_eq!(first, second);
        assert!(!report.changed);
    }

    #[test]
    fn test_generated_partials_come_last_and_once() {
        let temp = TempDir::new().unwrap();
        let ctx = setup(&temp);
        let css = temp.path().join("src/css");
        fs::write(css.join("z.css"), "").unwrap();
        fs::write(css.join("generated/_sprite.css"), "").unwrap();

        inject_imports(&ctx).unwrap();
        let out = fs::read_to_string(css.join("site.css")).unwrap();
        assert_eq!(out.matches("generated/_sprite.css").count(), 1);
        let z = out.find("@import \"z.css\";").unwrap();
        let gen = out.find("@import \"generated/_sprite.css\";").unwrap();
        assert!(z < gen);
    }

    #[test]
    fn test_root_file_excluded_from_scan() {
        let temp = TempDir::new().unwrap();
        let ctx = setup(&temp);

        inject_imports(&ctx).unwrap();
        let out = fs::read_to_string(temp.path().join("src/css/site.css")).unwrap();
        assert!(!out.contains("@import \"site.css\""));
    }

    #[test]
    fn test_missing_markers_error() {
        let temp = TempDir::new().unwrap();
        let ctx = setup(&temp);
        fs::write(temp.path().join("src/css/site.css"), "body{}").unwrap();

        let result = inject_imports(&ctx);
        assert!(matches!(result, Err(InjectError::MissingMarker { .. })));
    }

    #[test]
    fn test_empty_directory_clears_block() {
        let temp = TempDir::new().unwrap();
        let ctx = setup(&temp);
        fs::write(
            temp.path().join("src/css/site.css"),
            "/* inject:imports */\n@import \"stale.css\";\n/* endinject */\n",
        )
        .unwrap();

        let report = inject_imports(&ctx).unwrap();
        assert_eq!(report.partials, 0);
        let out = fs::read_to_string(temp.path().join("src/css/site.css")).unwrap();
        assert!(!out.contains("stale.css"));
        assert!(out.contains(START_MARKER));
        assert!(out.contains(END_MARKER));
    }
}
