//! Clean stage - removes staging and distribution directories.

use crate::build::BuildContext;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Error during cleaning
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CleanError {
    /// Failed to remove a directory
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Remove a directory tree, succeeding when it was already absent.
fn remove_dir_if_present(path: &Path) -> Result<(), CleanError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CleanError::Remove { path: path.display().to_string(), source }),
    }
}

/// The `clean` command: remove both staging and dist.
pub fn clean_all(ctx: &BuildContext) -> Result<(), CleanError> {
    remove_dir_if_present(&ctx.staging_dir())?;
    remove_dir_if_present(&ctx.dist_dir())?;
    Ok(())
}

/// The clean stage inside `build`: remove staging work areas only.
///
/// Dist is left alone here; it is replaced wholesale by the publish step
/// once every transform stage has succeeded, so a failed build never
/// disturbs the previously shipped tree.
pub fn clean_staging(ctx: &BuildContext) -> Result<(), CleanError> {
    remove_dir_if_present(&ctx.staging_dir())
}
