//! Build context containing configuration and resolved paths for a build.

use crate::config::SiteConfig;
use std::path::{Path, PathBuf};

/// Build context handed to every stage.
///
/// Wraps the loaded configuration and the project root, and resolves the
/// path registry entries to absolute paths. Constructed once per command and
/// passed by reference; stages never consult globals.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: SiteConfig,
    /// Project root directory (where siteforge.toml is located)
    project_root: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: SiteConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Source tree root.
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.src)
    }

    /// Staging directory for intermediate artifacts.
    pub fn staging_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.staging)
    }

    /// Distribution directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.dist)
    }

    /// Root stylesheet file.
    pub fn root_stylesheet(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.root_stylesheet)
    }

    /// Directory scanned for stylesheet partials.
    pub fn stylesheet_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.stylesheet_dir)
    }

    /// Directory for generated stylesheet partials.
    pub fn generated_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.generated_dir)
    }

    /// Sprite source directory.
    pub fn sprite_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.sprite_dir)
    }

    /// Master favicon image.
    pub fn favicon_master(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.favicon_master)
    }

    /// Favicon bundle directory inside dist.
    pub fn favicon_dir(&self) -> PathBuf {
        self.dist_dir().join(&self.config.paths.favicon_dir)
    }

    /// Staged location of the compiled root stylesheet.
    pub fn staged_stylesheet(&self) -> PathBuf {
        self.staging_dir().join("css/site.css")
    }

    /// Staged location of the packed sprite sheet.
    pub fn staged_sprite_sheet(&self) -> PathBuf {
        self.staging_dir().join("img").join(&self.config.sprite.sheet_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    #[test]
    fn test_resolve_relative_path() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/proj"));
        assert_eq!(ctx.src_dir(), PathBuf::from("/proj/src"));
        assert_eq!(ctx.staging_dir(), PathBuf::from("/proj/.tmp"));
        assert_eq!(ctx.dist_dir(), PathBuf::from("/proj/dist"));
    }

    #[test]
    fn test_resolve_absolute_path_unchanged() {
        let mut config = default_config();
        config.paths.dist = PathBuf::from("/abs/dist");
        let ctx = BuildContext::new(config, PathBuf::from("/proj"));
        assert_eq!(ctx.dist_dir(), PathBuf::from("/abs/dist"));
    }

    #[test]
    fn test_staged_artifact_paths() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/proj"));
        assert_eq!(ctx.staged_stylesheet(), PathBuf::from("/proj/.tmp/css/site.css"));
        assert_eq!(ctx.staged_sprite_sheet(), PathBuf::from("/proj/.tmp/img/sprite.png"));
    }

    #[test]
    fn test_verbose_builder() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/proj"));
        assert!(!ctx.is_verbose());
        let ctx = ctx.with_verbose(true);
        assert!(ctx.is_verbose());
    }
}
