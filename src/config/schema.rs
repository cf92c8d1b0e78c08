//! Configuration schema types for `siteforge.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required)
    pub name: String,
    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Path registry: logical asset roles mapped to filesystem locations.
///
/// All paths are relative to the project root unless absolute. Misconfigured
/// entries are not validated here; they surface as empty-match or
/// missing-file failures in the stage that consumes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Source tree root
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Staging directory for intermediate artifacts (never shipped)
    #[serde(default = "default_staging")]
    pub staging: PathBuf,
    /// Distribution directory for the final build
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
    /// Root stylesheet aggregating all partials
    #[serde(default = "default_root_stylesheet")]
    pub root_stylesheet: PathBuf,
    /// Directory scanned for stylesheet partials
    #[serde(default = "default_stylesheet_dir")]
    pub stylesheet_dir: PathBuf,
    /// Directory reserved for generated stylesheet partials (sprite rules)
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,
    /// Glob for markup files, relative to the source root
    #[serde(default = "default_markup_glob")]
    pub markup_glob: String,
    /// Directory of individual images to pack into the sprite sheet
    #[serde(default = "default_sprite_dir")]
    pub sprite_dir: PathBuf,
    /// Master favicon image
    #[serde(default = "default_favicon_master")]
    pub favicon_master: PathBuf,
    /// Favicon bundle directory, relative to the dist root
    #[serde(default = "default_favicon_dir")]
    pub favicon_dir: String,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_staging() -> PathBuf {
    PathBuf::from(".tmp")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

fn default_root_stylesheet() -> PathBuf {
    PathBuf::from("src/css/site.css")
}

fn default_stylesheet_dir() -> PathBuf {
    PathBuf::from("src/css")
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("src/css/generated")
}

fn default_markup_glob() -> String {
    "**/*.html".to_string()
}

fn default_sprite_dir() -> PathBuf {
    PathBuf::from("src/img/sprite")
}

fn default_favicon_master() -> PathBuf {
    PathBuf::from("src/favicon.png")
}

fn default_favicon_dir() -> String {
    "favicon".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            staging: default_staging(),
            dist: default_dist(),
            root_stylesheet: default_root_stylesheet(),
            stylesheet_dir: default_stylesheet_dir(),
            generated_dir: default_generated_dir(),
            markup_glob: default_markup_glob(),
            sprite_dir: default_sprite_dir(),
            favicon_master: default_favicon_master(),
            favicon_dir: default_favicon_dir(),
        }
    }
}

/// Sprite sheet packing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteConfig {
    /// Padding between packed images in pixels
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// File name of the packed sheet inside `<staging>/img/`
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// Public URL path the generated CSS rules point at
    #[serde(default = "default_sheet_public_path")]
    pub public_path: String,
    /// Prefix for generated CSS class names
    #[serde(default = "default_class_prefix")]
    pub class_prefix: String,
}

fn default_padding() -> u32 {
    2
}

fn default_sheet_name() -> String {
    "sprite.png".to_string()
}

fn default_sheet_public_path() -> String {
    "/img/sprite.png".to_string()
}

fn default_class_prefix() -> String {
    "sprite-".to_string()
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            sheet_name: default_sheet_name(),
            public_path: default_sheet_public_path(),
            class_prefix: default_class_prefix(),
        }
    }
}

/// Favicon bundle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaviconConfig {
    /// Tile background color for Windows pinned sites
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// Theme color declared in the web manifest
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
}

fn default_background_color() -> String {
    "#da532c".to_string()
}

fn default_theme_color() -> String {
    "#ffffff".to_string()
}

impl Default for FaviconConfig {
    fn default() -> Self {
        Self {
            background_color: default_background_color(),
            theme_color: default_theme_color(),
        }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

/// Watch mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for coalescing change events, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

/// Complete siteforge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Project metadata
    pub project: ProjectConfig,
    /// Path registry
    #[serde(default)]
    pub paths: PathsConfig,
    /// Sprite packing settings
    #[serde(default)]
    pub sprite: SpriteConfig,
    /// Favicon settings
    #[serde(default)]
    pub favicon: FaviconConfig,
    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl SiteConfig {
    /// Validate cross-field constraints.
    ///
    /// Returns a list of human-readable problems; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.project.name.is_empty() {
            problems.push("project.name must not be empty".to_string());
        }
        if !self.paths.root_stylesheet.starts_with(&self.paths.stylesheet_dir) {
            problems.push(format!(
                "paths.root_stylesheet ({}) must live under paths.stylesheet_dir ({})",
                self.paths.root_stylesheet.display(),
                self.paths.stylesheet_dir.display()
            ));
        }
        if self.paths.staging == self.paths.dist {
            problems.push("paths.staging and paths.dist must differ".to_string());
        }
        problems
    }
}

/// Build a configuration with all defaults and a placeholder project name.
pub fn default_config() -> SiteConfig {
    SiteConfig {
        project: ProjectConfig { name: "site".to_string(), version: default_version() },
        paths: PathsConfig::default(),
        sprite: SpriteConfig::default(),
        favicon: FaviconConfig::default(),
        server: ServerConfig::default(),
        watch: WatchConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = default_config();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_paths_defaults() {
        let paths = PathsConfig::default();
        assert_eq!(paths.src, PathBuf::from("src"));
        assert_eq!(paths.staging, PathBuf::from(".tmp"));
        assert_eq!(paths.dist, PathBuf::from("dist"));
        assert_eq!(paths.root_stylesheet, PathBuf::from("src/css/site.css"));
        assert_eq!(paths.markup_glob, "**/*.html");
    }

    #[test]
    fn test_validate_rejects_shared_staging_dist() {
        let mut config = default_config();
        config.paths.dist = PathBuf::from(".tmp");
        let problems = config.validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("must differ"));
    }

    #[test]
    fn test_validate_rejects_root_outside_stylesheet_dir() {
        let mut config = default_config();
        config.paths.root_stylesheet = PathBuf::from("src/site.css");
        assert!(!config.validate().is_empty());
    }

    #[test]
    fn test_minimal_toml_parses_with_defaults() {
        let toml_src = "[project]\nname = \"demo\"\n";
        let config: SiteConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.sprite.padding, 2);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.watch.debounce_ms, 200);
    }
}
