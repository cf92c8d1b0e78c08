//! Configuration loading and discovery for `siteforge.toml`

use super::schema::SiteConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file searched for
pub const CONFIG_FILENAME: &str = "siteforge.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse siteforge.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// No config file found
    #[error("No siteforge.toml found in {0} or any parent directory")]
    NotFound(PathBuf),
}

/// Find `siteforge.toml` by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    find_config_from(cwd)
}

/// Find `siteforge.toml` by walking up from `start`.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut dir = Some(start.as_path());
    while let Some(d) = dir {
        let candidate = d.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}

/// Load and validate a configuration.
///
/// With an explicit `path`, that file is loaded; otherwise the file is
/// discovered by walking up from the current directory. Returns the config
/// together with the project root (the directory containing the file).
pub fn load_config(path: Option<&Path>) -> Result<(SiteConfig, PathBuf), ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => find_config().ok_or_else(|| {
            ConfigError::NotFound(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        })?,
    };

    let contents = fs::read_to_string(&config_path)?;
    let config: SiteConfig = toml::from_str(&contents)?;

    let problems = config.validate();
    if !problems.is_empty() {
        return Err(ConfigError::Validation(problems));
    }

    let root = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_from_walks_up() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "[project]\nname = \"demo\"\n").unwrap();
        let nested = temp.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = find_config_from(nested).unwrap();
        assert_eq!(found, temp.path().join(CONFIG_FILENAME));
    }

    #[test]
    fn test_load_config_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[project]\nname = \"demo\"\n[server]\nport = 8080\n").unwrap();

        let (config, root) = load_config(Some(&path)).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.server.port, 8080);
        assert_eq!(root, temp.path());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        fs::write(&path, "project = nonsense").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_failure() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            "[project]\nname = \"demo\"\n[paths]\nstaging = \"out\"\ndist = \"out\"\n",
        )
        .unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
