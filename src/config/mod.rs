//! Configuration for `siteforge.toml`
//!
//! The `[paths]` table is the registry mapping logical asset roles (root
//! stylesheet, markup glob, sprite sources, favicon master) to filesystem
//! locations. It is loaded once at startup and handed to each stage; there
//! is no ambient global lookup.

pub mod loader;
pub mod schema;

pub use loader::{find_config, load_config, ConfigError};
pub use schema::{
    default_config, FaviconConfig, PathsConfig, ProjectConfig, ServerConfig, SiteConfig,
    SpriteConfig, WatchConfig,
};
