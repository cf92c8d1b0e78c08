//! Siteforge - static site asset build pipeline
//!
//! This library provides functionality to:
//! - Compile a root stylesheet (with injected `@import` aggregation) to staged CSS
//! - Pack individual images into a sprite sheet plus a generated stylesheet partial
//! - Concatenate annotated asset bundles, minify, hash-rename and rewrite references
//! - Serve the site during development with live reload on file changes

pub mod build;
pub mod bundles;
pub mod cli;
pub mod config;
pub mod rev;
pub mod server;
pub mod stages;
pub mod watch;
