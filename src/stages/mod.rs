//! Individual build stages.
//!
//! Each stage is an effectful function taking the build context (and where
//! relevant a collection of asset records) and returning a `Result`; the
//! orchestrator in [`crate::build`] sequences them. There is no callback
//! chaining: data flows through ordinary return values.

pub mod assets;
pub mod clean;
pub mod favicon;
pub mod inject;
pub mod sprite;
pub mod stylesheet;
