//! Build orchestration for siteforge
//!
//! The orchestrator owns a fixed DAG of stages for a full `build`:
//! clean, sprite packing, include injection, stylesheet compilation, the
//! markup/asset pipeline, then favicon generation/injection and static copy
//! over the published tree. Stages are executed in topological order; a
//! stage failure halts everything downstream.

pub mod context;
pub mod pipeline;
pub mod stage;

pub use context::*;
pub use pipeline::*;
pub use stage::*;
