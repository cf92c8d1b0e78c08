//! Stage definitions for the build DAG.
//!
//! A stage is one discrete transform step (clean, sprite packing, stylesheet
//! compilation, the asset pipeline, ...). Stages declare dependencies by id;
//! the plan produces a topological execution order and rejects cycles.

use std::fmt;

/// Kind of build stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Remove staging work areas
    Clean,
    /// Pack sprite sources into a sheet plus a generated partial
    Sprite,
    /// Rewrite the root stylesheet's import aggregation block
    Inject,
    /// Compile the root stylesheet into staged CSS
    Stylesheet,
    /// Markup/asset pipeline: bundles, minify, hash-rename, rewrite, publish
    Assets,
    /// Generate the favicon bundle and inject markup into built HTML
    Favicon,
    /// Copy literal pass-through files into dist
    CopyStatic,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Clean => write!(f, "clean"),
            StageKind::Sprite => write!(f, "sprite"),
            StageKind::Inject => write!(f, "inject"),
            StageKind::Stylesheet => write!(f, "stylesheet"),
            StageKind::Assets => write!(f, "assets"),
            StageKind::Favicon => write!(f, "favicon"),
            StageKind::CopyStatic => write!(f, "copy"),
        }
    }
}

/// A stage node in the build plan.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Unique identifier (the display name of the kind)
    pub id: String,
    /// What the stage does
    pub kind: StageKind,
    /// Ids of stages that must complete first
    pub dependencies: Vec<String>,
}

impl Stage {
    /// Create a stage with no dependencies.
    pub fn new(kind: StageKind) -> Self {
        Self { id: kind.to_string(), kind, dependencies: vec![] }
    }

    /// Add a dependency on another stage.
    pub fn after(mut self, dep: StageKind) -> Self {
        self.dependencies.push(dep.to_string());
        self
    }
}

/// Error during execution order calculation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StageOrderError {
    /// Circular dependency detected
    #[error("Circular dependency detected involving stage '{0}'")]
    CyclicDependency(String),
    /// A dependency names a stage not present in the plan
    #[error("Stage '{0}' depends on unknown stage '{1}'")]
    UnknownDependency(String, String),
}

/// An ordered collection of stages with dependency information.
#[derive(Debug, Default)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self { stages: vec![] }
    }

    /// Add a stage to the plan.
    pub fn add(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// All stages, in insertion order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages in the plan.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages in execution order: dependencies before dependents.
    pub fn execution_order(&self) -> Result<Vec<&Stage>, StageOrderError> {
        let mut result = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut visiting = std::collections::HashSet::new();

        for stage in &self.stages {
            self.visit(stage, &mut visited, &mut visiting, &mut result)?;
        }

        Ok(result)
    }

    fn visit<'a>(
        &'a self,
        stage: &'a Stage,
        visited: &mut std::collections::HashSet<String>,
        visiting: &mut std::collections::HashSet<String>,
        result: &mut Vec<&'a Stage>,
    ) -> Result<(), StageOrderError> {
        if visited.contains(&stage.id) {
            return Ok(());
        }
        if visiting.contains(&stage.id) {
            return Err(StageOrderError::CyclicDependency(stage.id.clone()));
        }

        visiting.insert(stage.id.clone());

        for dep_id in &stage.dependencies {
            match self.stages.iter().find(|s| &s.id == dep_id) {
                Some(dep) => self.visit(dep, visited, visiting, result)?,
                None => {
                    return Err(StageOrderError::UnknownDependency(
                        stage.id.clone(),
                        dep_id.clone(),
                    ))
                }
            }
        }

        visiting.remove(&stage.id);
        visited.insert(stage.id.clone());
        result.push(stage);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Clean.to_string(), "clean");
        assert_eq!(StageKind::Sprite.to_string(), "sprite");
        assert_eq!(StageKind::Stylesheet.to_string(), "stylesheet");
        assert_eq!(StageKind::CopyStatic.to_string(), "copy");
    }

    #[test]
    fn test_execution_order_respects_dependencies() {
        let mut plan = StagePlan::new();
        plan.add(Stage::new(StageKind::Stylesheet).after(StageKind::Inject));
        plan.add(Stage::new(StageKind::Inject).after(StageKind::Sprite));
        plan.add(Stage::new(StageKind::Sprite));

        let order = plan.execution_order().unwrap();
        let ids: Vec<&str> = order.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["sprite", "inject", "stylesheet"]);
    }

    #[test]
    fn test_execution_order_detects_cycle() {
        let mut plan = StagePlan::new();
        plan.add(Stage::new(StageKind::Sprite).after(StageKind::Stylesheet));
        plan.add(Stage::new(StageKind::Stylesheet).after(StageKind::Sprite));

        let result = plan.execution_order();
        assert!(matches!(result, Err(StageOrderError::CyclicDependency(_))));
    }

    #[test]
    fn test_execution_order_unknown_dependency() {
        let mut plan = StagePlan::new();
        plan.add(Stage::new(StageKind::Stylesheet).after(StageKind::Sprite));

        let result = plan.execution_order();
        assert!(matches!(result, Err(StageOrderError::UnknownDependency(_, _))));
    }

    #[test]
    fn test_independent_stages_keep_insertion_order() {
        let mut plan = StagePlan::new();
        plan.add(Stage::new(StageKind::Favicon));
        plan.add(Stage::new(StageKind::CopyStatic));

        let order = plan.execution_order().unwrap();
        let ids: Vec<&str> = order.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["favicon", "copy"]);
    }
}
