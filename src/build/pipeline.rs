//! Build pipeline orchestration.
//!
//! The pipeline owns the fixed stage DAG for a full build and executes it in
//! topological order. A stage failure halts everything downstream; the
//! previous dist tree survives because publish is the only step that touches
//! it.

use crate::build::{BuildContext, Stage, StageKind, StageOrderError, StagePlan};
use crate::stages::assets::AssetError;
use crate::stages::clean::CleanError;
use crate::stages::favicon::FaviconError;
use crate::stages::inject::InjectError;
use crate::stages::sprite::SpriteError;
use crate::stages::stylesheet::StylesheetError;
use crate::stages::{assets, clean, favicon, inject, sprite, stylesheet};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error during build execution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Stage ordering error (cycle or unknown dependency)
    #[error("Build order error: {0}")]
    Order(#[from] StageOrderError),
    /// Clean stage error
    #[error("Clean failed: {0}")]
    Clean(#[from] CleanError),
    /// Sprite stage error
    #[error("Sprite build failed: {0}")]
    Sprite(#[from] SpriteError),
    /// Include injection error
    #[error("Include injection failed: {0}")]
    Inject(#[from] InjectError),
    /// Stylesheet compilation error
    #[error("Stylesheet compilation failed: {0}")]
    Stylesheet(#[from] StylesheetError),
    /// Asset pipeline error
    #[error("Asset pipeline failed: {0}")]
    Assets(#[from] AssetError),
    /// Favicon stage error
    #[error("Favicon stage failed: {0}")]
    Favicon(#[from] FaviconError),
}

/// Result of one executed stage.
#[derive(Debug)]
pub struct StageOutcome {
    /// Stage id
    pub id: String,
    /// How long the stage took
    pub duration: Duration,
}

/// Result of a pipeline run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Per-stage outcomes in execution order
    pub outcomes: Vec<StageOutcome>,
    /// Total wall-clock duration
    pub total_duration: Duration,
}

/// Build pipeline for executing the stage DAG.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// The stage DAG for a full build.
    ///
    /// Favicon and static copy both run over the published tree and are
    /// mutually unordered.
    pub fn full_plan() -> StagePlan {
        let mut plan = StagePlan::new();
        plan.add(Stage::new(StageKind::Clean));
        plan.add(Stage::new(StageKind::Sprite).after(StageKind::Clean));
        plan.add(Stage::new(StageKind::Inject).after(StageKind::Sprite));
        plan.add(Stage::new(StageKind::Stylesheet).after(StageKind::Inject));
        plan.add(Stage::new(StageKind::Assets).after(StageKind::Stylesheet));
        plan.add(Stage::new(StageKind::Favicon).after(StageKind::Assets));
        plan.add(Stage::new(StageKind::CopyStatic).after(StageKind::Assets));
        plan
    }

    /// The staging-only DAG used to seed dev mode: sprite, inject,
    /// stylesheet. Nothing is published.
    pub fn staging_plan() -> StagePlan {
        let mut plan = StagePlan::new();
        plan.add(Stage::new(StageKind::Sprite));
        plan.add(Stage::new(StageKind::Inject).after(StageKind::Sprite));
        plan.add(Stage::new(StageKind::Stylesheet).after(StageKind::Inject));
        plan
    }

    /// Run the full build plan.
    pub fn build(&self) -> Result<BuildReport, PipelineError> {
        self.run_plan(&Self::full_plan())
    }

    /// Run a pre-created plan.
    pub fn run_plan(&self, plan: &StagePlan) -> Result<BuildReport, PipelineError> {
        let start = Instant::now();
        let ordered = plan.execution_order()?;

        if self.context.is_verbose() {
            println!("Build plan: {} stages", ordered.len());
            for stage in &ordered {
                println!("  - {}", stage.id);
            }
        }

        let mut report = BuildReport::default();
        for stage in ordered {
            if self.context.is_verbose() {
                println!("Running: {} ...", stage.id);
            }
            let stage_start = Instant::now();
            self.execute(stage.kind)?;
            let duration = stage_start.elapsed();
            if self.context.is_verbose() {
                println!("  Done in {:?}", duration);
            }
            report.outcomes.push(StageOutcome { id: stage.id.clone(), duration });
        }

        report.total_duration = start.elapsed();
        Ok(report)
    }

    /// Execute a single stage.
    fn execute(&self, kind: StageKind) -> Result<(), PipelineError> {
        match kind {
            StageKind::Clean => clean::clean_staging(&self.context)?,
            StageKind::Sprite => {
                sprite::build_sprite(&self.context)?;
            }
            StageKind::Inject => {
                inject::inject_imports(&self.context)?;
            }
            StageKind::Stylesheet => {
                stylesheet::compile_stylesheet(&self.context)?;
            }
            StageKind::Assets => {
                assets::run(&self.context)?;
            }
            StageKind::Favicon => {
                favicon::generate_favicons(&self.context)?;
                favicon::inject_markup(&self.context)?;
            }
            StageKind::CopyStatic => {
                assets::copy_static(&self.context)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn png(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 255])).save(path).unwrap();
    }

    fn seed_project(root: &Path) {
        write(
            root,
            "src/index.html",
            concat!(
                "<html><head>\n",
                "<!-- build:css /css/site.css -->\n",
                "<link rel=\"stylesheet\" href=\"/css/site.css\">\n",
                "<!-- endbuild -->\n",
                "</head><body></body></html>"
            )
            .as_bytes(),
        );
        write(
            root,
            "src/css/site.css",
            b"/* inject:imports */\n/* endinject */\nbody { color: red; }\n",
        );
        png(root, "src/favicon.png");
        png(root, "src/img/sprite/icon.png");
        write(root, "src/robots.txt", b"User-agent: *\n");
    }

    #[test]
    fn test_full_plan_orders_stages() {
        let plan = BuildPipeline::full_plan();
        let order = plan.execution_order().unwrap();
        let ids: Vec<&str> = order.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["clean", "sprite", "inject", "stylesheet", "assets", "favicon", "copy"]
        );
    }

    #[test]
    fn test_full_build_produces_dist() {
        let temp = TempDir::new().unwrap();
        seed_project(temp.path());
        let pipeline =
            BuildPipeline::new(BuildContext::new(default_config(), temp.path().to_path_buf()));

        let report = pipeline.build().unwrap();
        assert_eq!(report.outcomes.len(), 7);

        let dist = temp.path().join("dist");
        let html = fs::read_to_string(dist.join("index.html")).unwrap();
        // Bundle collapsed and revved
        assert!(!html.contains("build:css"));
        assert!(!html.contains("\"/css/site.css\""));
        // Favicon markup injected before </head>
        assert!(html.find("apple-touch-icon").unwrap() < html.find("</head>").unwrap());

        assert!(dist.join("rev-manifest.json").is_file());
        assert!(dist.join("robots.txt").is_file());
        assert!(dist.join("favicon/site.webmanifest").is_file());
        // Sprite rules made it into the compiled bundle
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dist.join("rev-manifest.json")).unwrap())
                .unwrap();
        let css_rel = manifest["css/site.css"].as_str().unwrap();
        let css = fs::read_to_string(dist.join(css_rel)).unwrap();
        assert!(css.contains(".sprite-icon"));
    }

    #[test]
    fn test_broken_stylesheet_keeps_previous_dist() {
        let temp = TempDir::new().unwrap();
        seed_project(temp.path());
        let pipeline =
            BuildPipeline::new(BuildContext::new(default_config(), temp.path().to_path_buf()));
        pipeline.build().unwrap();

        let manifest: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(temp.path().join("dist/rev-manifest.json")).unwrap(),
        )
        .unwrap();
        let css_rel = manifest["css/site.css"].as_str().unwrap().to_string();

        // Break the stylesheet and rebuild
        write(
            temp.path(),
            "src/css/site.css",
            b"/* inject:imports */\n/* endinject */\n@import \"missing.css\";\n",
        );
        let result = pipeline.build();
        assert!(matches!(result, Err(PipelineError::Stylesheet(_))));

        // Previous published CSS is still there
        assert!(temp.path().join("dist").join(&css_rel).is_file());
    }

    #[test]
    fn test_staging_plan_publishes_nothing() {
        let temp = TempDir::new().unwrap();
        seed_project(temp.path());
        let pipeline =
            BuildPipeline::new(BuildContext::new(default_config(), temp.path().to_path_buf()));

        pipeline.run_plan(&BuildPipeline::staging_plan()).unwrap();
        assert!(temp.path().join(".tmp/css/site.css").is_file());
        assert!(!temp.path().join("dist").exists());
    }

    #[test]
    fn test_build_is_deterministic() {
        let temp = TempDir::new().unwrap();
        seed_project(temp.path());
        let pipeline =
            BuildPipeline::new(BuildContext::new(default_config(), temp.path().to_path_buf()));

        pipeline.build().unwrap();
        let first = fs::read_to_string(temp.path().join("dist/rev-manifest.json")).unwrap();
        pipeline.build().unwrap();
        let second = fs::read_to_string(temp.path().join("dist/rev-manifest.json")).unwrap();
        assert_eq!(first, second);
    }
}
