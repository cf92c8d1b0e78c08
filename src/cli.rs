//! Command-line interface implementation

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::build::{BuildContext, BuildPipeline};
use crate::config::{load_config, SiteConfig};
use crate::server::DevServer;
use crate::stages::clean;
use crate::watch;

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// siteforge - static site asset pipeline
#[derive(Parser)]
#[command(name = "siteforge")]
#[command(about = "Static site asset pipeline: sprites, stylesheets, cache-busting, live reload")]
#[command(version)]
pub struct Cli {
    /// Path to siteforge.toml (defaults to searching upward from the cwd)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full build into the dist directory
    Build {
        /// Print the stage plan and per-stage timings
        #[arg(short, long)]
        verbose: bool,
    },
    /// Build into staging, serve it, and rebuild on changes
    Dev {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,

        /// Print the stage plan and per-stage timings
        #[arg(short, long)]
        verbose: bool,
    },
    /// Statically serve the dist directory
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Remove the staging and dist directories
    Clean,
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let (config, project_root) = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    match cli.command {
        Commands::Build { verbose } => run_build(config, project_root, verbose),
        Commands::Dev { port, verbose } => run_dev(config, project_root, port, verbose),
        Commands::Serve { port } => run_serve(config, project_root, port),
        Commands::Clean => run_clean(config, project_root),
    }
}

/// Execute the build command
fn run_build(config: SiteConfig, project_root: PathBuf, verbose: bool) -> ExitCode {
    let ctx = BuildContext::new(config, project_root).with_verbose(verbose);
    let pipeline = BuildPipeline::new(ctx);

    match pipeline.build() {
        Ok(report) => {
            println!(
                "Build finished: {} stages in {:.2}s",
                report.outcomes.len(),
                report.total_duration.as_secs_f64()
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Execute the dev command: seed staging, serve it with the source tree as
/// fallback, and rebuild on changes.
fn run_dev(
    mut config: SiteConfig,
    project_root: PathBuf,
    port: Option<u16>,
    verbose: bool,
) -> ExitCode {
    if let Some(port) = port {
        config.server.port = port;
    }
    init_tracing();

    let ctx = BuildContext::new(config, project_root).with_verbose(verbose);
    let pipeline = BuildPipeline::new(ctx.clone());
    if let Err(e) = pipeline.run_plan(&BuildPipeline::staging_plan()) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    let roots = vec![ctx.staging_dir(), ctx.src_dir()];
    let server = DevServer::new(roots, ctx.config().server.port);
    let reload_tx = server.reload_handle();

    let watch_ctx = ctx.clone();
    std::thread::spawn(move || {
        if let Err(e) = watch::watch_and_rebuild(&watch_ctx, reload_tx) {
            eprintln!("Error: {}", e);
        }
    });

    serve_blocking(server)
}

/// Execute the serve command over the published dist tree.
fn run_serve(mut config: SiteConfig, project_root: PathBuf, port: Option<u16>) -> ExitCode {
    if let Some(port) = port {
        config.server.port = port;
    }
    init_tracing();

    let ctx = BuildContext::new(config, project_root);
    let server = DevServer::new(vec![ctx.dist_dir()], ctx.config().server.port);
    serve_blocking(server)
}

/// Execute the clean command
fn run_clean(config: SiteConfig, project_root: PathBuf) -> ExitCode {
    let ctx = BuildContext::new(config, project_root);
    match clean::clean_all(&ctx) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Drive a server on a fresh runtime until ctrl-c.
fn serve_blocking(server: DevServer) -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    match runtime.block_on(server.serve(shutdown)) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .try_init();
}
