use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use phasetrace::config::{Config, SchemaChoice};
use phasetrace::pipeline::run_pipeline;
use phasetrace::report::svg::SvgRenderer;
use phasetrace::report::{Renderer, Reporter, TableReporter};

/// Aggregates per-phase allocation traces into a summary table and chart.
#[derive(Parser)]
#[command(name = "phasetrace", about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Record layout of the phase files.
    #[arg(long, value_enum)]
    schema: Option<SchemaChoice>,

    /// Entries reported from each end of the sorted table.
    #[arg(long)]
    highlights: Option<usize>,

    /// Skip writing the SVG chart.
    #[arg(long)]
    no_render: bool,

    /// Fold phase files concurrently.
    #[arg(long)]
    parallel: bool,

    /// Directory holding one trace file per phase.
    trace_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

/// What `phasetrace version` prints and the startup log records.
struct BuildInfo {
    release: &'static str,
    commit: Option<&'static str>,
}

impl BuildInfo {
    /// Version from the manifest; commit from `GIT_COMMIT` at compile time.
    const CURRENT: Self = Self {
        release: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT"),
    };

    fn commit(&self) -> &'static str {
        self.commit.unwrap_or("unknown")
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "phasetrace {} (commit: {}, {}/{})",
            self.release,
            self.commit(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Version) = &cli.command {
        println!("{}", BuildInfo::CURRENT);
        return Ok(());
    }

    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    // Flags override the file.
    if let Some(level) = cli.log_level {
        cfg.log_level = level;
    }
    if let Some(schema) = cli.schema {
        cfg.schema = schema;
    }
    if let Some(highlights) = cli.highlights {
        cfg.highlights = highlights;
    }
    if cli.no_render {
        cfg.render.enabled = false;
    }
    if cli.parallel {
        cfg.parallel = true;
    }
    cfg.validate()?;

    let filter = EnvFilter::try_new(&cfg.log_level)
        .with_context(|| format!("invalid log level: {}", cfg.log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let trace_dir = cli
        .trace_dir
        .context("TRACE_DIR is required (use --help for usage)")?;

    tracing::info!(
        version = BuildInfo::CURRENT.release,
        commit = BuildInfo::CURRENT.commit(),
        "starting phasetrace",
    );

    run(&cfg, trace_dir)
}

fn run(cfg: &Config, trace_dir: PathBuf) -> Result<()> {
    let outcome = run_pipeline(cfg, &trace_dir)?;

    TableReporter::stdout()
        .report(&outcome.table)
        .context("writing report")?;

    if cfg.render.enabled {
        let renderer = SvgRenderer::new(&cfg.render);
        let out = trace_dir.join(&cfg.render.file_name);
        match renderer.render(&outcome.chart, &out) {
            Ok(()) => tracing::info!(
                renderer = renderer.name(),
                path = %out.display(),
                points = outcome.chart.points.len(),
                "chart written"
            ),
            Err(e) => tracing::warn!(
                renderer = renderer.name(),
                error = ?e,
                "chart rendering failed"
            ),
        }
    }

    Ok(())
}
