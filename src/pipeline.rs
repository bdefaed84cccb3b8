//! End-to-end run over one trace directory: discover phases, pick the
//! schema, aggregate, and build the report and chart inputs.

use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;

use crate::aggregate::AggregateTable;
use crate::config::{Config, SchemaChoice};
use crate::report::{ChartData, ReportTable};
use crate::summary::Summary;
use crate::trace::reader::{open_phase, PhaseStats};
use crate::trace::record::{ProxyRecord, StrideRecord, TraceRecord};
use crate::trace::{discover_phases, Schema};

/// Fatal conditions at the process boundary.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("trace directory {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("listing {}", dir.display())]
    ListDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no .{extension} phase files in {}", dir.display())]
    NoPhaseFiles { dir: PathBuf, extension: String },

    #[error(
        "{phases} phase file(s) in {} yielded no valid records; \
         check the schema and tracer instrumentation",
        dir.display()
    )]
    NoRecords { dir: PathBuf, phases: usize },

    #[error("opening phase file {}", path.display())]
    PhaseRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Totals across every phase of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub phases: usize,
    pub records: usize,
    pub skipped_rows: usize,
    pub keys: usize,
}

impl RunStats {
    fn add_phase(&mut self, stats: PhaseStats) {
        self.phases += 1;
        self.records += stats.records();
        self.skipped_rows += stats.skipped;
    }

    fn merge(mut self, other: Self) -> Self {
        self.phases += other.phases;
        self.records += other.records;
        self.skipped_rows += other.skipped_rows;
        self
    }
}

/// Everything a run produces for the reporter and the renderer.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub schema: Schema,
    pub stats: RunStats,
    pub table: ReportTable,
    pub chart: ChartData,
}

/// Folds one phase file into `table` and merges its peaks.
fn ingest_file<R: TraceRecord>(
    table: &AggregateTable<R>,
    path: &Path,
) -> Result<PhaseStats, IngestError> {
    let mut records = open_phase::<R>(path).map_err(|source| IngestError::PhaseRead {
        path: path.to_path_buf(),
        source,
    })?;

    let subtotals = table.fold_phase(records.by_ref());
    let keys = subtotals.len();
    table.merge_peaks(subtotals);

    let stats = records.stats();
    tracing::debug!(
        phase = %path.display(),
        rows = stats.rows,
        skipped = stats.skipped,
        keys,
        "phase merged"
    );
    Ok(stats)
}

/// Aggregates `phases` in order, or on the rayon pool when `parallel` is set.
/// Both paths produce the same table.
pub fn aggregate_phases<R: TraceRecord>(
    phases: &[PathBuf],
    parallel: bool,
) -> Result<(AggregateTable<R>, RunStats), IngestError> {
    let table = AggregateTable::<R>::new();

    let mut stats = if parallel {
        phases
            .par_iter()
            .map(|path| {
                ingest_file(&table, path).map(|phase| {
                    let mut stats = RunStats::default();
                    stats.add_phase(phase);
                    stats
                })
            })
            .try_reduce(RunStats::default, |a, b| Ok(a.merge(b)))?
    } else {
        let mut stats = RunStats::default();
        for path in phases {
            stats.add_phase(ingest_file(&table, path)?);
        }
        stats
    };
    stats.keys = table.len();

    Ok((table, stats))
}

fn summarize<R: TraceRecord>(
    dir: &Path,
    phases: &[PathBuf],
    cfg: &Config,
) -> Result<RunOutcome, IngestError> {
    let (table, stats) = aggregate_phases::<R>(phases, cfg.parallel)?;
    if stats.records == 0 {
        return Err(IngestError::NoRecords {
            dir: dir.to_path_buf(),
            phases: stats.phases,
        });
    }

    let summary = Summary::from_table(&table);
    Ok(RunOutcome {
        schema: R::SCHEMA,
        stats,
        table: ReportTable::from_summary(&summary, cfg.highlights),
        chart: ChartData::from_summary(&summary),
    })
}

/// Resolves the configured schema choice against the phase files.
pub fn resolve_schema(choice: SchemaChoice, phases: &[PathBuf]) -> Schema {
    match choice {
        SchemaChoice::Stride => Schema::Stride,
        SchemaChoice::Proxy => Schema::Proxy,
        SchemaChoice::Auto => phases
            .first()
            .map(|path| Schema::detect(path))
            .unwrap_or(Schema::Stride),
    }
}

/// Runs the whole pipeline over `dir`.
pub fn run_pipeline(cfg: &Config, dir: &Path) -> Result<RunOutcome, IngestError> {
    let phases = discover_phases(dir, &cfg.extension)?;
    let schema = resolve_schema(cfg.schema, &phases);

    tracing::info!(
        dir = %dir.display(),
        phases = phases.len(),
        schema = schema.name(),
        parallel = cfg.parallel,
        "aggregating trace phases"
    );

    let outcome = match schema {
        Schema::Stride => summarize::<StrideRecord>(dir, &phases, cfg)?,
        Schema::Proxy => summarize::<ProxyRecord>(dir, &phases, cfg)?,
    };

    tracing::info!(
        phases = outcome.stats.phases,
        records = outcome.stats.records,
        skipped = outcome.stats.skipped_rows,
        keys = outcome.stats.keys,
        "aggregation complete"
    );

    Ok(outcome)
}
