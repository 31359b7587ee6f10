//! Quorum - multi-model consensus CLI
//!
//! The `quorum` command sends content to several worker models, has a
//! judge model adjudicate their answers, and reports how much the workers
//! agreed.
//!
//! ## Commands
//!
//! - `run`: one consensus request from a JSON file
//! - `batch`: one request template over a JSONL file of rows
//! - `runs list` / `runs show`: inspect recorded runs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use quorum_core::batch::run_metadata;
use quorum_core::config::CONFIG_ENV;
use quorum_core::metrics::METRICS;
use quorum_core::obs;
use quorum_core::telemetry::{default_level, init_tracing};
use quorum_core::{
    run_batch, ConsensusRequest, HttpEndpointFactory, Orchestrator, QuorumConfig, RunRecorder,
};
use run_store::{
    RowResult, RunId, RunRecord, RunStore, RunSummary, SurrealRunStore, SURREALDB_URL_ENV,
};

#[derive(Parser)]
#[command(name = "quorum")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-model consensus with judge synthesis and agreement analytics", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to a TOML config file
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one consensus request and print the result as JSON
    Run {
        /// Consensus request (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Record the run into this store (mem://, surrealkv://path, ws://host:port)
        #[arg(long, env = SURREALDB_URL_ENV)]
        store: Option<String>,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// Run a request template over every row of a JSONL file
    Batch {
        /// Request template (JSON); its content field is replaced per row
        #[arg(short, long)]
        request: PathBuf,

        /// Rows, one per line: {"content": "..."} or a JSON string
        #[arg(long)]
        rows: PathBuf,

        /// Rows processed at once (default from config)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Record the run into this store
        #[arg(long, env = SURREALDB_URL_ENV)]
        store: Option<String>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// Inspect recorded runs
    Runs {
        #[command(subcommand)]
        command: RunsCommand,
    },
}

#[derive(Subcommand)]
enum RunsCommand {
    /// List runs, newest first
    List {
        #[arg(long, env = SURREALDB_URL_ENV)]
        store: Option<String>,
    },

    /// Show one run and its row results
    Show {
        run_id: String,

        #[arg(long, env = SURREALDB_URL_ENV)]
        store: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.json, default_level(cli.verbose));

    let config = QuorumConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    let outcome = match cli.command {
        Commands::Run {
            request,
            store,
            pretty,
        } => cmd_run(&config, &request, store, pretty).await,
        Commands::Batch {
            request,
            rows,
            concurrency,
            store,
            pretty,
        } => cmd_batch(&config, &request, &rows, concurrency, store, pretty).await,
        Commands::Runs { command } => match command {
            RunsCommand::List { store } => cmd_runs_list(&config, store).await,
            RunsCommand::Show { run_id, store } => cmd_runs_show(&config, &run_id, store).await,
        },
    };

    METRICS.flush();
    outcome
}

/// `--store` (or `QUORUM_SURREALDB_URL`) wins; otherwise a non-default
/// configured store.
fn recording_store_url(flag: Option<String>, config: &QuorumConfig) -> Option<String> {
    flag.or_else(|| {
        let url = config.store.url.trim();
        (url != "mem://" && !url.is_empty()).then(|| url.to_string())
    })
}

/// Store holding runs to inspect. A fresh `mem://` database is always
/// empty, so it is refused.
fn inspect_store_url(flag: Option<String>, config: &QuorumConfig) -> Result<String> {
    let url = flag.unwrap_or_else(|| config.store.url.clone());
    if url.trim() == "mem://" || url.trim().is_empty() {
        bail!(
            "runs are not persisted in mem://; pass --store surrealkv://<path> or ws://host:port, \
             set {}, or set [store] url in the config",
            SURREALDB_URL_ENV
        );
    }
    Ok(url)
}

async fn open_store(url: &str) -> Result<Arc<dyn RunStore>> {
    let store = SurrealRunStore::connect(url)
        .await
        .with_context(|| format!("Failed to open run store at {}", url))?;
    Ok(Arc::new(store))
}

fn orchestrator(config: &QuorumConfig) -> Result<Orchestrator> {
    let factory = HttpEndpointFactory::new(config.request_timeout())
        .context("Failed to build HTTP client")?;
    Ok(Orchestrator::new(Arc::new(factory)).with_settings(config.consensus_settings()))
}

fn read_request(path: &Path) -> Result<ConsensusRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid consensus request in {}", path.display()))
}

/// Parse JSONL rows; blank lines are skipped.
fn parse_rows(raw: &str) -> Result<Vec<String>> {
    let mut rows = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("line {}: invalid JSON", line_no + 1))?;
        match value {
            Value::String(content) => rows.push(content),
            Value::Object(ref obj) => match obj.get("content").and_then(Value::as_str) {
                Some(content) => rows.push(content.to_string()),
                None => bail!("line {}: object has no string \"content\" field", line_no + 1),
            },
            _ => bail!(
                "line {}: expected {{\"content\": ...}} or a JSON string",
                line_no + 1
            ),
        }
    }
    Ok(rows)
}

fn file_label(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

async fn cmd_run(
    config: &QuorumConfig,
    request_path: &Path,
    store: Option<String>,
    pretty: bool,
) -> Result<()> {
    let mut request = read_request(request_path)?;
    let mut orch = orchestrator(config)?;

    let store = match recording_store_url(store, config) {
        Some(url) => {
            let store = open_store(&url).await?;
            let metadata = run_metadata(&request, "consensus", file_label(request_path), 1);
            let run_id = store.create_run(metadata).await.context("Failed to create run")?;
            info!(run_id = %run_id, "recording run");
            request.run_id = Some(run_id.clone());
            orch = orch.with_recorder(RunRecorder::new(Arc::clone(&store)));
            Some((store, run_id))
        }
        None => None,
    };

    let started = Instant::now();
    let outcome = orch.run_consensus(&request).await;

    if let Some((store, run_id)) = &store {
        finish_single_run(store.as_ref(), run_id, outcome.is_ok(), started).await;
    }

    let result = outcome.context("Consensus failed")?;
    print_json(&result, pretty)
}

/// Close a one-row run. Failure is logged and never hides the result.
async fn finish_single_run(
    store: &dyn RunStore,
    run_id: &RunId,
    succeeded: bool,
    started: Instant,
) -> bool {
    let ok = succeeded as u64;
    let summary = RunSummary {
        total_rows: 1,
        success_rows: ok,
        error_rows: 1 - ok,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    match store.finish_run(run_id, summary).await {
        Ok(()) => true,
        Err(e) => {
            obs::emit_finish_error(&run_id.0, &e);
            false
        }
    }
}

async fn cmd_batch(
    config: &QuorumConfig,
    request_path: &Path,
    rows_path: &Path,
    concurrency: Option<usize>,
    store: Option<String>,
    pretty: bool,
) -> Result<()> {
    let template = read_request(request_path)?;
    let raw = std::fs::read_to_string(rows_path)
        .with_context(|| format!("Failed to read rows file {}", rows_path.display()))?;
    let rows = parse_rows(&raw).with_context(|| format!("Invalid rows in {}", rows_path.display()))?;

    let run_store = match recording_store_url(store, config) {
        Some(url) => Some(open_store(&url).await?),
        None => None,
    };

    let mut options = config.batch_options(run_store);
    if let Some(n) = concurrency {
        options.concurrency = n;
    }
    options.input_label = file_label(rows_path);

    info!(rows = rows.len(), concurrency = options.concurrency, "starting batch");
    let report = run_batch(Arc::new(orchestrator(config)?), &template, rows, options)
        .await
        .context("Batch failed")?;

    print_json(&report, pretty)
}

async fn cmd_runs_list(config: &QuorumConfig, store: Option<String>) -> Result<()> {
    let url = inspect_store_url(store, config)?;
    let store = open_store(&url).await?;
    let runs: Vec<RunRecord> = store.list_runs().await.context("Failed to list runs")?;
    print_json(&runs, true)
}

#[derive(Serialize)]
struct RunDetails {
    run: RunRecord,
    results: Vec<RowResult>,
}

async fn cmd_runs_show(config: &QuorumConfig, run_id: &str, store: Option<String>) -> Result<()> {
    let url = inspect_store_url(store, config)?;
    let store = open_store(&url).await?;
    let run_id = RunId::from(run_id);

    let run = store
        .get_run(&run_id)
        .await
        .with_context(|| format!("Failed to load run {}", run_id))?;
    let results = store
        .get_results(&run_id)
        .await
        .with_context(|| format!("Failed to load results for run {}", run_id))?;

    print_json(&RunDetails { run, results }, true)
}
