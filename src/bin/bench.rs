//! Benchmark driver: runs CoT, no-CoT, or A2A over a local sample file.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin bench -- --samples data/gsm8k.jsonl --dataset gsm8k \
//!     --method a2a --model gpt --limit 50
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use cotvsa2a::a2a::config::{OpenRouterFactory, OrchestrationMode};
use cotvsa2a::a2a::visualizer::flow_diagram;
use cotvsa2a::bench::runner::collect_cards;
use cotvsa2a::bench::{load_samples, BenchRunner, Method, RunSettings, RunSummary};
use cotvsa2a::utilities::checkpoint::CheckpointStore;

/// Compare chain-of-thought prompting with the planner/solver A2A protocol.
#[derive(Parser, Debug)]
#[command(name = "bench", version, about)]
struct Cli {
    /// JSONL file of `{id, question, answer, context?}` records.
    #[arg(short, long)]
    samples: PathBuf,

    /// Dataset name (gsm8k, math500, math500_algebra, hotpotqa, 2wikimultihopqa).
    #[arg(short, long)]
    dataset: String,

    /// Method to run: cot, no_cot, or a2a.
    #[arg(short, long, default_value = "a2a")]
    method: Method,

    /// Model family (claude, gpt) or a full model id.
    #[arg(long, default_value = "gpt")]
    model: String,

    /// Use the single-round A2A variant.
    #[arg(long)]
    single_round: bool,

    /// Only run the first N samples.
    #[arg(short, long)]
    limit: Option<usize>,

    /// Maximum sessions in flight.
    #[arg(long, default_value_t = 10)]
    concurrency: usize,

    /// Checkpoint after this many results.
    #[arg(long, default_value_t = 10)]
    flush_every: usize,

    /// Root directory for checkpoints.
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,

    /// Directory for card dumps.
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,

    /// Discard any existing checkpoint first.
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cotvsa2a=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let samples = load_samples(&cli.samples, cli.limit)
        .with_context(|| format!("loading {}", cli.samples.display()))?;

    let store = CheckpointStore::new(&cli.checkpoint_dir, &cli.dataset);
    if cli.fresh && store.clear(cli.method.as_str(), &cli.model)? {
        info!("Cleared checkpoint for {}-{}", cli.method, cli.model);
    }

    let mut settings = RunSettings::new(cli.method, cli.model.clone(), cli.dataset.as_str());
    settings.concurrency = cli.concurrency;
    settings.flush_every = cli.flush_every;
    if cli.single_round {
        settings.mode = OrchestrationMode::SingleRound;
    }

    let runner = BenchRunner::new(Arc::new(OpenRouterFactory::from_env()), store, settings);
    let results = runner.run(&samples).await?;

    let summary = RunSummary::from_results(&results);
    info!(
        "{}-{} on {}: accuracy {:.4} ({}/{}), {} errored, {} tokens",
        cli.method,
        cli.model,
        cli.dataset,
        summary.accuracy(),
        summary.correct,
        summary.total,
        summary.errored,
        summary.tokens
    );

    if cli.method == Method::A2a {
        let cards = collect_cards(&results);
        if cards.is_empty() {
            warn!("No A2A cards recorded");
        } else {
            fs::create_dir_all(&cli.results_dir)?;
            let path = cli
                .results_dir
                .join(format!("{}_a2a_{}_cards.json", cli.dataset, cli.model));
            fs::write(&path, serde_json::to_string_pretty(&cards)?)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Saved {} A2A cards to {}", cards.len(), path.display());
            info!("{}", flow_diagram(&cards));
        }
    }

    Ok(())
}
