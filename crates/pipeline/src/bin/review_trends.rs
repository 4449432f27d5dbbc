use anyhow::Result;
use clap::Parser;
use ingest::ReviewReader;
use pipeline::{OperationMode, PipelineConfig, PipelineState, ReviewPipelineServices, build_review_pipeline, parse_run_date};
use std::path::PathBuf;
use tracing::info;

/// Review Trends - daily topic trend table from a batch of reviews
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Reviews file (.json array or .jsonl)
    #[arg(short, long)]
    reviews: PathBuf,

    /// First day of the window (YYYY-MM-DD, inclusive)
    #[arg(long)]
    start: String,

    /// Last day of the window (YYYY-MM-DD, inclusive)
    #[arg(long)]
    end: String,

    /// Where to write the CSV trend table
    #[arg(short, long, default_value = "output/report.csv")]
    output: PathBuf,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset: fast, balanced, accurate. Overrides the config file's `mode`
    #[arg(long)]
    mode: Option<OperationMode>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path, args.mode)?,
        None => PipelineConfig::for_mode(args.mode.unwrap_or_default()),
    };
    if args.json_logs {
        config.logging.json = true;
    }
    init_tracing(config.logging.json);

    let start = parse_run_date(&args.start)?;
    let end = parse_run_date(&args.end)?;
    info!(%start, %end, output = %args.output.display(), mode = ?config.mode, "Starting review trends run");

    let reviews = ReviewReader::read_file(&args.reviews).await?;
    let graph = build_review_pipeline(ReviewPipelineServices::from_config(&config)?)?;

    let state = graph
        .invoke(PipelineState::new(reviews, start, end, args.output))
        .await?;

    if let Some(summary) = &state.summary {
        info!(
            reviews = state.reviews.len(),
            clusters = state.canonical.len(),
            observations = summary.received,
            dropped = summary.dropped_malformed,
            overflowed = summary.overflowed,
            "Run summary"
        );
    }
    println!("Report saved to {}", state.output.display());

    Ok(())
}
