use options_flow::{AlertPipeline, Bar, Maturity, PersistenceHook, PipelineConfig, TagDimension};
use std::{
    error::Error,
    fs::File,
    io::{BufRead, BufReader},
    sync::Arc,
};
use tracing::{info, warn};

mod sink;

use sink::JsonlSink;

/// Lines ingested between yields to the outcome worker.
const REPLAY_BATCH: usize = 1_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    init_logging();

    let input = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FLOW_REPLAY_PATH").ok())
        .ok_or("usage: options-flow-replay <bars.jsonl> (or set FLOW_REPLAY_PATH)")?;
    let output = std::env::var("FLOW_REPLAY_OUTPUT")
        .unwrap_or_else(|_| "options-flow-records.jsonl".to_string());
    let write_bars = std::env::var("FLOW_REPLAY_WRITE_BARS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(false);

    // Replays default to market-time maturity so outcomes resolve without waiting in real time
    let mut config = PipelineConfig::from_env()?;
    if std::env::var("FLOW_MATURITY").is_err() {
        config = config.with_maturity(Maturity::MarketTime);
    }

    let sink = Arc::new(JsonlSink::create(&output, write_bars)?);
    let pipeline = AlertPipeline::builder(config).hook(sink.clone()).spawn()?;

    info!(%input, %output, "replaying bars");

    tokio::select! {
        result = replay(&pipeline, &input) => result?,
        _ = tokio::signal::ctrl_c() => warn!("interrupted, stopping replay"),
    }

    pipeline.drain().await;

    let snapshot = pipeline.tag_statistics().snapshot_all();
    info!(
        combinations = snapshot.combinations.len(),
        total_alerts = snapshot.total_alerts(),
        win_rate = snapshot.overall_win_rate(),
        unresolved = pipeline.pending_alerts(),
        dropped = pipeline.dropped_alerts(),
        "replay complete"
    );
    for (value, entry) in snapshot.dimension(TagDimension::Timeframe) {
        info!(
            %value,
            total_alerts = entry.total_alerts,
            win_rate = entry.win_rate,
            average_win = entry.average_win,
            "timeframe statistics"
        );
    }

    pipeline.shutdown().await;

    sink.on_snapshot(&snapshot)?;

    Ok(())
}

/// Submit every bar of a JSON-lines file. Malformed lines are skipped with a warning.
async fn replay(pipeline: &AlertPipeline, path: &str) -> Result<(), Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);

    let mut bars = 0_usize;
    let mut alerts = 0_usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Bar>(&line) {
            Ok(bar) => {
                alerts += pipeline.submit_bar(bar).len();
                bars += 1;
            }
            Err(error) => {
                warn!(line = index + 1, %error, "skipping malformed bar");
            }
        }

        if bars % REPLAY_BATCH == 0 {
            tokio::task::yield_now().await;
        }
    }

    info!(bars, alerts, "input exhausted");
    Ok(())
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("FLOW_LOG_JSON")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
