use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use options_flow::{
    Alert, AlertOutcome, AlertPipeline, Bar, ContractId, FlowError, Maturity, PersistenceHook,
    PipelineConfig, TagStatEntry, TagStatsSnapshot, Timeframe, WinClass, WorkerStatus,
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

const UNDERLYING: ContractId = ContractId(0);
const CALL_4510: ContractId = ContractId(4510);
const LOOKAHEAD: Duration = Duration::from_secs(30 * 60);

/// 2024-03-12 09:30 New York.
fn session_open() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 12, 13, 30, 0).unwrap()
}

fn bar(contract: ContractId, index: i64, close: f64, volume: f64) -> Bar {
    Bar::new(
        contract,
        session_open() + TimeDelta::seconds(5 * index),
        close,
        close + 0.5,
        close - 0.5,
        close,
        volume,
    )
}

/// Flat underlying and option history followed by a tenfold option volume spike at bar 9,
/// then two bars trading at 32.5 (high 33, 65% above the 20 reference close).
fn submit_winning_spike(pipeline: &AlertPipeline, option: ContractId) -> Vec<Alert> {
    for index in 0..10 {
        pipeline.submit_bar(bar(UNDERLYING, index, 4502.0, 100.0));
    }
    for index in 0..9 {
        pipeline.submit_bar(bar(option, index, 20.0, 100.0));
    }

    let alerts = pipeline.submit_bar(bar(option, 9, 20.0, 1000.0));

    for index in 10..12 {
        pipeline.submit_bar(bar(option, index, 32.5, 100.0));
    }

    alerts
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default)]
struct RecordingHook {
    alerts: Mutex<Vec<Alert>>,
    outcomes: Mutex<Vec<(Alert, AlertOutcome, TagStatEntry)>>,
    snapshots: Mutex<Vec<TagStatsSnapshot>>,
}

impl PersistenceHook for RecordingHook {
    fn on_alert(&self, alert: &Alert) -> Result<(), FlowError> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }

    fn on_outcome(
        &self,
        alert: &Alert,
        outcome: &AlertOutcome,
        entry: &TagStatEntry,
    ) -> Result<(), FlowError> {
        self.outcomes.lock().push((alert.clone(), *outcome, *entry));
        Ok(())
    }

    fn on_snapshot(&self, snapshot: &TagStatsSnapshot) -> Result<(), FlowError> {
        self.snapshots.lock().push(snapshot.clone());
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_alert_pipeline_wall_clock_outcome() {
    init_tracing();
    let hook = Arc::new(RecordingHook::default());
    let pipeline = AlertPipeline::builder(PipelineConfig::default())
        .hook(hook.clone())
        .spawn()
        .unwrap();

    let alerts = submit_winning_spike(&pipeline, CALL_4510);
    assert_eq!(alerts.len(), 1);
    let tags = alerts[0].tags;
    assert_eq!(alerts[0].timeframe, Timeframe::Base);
    assert_eq!(pipeline.pending_alerts(), 1);

    // not yet mature
    tokio::time::sleep(LOOKAHEAD / 2).await;
    assert_eq!(pipeline.pending_alerts(), 1);
    assert!(pipeline.tag_statistics().is_empty());

    tokio::time::sleep(LOOKAHEAD / 2 + Duration::from_secs(2)).await;
    assert_eq!(pipeline.pending_alerts(), 0);

    let entry = pipeline.tag_statistics().lookup(&tags);
    assert_eq!(entry.total_alerts, 1);
    assert_eq!(entry.win_rate, 1.0);
    assert_eq!(entry.average_win, 65.0);

    let outcomes = hook.outcomes.lock();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].1, AlertOutcome::new(WinClass::Win, 65.0));
    assert_eq!(outcomes[0].2, entry);
    drop(outcomes);

    pipeline.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_alert_pipeline_market_time_outcome() {
    init_tracing();
    let config = PipelineConfig::default().with_maturity(Maturity::MarketTime);
    let pipeline = AlertPipeline::builder(config).spawn().unwrap();

    let alerts = submit_winning_spike(&pipeline, CALL_4510);
    assert_eq!(alerts.len(), 1);

    // market clock has not reached the horizon
    pipeline.drain().await;
    assert_eq!(pipeline.worker_status(), WorkerStatus::Waiting);
    assert_eq!(pipeline.pending_alerts(), 1);
    assert!(pipeline.tag_statistics().is_empty());

    // reference time is the end of bar 9, so bar 370 starts exactly at the horizon
    pipeline.submit_bar(bar(UNDERLYING, 370, 4502.0, 100.0));
    pipeline.drain().await;

    assert_eq!(pipeline.pending_alerts(), 0);
    let entry = pipeline.tag_statistics().lookup(&alerts[0].tags);
    assert_eq!(entry.total_alerts, 1);
    assert_eq!(entry.average_win, 65.0);

    pipeline.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_alert_pipeline_shutdown_discards_pending() {
    let pipeline = AlertPipeline::builder(PipelineConfig::default())
        .spawn()
        .unwrap();
    let statistics = pipeline.tag_statistics().clone();

    assert_eq!(submit_winning_spike(&pipeline, CALL_4510).len(), 1);
    pipeline.shutdown().await;

    assert!(statistics.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_alert_pipeline_drops_alerts_when_queue_full() {
    let config = PipelineConfig::default().with_queue_capacity(1);
    let pipeline = AlertPipeline::builder(config).spawn().unwrap();

    assert_eq!(submit_winning_spike(&pipeline, CALL_4510).len(), 1);
    // let the worker take the first alert off the channel
    tokio::task::yield_now().await;
    assert_eq!(submit_winning_spike(&pipeline, ContractId(4520)).len(), 1);
    assert!(submit_winning_spike(&pipeline, ContractId(4530)).is_empty());

    assert_eq!(pipeline.pending_alerts(), 2);
    assert_eq!(pipeline.dropped_alerts(), 1);

    pipeline.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_alert_pipeline_alert_callback_and_reporter() {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let hook = Arc::new(RecordingHook::default());

    let config = PipelineConfig::default().with_report_interval(Duration::from_secs(60));
    let pipeline = AlertPipeline::builder(config)
        .hook(hook.clone())
        .alert_callback({
            let fired = fired.clone();
            move |timeframe, bar: &Bar| fired.lock().push((timeframe, bar.contract, bar.volume))
        })
        .spawn()
        .unwrap();

    submit_winning_spike(&pipeline, CALL_4510);
    assert_eq!(*fired.lock(), vec![(Timeframe::Base, CALL_4510, 1000.0)]);
    assert_eq!(hook.alerts.lock().len(), 1);

    tokio::time::sleep(Duration::from_secs(125)).await;
    let snapshots = hook.snapshots.lock();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0], TagStatsSnapshot::default());
    drop(snapshots);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_alert_pipeline_spawn_rejects_invalid_config() {
    struct TestCase {
        input: PipelineConfig,
    }

    let tests = vec![
        TestCase {
            // TC0: zero report interval
            input: PipelineConfig::default().with_report_interval(Duration::ZERO),
        },
        TestCase {
            // TC1: zero poll interval
            input: PipelineConfig::default().with_poll_interval(Duration::ZERO),
        },
        TestCase {
            // TC2: negative strike increment
            input: PipelineConfig::default().with_strike_increment(-5.0),
        },
        TestCase {
            // TC3: negative proximity
            input: PipelineConfig::default().with_proximity(-0.001),
        },
    ];

    for (index, test) in tests.into_iter().enumerate() {
        let actual = AlertPipeline::builder(test.input).spawn();
        assert!(
            matches!(actual, Err(FlowError::Config(_))),
            "TC{} failed",
            index
        );
    }
}
