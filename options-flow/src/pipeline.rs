use crate::{
    alert::Alert,
    bar::Bar,
    config::{Maturity, PipelineConfig},
    error::FlowError,
    outcome::{AlertOutcome, OutcomeEvaluator},
    queue::{AlertReceiver, alert_queue},
    registry::{ContractRegistry, SharedAlertCallback},
    sink::{NoopHook, PersistenceHook},
    tag_stats::{TagStatEntry, TagStatistics},
    timeframe::Timeframe,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// What the outcome worker is currently doing.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum WorkerStatus {
    /// Waiting for the next alert.
    #[default]
    Idle,
    /// Holding the queue head until its lookahead horizon has passed.
    Waiting,
    Evaluating,
    Stopped,
}

/// Builder for [`AlertPipeline`].
pub struct AlertPipelineBuilder {
    config: PipelineConfig,
    hook: Arc<dyn PersistenceHook>,
    alert_callback: Option<SharedAlertCallback>,
}

impl std::fmt::Debug for AlertPipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertPipelineBuilder")
            .field("config", &self.config)
            .field("alert_callback", &self.alert_callback.is_some())
            .finish()
    }
}

impl AlertPipelineBuilder {
    pub fn hook(self, hook: Arc<dyn PersistenceHook>) -> Self {
        Self { hook, ..self }
    }

    /// Invoked synchronously on the ingesting thread for every anomalous option bar.
    pub fn alert_callback<F>(self, callback: F) -> Self
    where
        F: Fn(Timeframe, &Bar) + Send + Sync + 'static,
    {
        Self {
            alert_callback: Some(Arc::new(callback)),
            ..self
        }
    }

    /// Start the outcome worker and statistics reporter on the current Tokio runtime.
    ///
    /// Fails with [`FlowError::Config`] if the configuration does not pass
    /// [`PipelineConfig::validate`].
    pub fn spawn(self) -> Result<AlertPipeline, FlowError> {
        let Self {
            config,
            hook,
            alert_callback,
        } = self;

        config.validate()?;

        let (queue, receiver) = alert_queue(config.queue_capacity);
        let statistics = Arc::new(TagStatistics::new());
        let registry = Arc::new(ContractRegistry::new(
            config.classifier(),
            statistics.clone(),
            queue,
            hook.clone(),
            alert_callback,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(WorkerStatus::Idle);

        let worker = OutcomeWorker {
            receiver,
            registry: registry.clone(),
            statistics: statistics.clone(),
            evaluator: config.evaluator(),
            hook: hook.clone(),
            poll_interval: config.poll_interval,
            maturity: config.maturity,
            shutdown: shutdown_rx.clone(),
            status: status_tx,
        };

        info!(
            queue_capacity = config.queue_capacity,
            lookahead_secs = config.outcome.lookahead.as_secs(),
            maturity = ?config.maturity,
            underlying = %config.underlying,
            "starting alert pipeline"
        );

        Ok(AlertPipeline {
            registry,
            statistics: statistics.clone(),
            status: status_rx,
            shutdown: shutdown_tx,
            worker: Some(tokio::spawn(worker.run())),
            reporter: Some(tokio::spawn(run_reporter(
                statistics,
                hook,
                config.report_interval,
                shutdown_rx,
            ))),
        })
    }
}

/// Ingests base bars on the caller's thread and evaluates alert outcomes in the background.
///
/// Dropping the pipeline signals its background tasks to stop; [`AlertPipeline::shutdown`]
/// additionally waits for them.
#[derive(Debug)]
pub struct AlertPipeline {
    registry: Arc<ContractRegistry>,
    statistics: Arc<TagStatistics>,
    status: watch::Receiver<WorkerStatus>,
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
    reporter: Option<JoinHandle<()>>,
}

impl AlertPipeline {
    pub fn builder(config: PipelineConfig) -> AlertPipelineBuilder {
        AlertPipelineBuilder {
            config,
            hook: Arc::new(NoopHook),
            alert_callback: None,
        }
    }

    /// Ingest one base bar, returning the alerts it raised.
    pub fn submit_bar(&self, bar: Bar) -> Vec<Alert> {
        self.registry.ingest(bar)
    }

    pub fn tag_statistics(&self) -> &Arc<TagStatistics> {
        &self.statistics
    }

    pub fn registry(&self) -> &Arc<ContractRegistry> {
        &self.registry
    }

    pub fn pending_alerts(&self) -> u64 {
        self.registry.queue().pending()
    }

    pub fn dropped_alerts(&self) -> u64 {
        self.registry.queue().dropped()
    }

    pub fn worker_status(&self) -> WorkerStatus {
        *self.status.borrow()
    }

    /// Wait until every queued alert that has already matured is evaluated, ie. the queue is
    /// empty or the worker has re-checked its head since this call and found it immature.
    pub async fn drain(&self) {
        let mut status = self.status.clone();
        status.mark_unchanged();

        while self.pending_alerts() > 0 {
            if status.changed().await.is_err() {
                return;
            }
            if matches!(
                *status.borrow_and_update(),
                WorkerStatus::Waiting | WorkerStatus::Stopped
            ) {
                return;
            }
        }
    }

    /// Stop the background tasks, discarding alerts still pending, and wait for them to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);

        for handle in [self.worker.take(), self.reporter.take()]
            .into_iter()
            .flatten()
        {
            if let Err(error) = handle.await {
                warn!(%error, "alert pipeline task failed");
            }
        }

        info!(
            pending = self.pending_alerts(),
            dropped = self.dropped_alerts(),
            "alert pipeline stopped"
        );
    }
}

impl Drop for AlertPipeline {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

struct OutcomeWorker {
    receiver: AlertReceiver,
    registry: Arc<ContractRegistry>,
    statistics: Arc<TagStatistics>,
    evaluator: OutcomeEvaluator,
    hook: Arc<dyn PersistenceHook>,
    poll_interval: Duration,
    maturity: Maturity,
    shutdown: watch::Receiver<bool>,
    status: watch::Sender<WorkerStatus>,
}

impl OutcomeWorker {
    async fn run(mut self) {
        debug!("outcome worker started");

        loop {
            self.status.send_replace(WorkerStatus::Idle);

            let alert = tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                alert = self.receiver.recv() => match alert {
                    Some(alert) => alert,
                    None => break,
                },
            };

            let matured = self.wait_until_mature(&alert).await;
            if matured {
                self.status.send_replace(WorkerStatus::Evaluating);
                self.evaluate(&alert);
            }
            self.receiver.complete();

            if !matured {
                break;
            }
        }

        self.status.send_replace(WorkerStatus::Stopped);
        debug!("outcome worker stopped");
    }

    /// Poll until `alert` has matured. False if shutdown was requested first.
    async fn wait_until_mature(&mut self, alert: &Alert) -> bool {
        while !self.is_mature(alert) {
            self.status.send_replace(WorkerStatus::Waiting);

            tokio::select! {
                biased;
                _ = self.shutdown.changed() => return false,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        true
    }

    fn is_mature(&self, alert: &Alert) -> bool {
        match self.maturity {
            Maturity::WallClock => {
                let lookahead = self.evaluator.config.lookahead;
                alert.created_at + lookahead <= Instant::now()
            }
            Maturity::MarketTime => {
                let horizon = alert.reference_time + self.evaluator.lookahead();
                self.registry
                    .market_time()
                    .is_some_and(|market_time| market_time >= horizon)
            }
        }
    }

    fn evaluate(&self, alert: &Alert) {
        match self.outcome(alert) {
            Ok(outcome) => {
                let entry = self.statistics.record_outcome(&alert.tags, &outcome);
                info!(
                    contract = %alert.contract,
                    timeframe = %alert.timeframe,
                    win_class = ?outcome.win_class,
                    percent_move = outcome.percent_move,
                    total_alerts = entry.total_alerts,
                    win_rate = entry.win_rate,
                    "alert outcome recorded"
                );

                if let Err(error) = self.hook.on_outcome(alert, &outcome, &entry) {
                    warn!(contract = %alert.contract, %error, "persistence hook failed");
                }
            }
            Err(error) => {
                warn!(
                    contract = %alert.contract,
                    timeframe = %alert.timeframe,
                    %error,
                    "discarding alert, outcome could not be evaluated"
                );
            }
        }
    }

    fn outcome(&self, alert: &Alert) -> Result<AlertOutcome, FlowError> {
        let horizon = alert.reference_time + self.evaluator.lookahead();
        let window = self
            .registry
            .window(alert.contract, alert.bar_time(), horizon)?;

        self.evaluator
            .evaluate(alert.reference_price, alert.reference_time, &window)
    }
}

async fn run_reporter(
    statistics: Arc<TagStatistics>,
    hook: Arc<dyn PersistenceHook>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => report(&statistics, hook.as_ref()),
        }
    }
}

fn report(statistics: &TagStatistics, hook: &dyn PersistenceHook) {
    let snapshot = statistics.snapshot_all();

    info!(
        combinations = snapshot.combinations.len(),
        total_alerts = snapshot.total_alerts(),
        win_rate = snapshot.overall_win_rate(),
        "tag statistics"
    );

    for (tags, TagStatEntry { total_alerts, win_rate, average_win, .. }) in
        snapshot.top_combinations(3, 5)
    {
        debug!(
            option_type = ?tags.option_type,
            timeframe = %tags.timeframe,
            moneyness = ?tags.moneyness,
            time_of_day = ?tags.time_of_day,
            total_alerts,
            win_rate,
            average_win,
            "top tag combination"
        );
    }

    if let Err(error) = hook.on_snapshot(&snapshot) {
        warn!(%error, "persistence hook failed");
    }
}
