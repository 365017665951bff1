use crate::{
    alert::Alert,
    bar::Bar,
    classifier::Classifier,
    contract::{ContractId, ContractKind},
    error::FlowError,
    queue::AlertQueue,
    series::{BarSeries, EmittedBar},
    sink::PersistenceHook,
    tag_stats::TagStatistics,
    timeframe::Timeframe,
};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared form of the per-contract anomaly callback, registered on every [`BarSeries`].
pub type SharedAlertCallback = Arc<dyn Fn(Timeframe, &Bar) + Send + Sync>;

/// Owns the [`BarSeries`] of every contract and turns their anomalies into queued [`Alert`]s.
///
/// Each series sits behind its own short-held lock so contracts ingest concurrently. When an
/// option needs its underlying for classification the option lock is taken first.
pub struct ContractRegistry {
    series: RwLock<FnvHashMap<ContractId, Arc<Mutex<BarSeries>>>>,
    classifier: Classifier,
    statistics: Arc<TagStatistics>,
    queue: AlertQueue,
    hook: Arc<dyn PersistenceHook>,
    alert_callback: Option<SharedAlertCallback>,
    market_clock: Mutex<Option<DateTime<Utc>>>,
}

impl std::fmt::Debug for ContractRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractRegistry")
            .field("contracts", &self.series.read().len())
            .field("classifier", &self.classifier)
            .field("queue", &self.queue)
            .field("market_clock", &*self.market_clock.lock())
            .finish()
    }
}

impl ContractRegistry {
    pub fn new(
        classifier: Classifier,
        statistics: Arc<TagStatistics>,
        queue: AlertQueue,
        hook: Arc<dyn PersistenceHook>,
        alert_callback: Option<SharedAlertCallback>,
    ) -> Self {
        Self {
            series: RwLock::new(FnvHashMap::default()),
            classifier,
            statistics,
            queue,
            hook,
            alert_callback,
            market_clock: Mutex::new(None),
        }
    }

    pub fn underlying(&self) -> ContractId {
        self.classifier.underlying
    }

    pub fn statistics(&self) -> &Arc<TagStatistics> {
        &self.statistics
    }

    pub fn queue(&self) -> &AlertQueue {
        &self.queue
    }

    /// Latest bar timestamp ingested on any contract.
    pub fn market_time(&self) -> Option<DateTime<Utc>> {
        *self.market_clock.lock()
    }

    pub fn series(&self, contract: ContractId) -> Option<Arc<Mutex<BarSeries>>> {
        self.series.read().get(&contract).cloned()
    }

    pub fn contracts(&self) -> Vec<ContractId> {
        let mut contracts = self.series.read().keys().copied().collect::<Vec<_>>();
        contracts.sort();
        contracts
    }

    /// Bar count per timeframe for `contract`.
    pub fn counts(&self, contract: ContractId) -> Option<[usize; 4]> {
        self.series(contract).map(|series| series.lock().counts())
    }

    fn series_or_insert(&self, contract: ContractId) -> Arc<Mutex<BarSeries>> {
        if let Some(series) = self.series(contract) {
            return series;
        }

        self.series
            .write()
            .entry(contract)
            .or_insert_with(|| {
                let mut series = BarSeries::new(contract, contract == self.underlying());
                if let Some(callback) = &self.alert_callback {
                    let callback = callback.clone();
                    series.register_alert_callback(Box::new(move |timeframe, bar| {
                        callback(timeframe, bar)
                    }));
                }
                info!(%contract, "tracking new contract");
                Arc::new(Mutex::new(series))
            })
            .clone()
    }

    fn advance_market_clock(&self, time: DateTime<Utc>) {
        let mut clock = self.market_clock.lock();
        *clock = Some(clock.map_or(time, |current| current.max(time)));
    }

    /// Ingest one base bar, returning the alerts it raised and enqueued.
    pub fn ingest(&self, bar: Bar) -> Vec<Alert> {
        let series = self.series_or_insert(bar.contract);
        self.advance_market_clock(bar.timestamp);

        let alerts = {
            let mut series = series.lock();
            let emitted = series.ingest_base(bar);

            for EmittedBar { timeframe, bar, .. } in &emitted {
                if let Err(error) = self.hook.on_bar(*timeframe, bar) {
                    warn!(contract = %bar.contract, %timeframe, %error, "persistence hook failed");
                }
            }

            if series.is_underlying() || !emitted.iter().any(|emitted| emitted.anomalous) {
                return Vec::new();
            }

            self.classify(&series, &emitted)
        };

        alerts
            .into_iter()
            .filter(|alert| self.publish(alert))
            .collect()
    }

    fn classify(&self, option: &BarSeries, emitted: &[EmittedBar]) -> Vec<Alert> {
        let ContractKind::Option { strike, .. } = option.contract().kind(self.underlying()) else {
            return Vec::new();
        };

        let Some(underlying) = self.series(self.underlying()) else {
            let error = FlowError::UnderlyingUnavailable(self.underlying());
            warn!(contract = %option.contract(), %error, "discarding anomaly");
            return Vec::new();
        };
        let underlying = underlying.lock();

        emitted
            .iter()
            .filter(|emitted| emitted.anomalous)
            .filter_map(|EmittedBar { timeframe, bar, .. }| {
                match self.classifier.classify(*timeframe, bar, option, &underlying) {
                    Ok(tags) => Some(Alert::new(*timeframe, bar, strike, tags)),
                    Err(error) => {
                        warn!(contract = %bar.contract, %timeframe, %error, "discarding anomaly");
                        None
                    }
                }
            })
            .collect()
    }

    fn publish(&self, alert: &Alert) -> bool {
        let history = self.statistics.lookup(&alert.tags);

        info!(
            contract = %alert.contract,
            option_type = ?alert.option_type,
            strike = alert.strike,
            timeframe = %alert.timeframe,
            reference_price = alert.reference_price,
            reference_time = %alert.reference_time,
            history_alerts = history.total_alerts,
            history_win_rate = history.win_rate,
            history_average_win = history.average_win,
            "volume anomaly alert"
        );

        if let Err(error) = self.hook.on_alert(alert) {
            warn!(contract = %alert.contract, %error, "persistence hook failed");
        }

        match self.queue.push(alert.clone()) {
            Ok(()) => true,
            Err(error) if error.is_event_scoped() => false,
            Err(error) => {
                warn!(contract = %alert.contract, %error, "failed to enqueue alert");
                false
            }
        }
    }

    /// Copy the base bars of `contract` starting in `[from, to)`.
    pub fn window(
        &self,
        contract: ContractId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, FlowError> {
        let series = self
            .series(contract)
            .ok_or(FlowError::UnknownContract(contract))?;

        let window = series.lock().bars_between(Timeframe::Base, from, to);
        Ok(window)
    }
}
