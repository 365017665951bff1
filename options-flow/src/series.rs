use crate::{
    bar::Bar, contract::ContractId, error::FlowError, stats::RunningStat, timeframe::Timeframe,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Invoked synchronously for every anomalous bar of a non-underlying contract.
pub type AlertCallback = Box<dyn FnMut(Timeframe, &Bar) + Send>;

/// Number of [`Timeframe::Tier4`] bars folded into one local high/low window (30 minutes).
pub const LOCAL_WINDOW_TIER4_BARS: usize = 6;

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct HighLow {
    pub high: f64,
    pub low: f64,
}

impl HighLow {
    const EMPTY: HighLow = HighLow {
        high: 0.0,
        low: f64::INFINITY,
    };

    fn widen(self, bar: &Bar) -> Self {
        Self {
            high: self.high.max(bar.high),
            low: self.low.min(bar.low),
        }
    }

    fn is_near_high(&self, price: f64, proximity: f64) -> bool {
        price >= self.high * (1.0 - proximity)
    }

    fn is_near_low(&self, price: f64, proximity: f64) -> bool {
        price <= self.low * (1.0 + proximity)
    }
}

/// Proximity of a price to the daily and local extremes of a [`BarSeries`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct HighLowComparison {
    pub near_daily_low: bool,
    pub near_daily_high: bool,
    pub near_local_low: bool,
    pub near_local_high: bool,
}

/// Bar produced by [`BarSeries::ingest_base`], at the base timeframe or derived from it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EmittedBar {
    pub timeframe: Timeframe,
    pub bar: Bar,
    pub anomalous: bool,
}

#[derive(Debug, Clone, Default)]
struct TierState {
    bars: Vec<Bar>,
    volume: RunningStat,
    range: RunningStat,
}

/// Per-contract multi-timeframe bar history, statistics and price extremes.
pub struct BarSeries {
    contract: ContractId,
    is_underlying: bool,
    tiers: [TierState; 4],
    daily: Option<HighLow>,
    local: Option<HighLow>,
    pending_local: HighLow,
    cumulative_volume: Vec<(DateTime<Utc>, f64)>,
    on_anomaly: Option<AlertCallback>,
}

impl std::fmt::Debug for BarSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarSeries")
            .field("contract", &self.contract)
            .field("is_underlying", &self.is_underlying)
            .field("counts", &self.counts())
            .field("daily", &self.daily)
            .field("local", &self.local)
            .field("has_callback", &self.on_anomaly.is_some())
            .finish()
    }
}

impl BarSeries {
    pub fn new(contract: ContractId, is_underlying: bool) -> Self {
        Self {
            contract,
            is_underlying,
            tiers: Default::default(),
            daily: None,
            local: None,
            pending_local: HighLow::EMPTY,
            cumulative_volume: Vec::new(),
            on_anomaly: None,
        }
    }

    pub fn contract(&self) -> ContractId {
        self.contract
    }

    pub fn is_underlying(&self) -> bool {
        self.is_underlying
    }

    /// Replace the anomaly callback. A contract has at most one.
    pub fn register_alert_callback(&mut self, callback: AlertCallback) {
        self.on_anomaly = Some(callback);
    }

    /// Append a base bar and cascade every higher timeframe bar it completes.
    ///
    /// Returns the base bar followed by each derived bar, in ascending timeframe order, with
    /// their anomaly flags. Bars must arrive in increasing timestamp order.
    pub fn ingest_base(&mut self, bar: Bar) -> Vec<EmittedBar> {
        let mut emitted = Vec::with_capacity(Timeframe::ALL.len());

        self.daily = Some(self.daily.unwrap_or(HighLow::EMPTY).widen(&bar));
        emitted.push(self.record(Timeframe::Base, bar));

        let mut current = Timeframe::Base;
        while let Some(next) = current.next() {
            if self.tier(current).bars.len() % next.ratio() != 0 {
                break;
            }

            let derived = match self.derive(next) {
                Ok(derived) => derived,
                Err(error) => {
                    warn!(contract = %self.contract, %error, "skipping bar derivation");
                    break;
                }
            };

            debug!(
                contract = %self.contract,
                timeframe = %next,
                timestamp = %derived.timestamp,
                volume = derived.volume,
                "derived bar"
            );

            emitted.push(self.record(next, derived));

            match next {
                Timeframe::Tier3 => {
                    let total = self.cumulative_volume() + derived.volume;
                    self.cumulative_volume.push((derived.timestamp, total));
                }
                Timeframe::Tier4 => {
                    self.pending_local = self.pending_local.widen(&derived);
                    if self.tier(Timeframe::Tier4).bars.len() % LOCAL_WINDOW_TIER4_BARS == 0 {
                        self.local = Some(self.pending_local);
                        self.pending_local = HighLow::EMPTY;
                    }
                }
                _ => {}
            }

            current = next;
        }

        emitted
    }

    /// Build the next `timeframe` bar from the oldest lower timeframe bars not yet folded into
    /// one, provided a complete window of `timeframe.ratio()` bars exists.
    pub fn derive(&self, timeframe: Timeframe) -> Result<Bar, FlowError> {
        let ratio = timeframe.ratio();
        let incomplete = |actual| FlowError::IncompleteWindow {
            timeframe,
            expected: ratio,
            actual,
        };

        let lower = timeframe.previous().ok_or_else(|| incomplete(0))?;
        let lower = &self.tier(lower).bars;

        let consumed = self.tier(timeframe).bars.len() * ratio;
        let available = lower.len().saturating_sub(consumed);
        if available < ratio {
            return Err(incomplete(available));
        }

        Bar::merge(&lower[consumed..consumed + ratio]).ok_or_else(|| incomplete(0))
    }

    fn record(&mut self, timeframe: Timeframe, bar: Bar) -> EmittedBar {
        let tier = &mut self.tiers[timeframe.ordinal()];
        tier.bars.push(bar);
        tier.volume.add_value(bar.volume);
        tier.range.add_value(bar.range());

        let rule = timeframe.anomaly_rule();
        let anomalous = !self.is_underlying
            && rule.is_eligible(tier.volume.sample_count())
            && tier.volume.exceeds(bar.volume, rule.threshold);

        if anomalous {
            if let Some(callback) = self.on_anomaly.as_mut() {
                callback(timeframe, &bar);
            }
        }

        EmittedBar {
            timeframe,
            bar,
            anomalous,
        }
    }

    fn tier(&self, timeframe: Timeframe) -> &TierState {
        &self.tiers[timeframe.ordinal()]
    }

    pub fn bars(&self, timeframe: Timeframe) -> &[Bar] {
        &self.tier(timeframe).bars
    }

    pub fn last_bar(&self, timeframe: Timeframe) -> Option<&Bar> {
        self.tier(timeframe).bars.last()
    }

    /// Close of the latest base bar.
    pub fn last_price(&self) -> Option<f64> {
        self.last_bar(Timeframe::Base).map(|bar| bar.close)
    }

    pub fn volume_stat(&self, timeframe: Timeframe) -> &RunningStat {
        &self.tier(timeframe).volume
    }

    pub fn range_stat(&self, timeframe: Timeframe) -> &RunningStat {
        &self.tier(timeframe).range
    }

    /// Bar count per timeframe, in [`Timeframe::ALL`] order.
    pub fn counts(&self) -> [usize; 4] {
        Timeframe::ALL.map(|timeframe| self.tier(timeframe).bars.len())
    }

    pub fn daily_high_low(&self) -> Option<HighLow> {
        self.daily
    }

    /// Extremes of the last completed 30 minute window, if one has completed.
    pub fn local_high_low(&self) -> Option<HighLow> {
        self.local
    }

    /// Total [`Timeframe::Tier3`] volume so far.
    pub fn cumulative_volume(&self) -> f64 {
        self.cumulative_volume
            .last()
            .map(|(_, total)| *total)
            .unwrap_or_default()
    }

    /// Total [`Timeframe::Tier3`] volume of bars starting at or before `time`.
    pub fn cumulative_volume_at(&self, time: DateTime<Utc>) -> f64 {
        let index = self
            .cumulative_volume
            .partition_point(|(timestamp, _)| *timestamp <= time);

        index
            .checked_sub(1)
            .map(|index| self.cumulative_volume[index].1)
            .unwrap_or_default()
    }

    /// Clone the `timeframe` bars starting in `[from, to)`.
    pub fn bars_between(
        &self,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Bar> {
        let bars = &self.tier(timeframe).bars;
        let start = bars.partition_point(|bar| bar.timestamp < from);
        let end = bars.partition_point(|bar| bar.timestamp < to);
        bars.get(start..end.max(start))
            .map(<[Bar]>::to_vec)
            .unwrap_or_default()
    }

    /// Compare `price` against the daily and local extremes.
    ///
    /// `proximity` is a fractional tolerance: a price is near the high when it is at or above
    /// `high * (1 - proximity)` and near the low when at or below `low * (1 + proximity)`.
    /// No local window has completed yet means neither local flag is set.
    pub fn high_low_comparisons(&self, price: f64, proximity: f64) -> HighLowComparison {
        let near_low = |extremes: Option<HighLow>| {
            extremes.is_some_and(|extremes| extremes.is_near_low(price, proximity))
        };
        let near_high = |extremes: Option<HighLow>| {
            extremes.is_some_and(|extremes| extremes.is_near_high(price, proximity))
        };

        HighLowComparison {
            near_daily_low: near_low(self.daily),
            near_daily_high: near_high(self.daily),
            near_local_low: near_low(self.local),
            near_local_high: near_high(self.local),
        }
    }
}
