use crate::{
    bar::Bar,
    contract::ContractId,
    tags::{AlertTags, OptionType},
    timeframe::Timeframe,
};
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Classified anomaly awaiting outcome evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub contract: ContractId,
    pub option_type: OptionType,
    pub strike: f64,
    pub timeframe: Timeframe,
    /// Close of the anomalous bar.
    pub reference_price: f64,
    /// End of the anomalous bar.
    pub reference_time: DateTime<Utc>,
    pub tags: AlertTags,
    pub created_at: Instant,
}

impl Alert {
    pub fn new(timeframe: Timeframe, bar: &Bar, strike: f64, tags: AlertTags) -> Self {
        Self {
            contract: bar.contract,
            option_type: tags.option_type,
            strike,
            timeframe,
            reference_price: bar.close,
            reference_time: bar.timestamp + timeframe.time_delta(),
            tags,
            created_at: Instant::now(),
        }
    }

    /// Start of the anomalous bar.
    pub fn bar_time(&self) -> DateTime<Utc> {
        self.reference_time - self.timeframe.time_delta()
    }
}
