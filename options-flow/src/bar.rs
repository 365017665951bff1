use crate::contract::ContractId;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single contract. `timestamp` is the bar's start instant.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Bar {
    pub contract: ContractId,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Price range (`high - low`) of the bar.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Combine a contiguous window of bars, oldest first, into one bar.
    ///
    /// Returns `None` for an empty window.
    pub fn merge(window: &[Bar]) -> Option<Bar> {
        let (first, rest) = window.split_first()?;

        let merged = rest.iter().fold(*first, |acc, bar| Bar {
            high: acc.high.max(bar.high),
            low: acc.low.min(bar.low),
            close: bar.close,
            volume: acc.volume + bar.volume,
            ..acc
        });

        Some(merged)
    }
}
