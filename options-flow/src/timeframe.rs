use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bar timeframe tiers. Each tier is derived from a fixed number of bars of the tier below.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum Timeframe {
    /// 5 second bars, supplied by the data feed.
    Base,
    /// 30 second bars.
    Tier2,
    /// 1 minute bars.
    Tier3,
    /// 5 minute bars.
    Tier4,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Base,
        Timeframe::Tier2,
        Timeframe::Tier3,
        Timeframe::Tier4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Base => "5s",
            Timeframe::Tier2 => "30s",
            Timeframe::Tier3 => "1m",
            Timeframe::Tier4 => "5m",
        }
    }

    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::Base => Duration::from_secs(5),
            Timeframe::Tier2 => Duration::from_secs(30),
            Timeframe::Tier3 => Duration::from_secs(60),
            Timeframe::Tier4 => Duration::from_secs(300),
        }
    }

    pub fn time_delta(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(self.duration().as_secs() as i64)
    }

    /// Timeframe derived from this one, if any.
    pub fn next(&self) -> Option<Timeframe> {
        match self {
            Timeframe::Base => Some(Timeframe::Tier2),
            Timeframe::Tier2 => Some(Timeframe::Tier3),
            Timeframe::Tier3 => Some(Timeframe::Tier4),
            Timeframe::Tier4 => None,
        }
    }

    /// Timeframe this one is derived from, if any.
    pub fn previous(&self) -> Option<Timeframe> {
        match self {
            Timeframe::Base => None,
            Timeframe::Tier2 => Some(Timeframe::Base),
            Timeframe::Tier3 => Some(Timeframe::Tier2),
            Timeframe::Tier4 => Some(Timeframe::Tier3),
        }
    }

    /// Number of lower timeframe bars that make up one bar of this timeframe.
    pub fn ratio(&self) -> usize {
        match self {
            Timeframe::Base => 1,
            Timeframe::Tier2 => 6,
            Timeframe::Tier3 => 2,
            Timeframe::Tier4 => 5,
        }
    }

    /// Anomaly thresholds applied to bars of this timeframe.
    pub fn anomaly_rule(&self) -> AnomalyRule {
        match self {
            Timeframe::Base => AnomalyRule::new(2.0, 9),
            Timeframe::Tier2 => AnomalyRule::new(1.5, 9),
            Timeframe::Tier3 => AnomalyRule::new(1.0, 9),
            Timeframe::Tier4 => AnomalyRule::new(1.0, 4),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Volume deviation threshold and minimum sample gate for flagging a bar as anomalous.
#[derive(Debug, Copy, Clone, PartialEq, derive_more::Constructor)]
pub struct AnomalyRule {
    pub threshold: f64,
    pub min_samples: u64,
}

impl AnomalyRule {
    /// Strictly more than `min_samples` samples, the bar under test included.
    pub fn is_eligible(&self, sample_count: u64) -> bool {
        sample_count > self.min_samples
    }
}
