use crate::{
    classifier::Classifier,
    contract::ContractId,
    error::FlowError,
    outcome::{OutcomeConfig, OutcomeEvaluator},
    session::SessionHours,
};
use std::{str::FromStr, time::Duration};
use tracing::warn;

/// When a pending alert becomes eligible for outcome evaluation.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Maturity {
    /// Lookahead elapsed on the local monotonic clock since the alert was created.
    #[default]
    WallClock,
    /// Latest bar timestamp seen on any contract has passed the alert's lookahead horizon.
    /// Lets recorded sessions be replayed faster than real time.
    MarketTime,
}

impl FromStr for Maturity {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wall" | "wall_clock" => Ok(Maturity::WallClock),
            "market" | "market_time" => Ok(Maturity::MarketTime),
            other => Err(FlowError::Config(format!("unknown maturity mode: {other}"))),
        }
    }
}

/// [`AlertPipeline`](crate::pipeline::AlertPipeline) configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Maximum alerts awaiting evaluation before new ones are dropped
    pub queue_capacity: usize,
    /// Worker sleep between maturity checks of the queue head
    pub poll_interval: Duration,
    /// Interval between statistics snapshots
    pub report_interval: Duration,
    /// Fractional distance from a high or low that counts as near it
    pub proximity: f64,
    /// Reserved contract id of the underlying index
    pub underlying: ContractId,
    /// Strike spacing used for moneyness
    pub strike_increment: f64,
    pub session: SessionHours,
    pub outcome: OutcomeConfig,
    pub maturity: Maturity,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            poll_interval: Duration::from_secs(1),
            report_interval: Duration::from_secs(30 * 60),
            proximity: 0.001,
            underlying: ContractId(0),
            strike_increment: 5.0,
            session: SessionHours::default(),
            outcome: OutcomeConfig::default(),
            maturity: Maturity::default(),
        }
    }
}

impl PipelineConfig {
    /// Build from `FLOW_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, FlowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparsable numbers fall back to their defaults with
    /// a warning; an invalid session, maturity mode or out of range value is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FlowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let session = match (
            lookup("FLOW_SESSION_TZ"),
            lookup("FLOW_SESSION_OPEN"),
            lookup("FLOW_SESSION_CLOSE"),
        ) {
            (None, None, None) => default.session,
            (tz, open, close) => SessionHours::parse(
                tz.as_deref().unwrap_or("America/New_York"),
                open.as_deref().unwrap_or("09:30"),
                close.as_deref().unwrap_or("16:00"),
            )?,
        };

        let maturity = lookup("FLOW_MATURITY")
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or(default.maturity);

        let config = Self {
            queue_capacity: parse_or(&lookup, "FLOW_QUEUE_CAPACITY", default.queue_capacity),
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "FLOW_POLL_INTERVAL_MS",
                default.poll_interval.as_millis() as u64,
            )),
            report_interval: Duration::from_secs(parse_or(
                &lookup,
                "FLOW_REPORT_INTERVAL_SECS",
                default.report_interval.as_secs(),
            )),
            proximity: parse_or(&lookup, "FLOW_PROXIMITY", default.proximity),
            underlying: ContractId(parse_or(
                &lookup,
                "FLOW_UNDERLYING_ID",
                default.underlying.0,
            )),
            strike_increment: parse_or(
                &lookup,
                "FLOW_STRIKE_INCREMENT",
                default.strike_increment,
            ),
            session,
            outcome: OutcomeConfig {
                lookahead: Duration::from_secs(parse_or(
                    &lookup,
                    "FLOW_LOOKAHEAD_SECS",
                    default.outcome.lookahead.as_secs(),
                )),
                stop_loss_pct: parse_or(
                    &lookup,
                    "FLOW_STOP_LOSS_PCT",
                    default.outcome.stop_loss_pct,
                ),
                win_pct: parse_or(&lookup, "FLOW_WIN_PCT", default.outcome.win_pct),
            },
            maturity,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every interval is non-zero and every price parameter is a usable number.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.poll_interval.is_zero() {
            return Err(FlowError::Config("poll interval must be non-zero".to_string()));
        }
        if self.report_interval.is_zero() {
            return Err(FlowError::Config("report interval must be non-zero".to_string()));
        }
        if self.outcome.lookahead.is_zero() {
            return Err(FlowError::Config("outcome lookahead must be non-zero".to_string()));
        }
        if !(self.strike_increment.is_finite() && self.strike_increment > 0.0) {
            return Err(FlowError::Config(format!(
                "strike increment must be positive, got {}",
                self.strike_increment
            )));
        }
        if !(self.proximity.is_finite() && self.proximity >= 0.0) {
            return Err(FlowError::Config(format!(
                "proximity must be non-negative, got {}",
                self.proximity
            )));
        }

        for (name, pct) in [
            ("stop loss", self.outcome.stop_loss_pct),
            ("win", self.outcome.win_pct),
        ] {
            if !(pct.is_finite() && pct > 0.0) {
                return Err(FlowError::Config(format!(
                    "{name} percent must be positive, got {pct}"
                )));
            }
        }

        Ok(())
    }

    /// Set queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set worker poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set statistics report interval
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set high/low proximity tolerance
    pub fn with_proximity(mut self, proximity: f64) -> Self {
        self.proximity = proximity;
        self
    }

    /// Set the underlying contract id
    pub fn with_underlying(mut self, underlying: ContractId) -> Self {
        self.underlying = underlying;
        self
    }

    pub fn with_strike_increment(mut self, increment: f64) -> Self {
        self.strike_increment = increment;
        self
    }

    pub fn with_session(mut self, session: SessionHours) -> Self {
        self.session = session;
        self
    }

    /// Set outcome lookahead
    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.outcome.lookahead = lookahead;
        self
    }

    pub fn with_outcome(mut self, outcome: OutcomeConfig) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_maturity(mut self, maturity: Maturity) -> Self {
        self.maturity = maturity;
        self
    }

    pub fn classifier(&self) -> Classifier {
        Classifier {
            session: self.session,
            underlying: self.underlying,
            strike_increment: self.strike_increment,
            proximity: self.proximity,
        }
    }

    pub fn evaluator(&self) -> OutcomeEvaluator {
        OutcomeEvaluator::new(self.outcome)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key, %value, ?default, "invalid config value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_pipeline_config_from_lookup_defaults() {
        let actual = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(actual, PipelineConfig::default());
    }

    #[test]
    fn test_pipeline_config_from_lookup() {
        let actual = PipelineConfig::from_lookup(lookup(&[
            ("FLOW_QUEUE_CAPACITY", "64"),
            ("FLOW_POLL_INTERVAL_MS", "250"),
            ("FLOW_LOOKAHEAD_SECS", "900"),
            ("FLOW_PROXIMITY", "0.0025"),
            ("FLOW_UNDERLYING_ID", "1"),
            ("FLOW_SESSION_TZ", "America/Chicago"),
            ("FLOW_SESSION_OPEN", "08:30"),
            ("FLOW_SESSION_CLOSE", "15:00"),
            ("FLOW_MATURITY", "market"),
            ("FLOW_WIN_PCT", "50"),
        ]))
        .unwrap();

        let expected = PipelineConfig::default()
            .with_queue_capacity(64)
            .with_poll_interval(Duration::from_millis(250))
            .with_lookahead(Duration::from_secs(900))
            .with_proximity(0.0025)
            .with_underlying(ContractId(1))
            .with_session(SessionHours::parse("America/Chicago", "08:30", "15:00").unwrap())
            .with_maturity(Maturity::MarketTime)
            .with_outcome(OutcomeConfig {
                lookahead: Duration::from_secs(900),
                win_pct: 50.0,
                ..OutcomeConfig::default()
            });

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_pipeline_config_from_lookup_invalid() {
        struct TestCase {
            input: Vec<(&'static str, &'static str)>,
            expected: Result<usize, ()>,
        }

        let tests = vec![
            TestCase {
                // TC0: unparsable number falls back to the default
                input: vec![("FLOW_QUEUE_CAPACITY", "lots")],
                expected: Ok(10_000),
            },
            TestCase {
                // TC1: unknown time zone is an error
                input: vec![("FLOW_SESSION_TZ", "Nowhere/Special")],
                expected: Err(()),
            },
            TestCase {
                // TC2: unknown maturity mode is an error
                input: vec![("FLOW_MATURITY", "eventually")],
                expected: Err(()),
            },
            TestCase {
                // TC3: zero report interval is an error
                input: vec![("FLOW_REPORT_INTERVAL_SECS", "0")],
                expected: Err(()),
            },
            TestCase {
                // TC4: zero poll interval is an error
                input: vec![("FLOW_POLL_INTERVAL_MS", "0")],
                expected: Err(()),
            },
            TestCase {
                // TC5: negative strike increment is an error
                input: vec![("FLOW_STRIKE_INCREMENT", "-5")],
                expected: Err(()),
            },
            TestCase {
                // TC6: zero strike increment is an error
                input: vec![("FLOW_STRIKE_INCREMENT", "0")],
                expected: Err(()),
            },
            TestCase {
                // TC7: non-finite strike increment is an error
                input: vec![("FLOW_STRIKE_INCREMENT", "NaN")],
                expected: Err(()),
            },
            TestCase {
                // TC8: negative proximity is an error
                input: vec![("FLOW_PROXIMITY", "-0.001")],
                expected: Err(()),
            },
            TestCase {
                // TC9: zero proximity only matches exact highs and lows
                input: vec![("FLOW_PROXIMITY", "0"), ("FLOW_QUEUE_CAPACITY", "8")],
                expected: Ok(8),
            },
            TestCase {
                // TC10: zero lookahead is an error
                input: vec![("FLOW_LOOKAHEAD_SECS", "0")],
                expected: Err(()),
            },
            TestCase {
                // TC11: negative win threshold is an error
                input: vec![("FLOW_WIN_PCT", "-60")],
                expected: Err(()),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = PipelineConfig::from_lookup(lookup(&test.input))
                .map(|config| config.queue_capacity)
                .map_err(|_| ());
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_pipeline_config_validate() {
        struct TestCase {
            input: PipelineConfig,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: defaults are valid
                input: PipelineConfig::default(),
                expected: true,
            },
            TestCase {
                // TC1: zero report interval
                input: PipelineConfig::default().with_report_interval(Duration::ZERO),
                expected: false,
            },
            TestCase {
                // TC2: zero poll interval
                input: PipelineConfig::default().with_poll_interval(Duration::ZERO),
                expected: false,
            },
            TestCase {
                // TC3: negative strike increment
                input: PipelineConfig::default().with_strike_increment(-5.0),
                expected: false,
            },
            TestCase {
                // TC4: infinite strike increment
                input: PipelineConfig::default().with_strike_increment(f64::INFINITY),
                expected: false,
            },
            TestCase {
                // TC5: negative proximity
                input: PipelineConfig::default().with_proximity(-0.001),
                expected: false,
            },
            TestCase {
                // TC6: NaN proximity
                input: PipelineConfig::default().with_proximity(f64::NAN),
                expected: false,
            },
            TestCase {
                // TC7: zero stop loss
                input: PipelineConfig::default().with_outcome(OutcomeConfig {
                    stop_loss_pct: 0.0,
                    ..OutcomeConfig::default()
                }),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.validate();
            assert_eq!(actual.is_ok(), test.expected, "TC{} failed", index);
            if let Err(error) = actual {
                assert!(
                    matches!(error, FlowError::Config(_)),
                    "TC{} failed",
                    index
                );
            }
        }
    }

    #[test]
    fn test_maturity_from_str() {
        assert_eq!("wall".parse::<Maturity>(), Ok(Maturity::WallClock));
        assert_eq!("MARKET".parse::<Maturity>(), Ok(Maturity::MarketTime));
        assert!("soon".parse::<Maturity>().is_err());
    }
}
