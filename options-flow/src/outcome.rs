use crate::{bar::Bar, error::FlowError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scoring of an alert's subsequent price action.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum WinClass {
    Loss,
    Partial,
    Win,
}

impl WinClass {
    /// Win units credited to statistics: 0, 0.5 or 1.
    pub fn units(&self) -> f64 {
        match self {
            WinClass::Loss => 0.0,
            WinClass::Partial => 0.5,
            WinClass::Win => 1.0,
        }
    }

    pub fn is_win(&self) -> bool {
        !matches!(self, WinClass::Loss)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct AlertOutcome {
    pub win_class: WinClass,
    /// Best percent move above the reference price, `0.0` for a loss.
    pub percent_move: f64,
}

impl AlertOutcome {
    pub fn new(win_class: WinClass, percent_move: f64) -> Self {
        Self {
            win_class,
            percent_move,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OutcomeConfig {
    /// How long after the alert its outcome is measured over.
    pub lookahead: Duration,
    /// Drawdown, in percent, that stops the scan.
    pub stop_loss_pct: f64,
    /// Move, in percent, that counts as a full win.
    pub win_pct: f64,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            lookahead: Duration::from_secs(30 * 60),
            stop_loss_pct: 30.0,
            win_pct: 60.0,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct OutcomeEvaluator {
    pub config: OutcomeConfig,
}

impl OutcomeEvaluator {
    pub fn new(config: OutcomeConfig) -> Self {
        Self { config }
    }

    pub fn lookahead(&self) -> TimeDelta {
        TimeDelta::seconds(self.config.lookahead.as_secs() as i64)
    }

    /// Score the base bars following an alert.
    ///
    /// Bars before `reference_time` or after the lookahead are ignored. The scan stops at the
    /// first bar whose low breaches the stop loss, without counting that bar's high.
    pub fn evaluate(
        &self,
        reference_price: f64,
        reference_time: DateTime<Utc>,
        window: &[Bar],
    ) -> Result<AlertOutcome, FlowError> {
        if reference_price.is_nan() || reference_price <= 0.0 {
            return Err(FlowError::InvalidReferencePrice(reference_price));
        }
        if window.is_empty() {
            return Err(FlowError::EmptyWindow);
        }

        let start = window
            .iter()
            .position(|bar| bar.timestamp >= reference_time)
            .ok_or(FlowError::NoBarsAfterReference { reference_time })?;

        let horizon = reference_time + self.lookahead();
        let mut max_price = reference_price;
        let mut min_price = reference_price;

        for bar in window[start..].iter().take_while(|bar| bar.timestamp < horizon) {
            min_price = min_price.min(bar.low);
            let drawdown_pct = (min_price - reference_price) * 100.0 / reference_price;
            if drawdown_pct <= -self.config.stop_loss_pct {
                break;
            }
            max_price = max_price.max(bar.high);
        }

        let percent_move = (max_price - reference_price) * 100.0 / reference_price;

        let outcome = if percent_move <= 0.0 {
            AlertOutcome::new(WinClass::Loss, 0.0)
        } else if percent_move < self.config.win_pct {
            AlertOutcome::new(WinClass::Partial, percent_move)
        } else {
            AlertOutcome::new(WinClass::Win, percent_move)
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractId;
    use chrono::TimeZone;

    fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 12, 14, 0, 0).unwrap()
    }

    fn bar(offset_secs: i64, high: f64, low: f64) -> Bar {
        Bar::new(
            ContractId(4500),
            reference_time() + TimeDelta::seconds(offset_secs),
            low,
            high,
            low,
            high,
            100.0,
        )
    }

    fn flat(reference_price: f64, count: i64) -> Vec<Bar> {
        (0..count)
            .map(|index| bar(index * 5, reference_price, reference_price))
            .collect()
    }

    #[test]
    fn test_outcome_evaluator_evaluate() {
        struct TestCase {
            input: (f64, Vec<Bar>),
            expected: Result<AlertOutcome, FlowError>,
        }

        let tests = vec![
            TestCase {
                // TC0: flat window is a loss with no move
                input: (10.0, flat(10.0, 360)),
                expected: Ok(AlertOutcome::new(WinClass::Loss, 0.0)),
            },
            TestCase {
                // TC1: max reaches +75%
                input: (2.0, vec![bar(0, 2.2, 1.9), bar(5, 3.5, 2.0), bar(10, 3.0, 2.5)]),
                expected: Ok(AlertOutcome::new(WinClass::Win, 75.0)),
            },
            TestCase {
                // TC2: max reaches only +40%
                input: (10.0, vec![bar(0, 12.0, 9.0), bar(600, 14.0, 11.0)]),
                expected: Ok(AlertOutcome::new(WinClass::Partial, 40.0)),
            },
            TestCase {
                // TC3: exactly the win threshold is a full win
                input: (10.0, vec![bar(0, 16.0, 10.0)]),
                expected: Ok(AlertOutcome::new(WinClass::Win, 60.0)),
            },
            TestCase {
                // TC4: price only falls
                input: (10.0, vec![bar(0, 9.5, 8.0), bar(5, 9.0, 7.5)]),
                expected: Ok(AlertOutcome::new(WinClass::Loss, 0.0)),
            },
            TestCase {
                // TC5: stop loss breach ignores the breaching bar's high and everything after
                input: (
                    10.0,
                    vec![bar(0, 12.0, 9.5), bar(5, 20.0, 6.9), bar(10, 30.0, 10.0)],
                ),
                expected: Ok(AlertOutcome::new(WinClass::Partial, 20.0)),
            },
            TestCase {
                // TC6: bars before the reference time are skipped
                input: (10.0, vec![bar(-5, 30.0, 10.0), bar(0, 11.0, 10.0)]),
                expected: Ok(AlertOutcome::new(WinClass::Partial, 10.0)),
            },
            TestCase {
                // TC7: bars past the lookahead are ignored
                input: (10.0, vec![bar(0, 10.0, 10.0), bar(1800, 30.0, 10.0)]),
                expected: Ok(AlertOutcome::new(WinClass::Loss, 0.0)),
            },
            TestCase {
                // TC8: empty window
                input: (10.0, vec![]),
                expected: Err(FlowError::EmptyWindow),
            },
            TestCase {
                // TC9: no bar at or after the reference time
                input: (10.0, vec![bar(-10, 11.0, 10.0), bar(-5, 11.0, 10.0)]),
                expected: Err(FlowError::NoBarsAfterReference {
                    reference_time: reference_time(),
                }),
            },
            TestCase {
                // TC10: non-positive reference price
                input: (0.0, flat(10.0, 2)),
                expected: Err(FlowError::InvalidReferencePrice(0.0)),
            },
        ];

        let evaluator = OutcomeEvaluator::default();

        for (index, test) in tests.into_iter().enumerate() {
            let (reference_price, window) = test.input;
            let actual = evaluator.evaluate(reference_price, reference_time(), &window);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_outcome_evaluator_custom_thresholds() {
        let evaluator = OutcomeEvaluator::new(OutcomeConfig {
            lookahead: Duration::from_secs(60),
            stop_loss_pct: 10.0,
            win_pct: 20.0,
        });

        // TC0: 25% move is a win with a 20% threshold
        let actual = evaluator.evaluate(4.0, reference_time(), &[bar(0, 5.0, 4.0)]);
        assert_eq!(actual, Ok(AlertOutcome::new(WinClass::Win, 25.0)));

        // TC1: 10% drawdown trips the tighter stop
        let actual = evaluator.evaluate(
            10.0,
            reference_time(),
            &[bar(0, 10.5, 9.0), bar(5, 15.0, 10.0)],
        );
        assert_eq!(actual, Ok(AlertOutcome::new(WinClass::Loss, 0.0)));
    }
}
