use crate::{contract::ContractId, timeframe::Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `options-flow`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum FlowError {
    #[error("event time {time} is outside the trading session")]
    OutsideSession { time: DateTime<Utc> },

    #[error("outcome window is empty")]
    EmptyWindow,

    #[error("outcome window has no bar at or after reference time {reference_time}")]
    NoBarsAfterReference { reference_time: DateTime<Utc> },

    #[error("reference price must be positive, got {0}")]
    InvalidReferencePrice(f64),

    #[error(
        "cannot derive {timeframe} bar: expected {expected} lower timeframe bars, found {actual}"
    )]
    IncompleteWindow {
        timeframe: Timeframe,
        expected: usize,
        actual: usize,
    },

    #[error("underlying contract {0} has no bars yet")]
    UnderlyingUnavailable(ContractId),

    #[error("contract {0} is not an option contract")]
    NotAnOption(ContractId),

    #[error("contract {0} has never been ingested")]
    UnknownContract(ContractId),

    #[error("pending alert queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("pending alert queue is closed")]
    QueueClosed,

    #[error("tag key not present in id table: {0}")]
    InvalidTagKey(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("persistence sink failed: {0}")]
    Sink(String),
}

impl FlowError {
    /// Determine if an error only discards the single event it was raised for, leaving the
    /// pipeline and its shared aggregates untouched.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_event_scoped(&self) -> bool {
        match self {
            FlowError::QueueClosed | FlowError::Config(_) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_error_is_event_scoped() {
        struct TestCase {
            input: FlowError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: is event scoped w/ FlowError::EmptyWindow
                input: FlowError::EmptyWindow,
                expected: true,
            },
            TestCase {
                // TC1: is event scoped w/ FlowError::OutsideSession
                input: FlowError::OutsideSession {
                    time: DateTime::<Utc>::MIN_UTC,
                },
                expected: true,
            },
            TestCase {
                // TC2: is event scoped w/ FlowError::QueueFull
                input: FlowError::QueueFull { capacity: 1 },
                expected: true,
            },
            TestCase {
                // TC3: is not event scoped w/ FlowError::QueueClosed
                input: FlowError::QueueClosed,
                expected: false,
            },
            TestCase {
                // TC4: is not event scoped w/ FlowError::Config
                input: FlowError::Config("bad timezone".to_string()),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_event_scoped();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
