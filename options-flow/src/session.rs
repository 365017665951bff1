use crate::{
    error::FlowError,
    tags::{Tag, TimeOfDay},
};
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

/// Regular trading hours of the exchange, in its local time zone.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SessionHours {
    pub tz: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for SessionHours {
    fn default() -> Self {
        Self {
            tz: chrono_tz::America::New_York,
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
        }
    }
}

impl SessionHours {
    const SLOT_SECS: i64 = 60 * 60;

    pub fn new(tz: Tz, open: NaiveTime, close: NaiveTime) -> Result<Self, FlowError> {
        if close <= open {
            return Err(FlowError::Config(format!(
                "session close {close} must be after open {open}"
            )));
        }

        let slots = ((close - open).num_seconds() + Self::SLOT_SECS - 1) / Self::SLOT_SECS;
        if slots as usize > TimeOfDay::ALL.len() {
            return Err(FlowError::Config(format!(
                "session {open}-{close} spans {slots} hourly slots, at most {} are supported",
                TimeOfDay::ALL.len()
            )));
        }

        Ok(Self { tz, open, close })
    }

    /// Parse an IANA time zone name and `HH:MM` open and close times.
    pub fn parse(tz: &str, open: &str, close: &str) -> Result<Self, FlowError> {
        let tz = tz
            .parse::<Tz>()
            .map_err(|error| FlowError::Config(format!("time zone {tz}: {error}")))?;

        let parse_time = |value: &str| {
            NaiveTime::parse_from_str(value, "%H:%M")
                .map_err(|error| FlowError::Config(format!("session time {value}: {error}")))
        };

        Self::new(tz, parse_time(open)?, parse_time(close)?)
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        let local = time.with_timezone(&self.tz).time();
        local >= self.open && local < self.close
    }

    /// Hourly session slot `time` falls in. Times outside `[open, close)` are rejected.
    pub fn time_of_day(&self, time: DateTime<Utc>) -> Result<TimeOfDay, FlowError> {
        let local = time.with_timezone(&self.tz).time();
        if local < self.open || local >= self.close {
            return Err(FlowError::OutsideSession { time });
        }

        let slot = (local - self.open).num_seconds() / Self::SLOT_SECS;
        TimeOfDay::from_ordinal(slot as usize).ok_or(FlowError::OutsideSession { time })
    }
}
