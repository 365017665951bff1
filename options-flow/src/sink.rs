//! Persistence boundary. The pipeline notifies a [`PersistenceHook`] of everything it produces,
//! and never depends on the hook succeeding.

use crate::{
    alert::Alert,
    bar::Bar,
    error::FlowError,
    outcome::AlertOutcome,
    tag_stats::{TagStatEntry, TagStatsSnapshot},
    tags::{AlertTags, TagDimension, TagValue},
    timeframe::Timeframe,
};
use fnv::FnvHashMap;

/// Observer of pipeline output, typically mirroring it into an external store.
///
/// Bar and alert notifications run on the ingestion path and must return quickly. Errors are
/// logged by the caller and otherwise ignored.
pub trait PersistenceHook: Send + Sync {
    fn on_bar(&self, _timeframe: Timeframe, _bar: &Bar) -> Result<(), FlowError> {
        Ok(())
    }

    fn on_alert(&self, _alert: &Alert) -> Result<(), FlowError> {
        Ok(())
    }

    fn on_outcome(
        &self,
        _alert: &Alert,
        _outcome: &AlertOutcome,
        _entry: &TagStatEntry,
    ) -> Result<(), FlowError> {
        Ok(())
    }

    fn on_snapshot(&self, _snapshot: &TagStatsSnapshot) -> Result<(), FlowError> {
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct NoopHook;

impl PersistenceHook for NoopHook {}

/// Read-only mapping between tag values and compact integer ids, built once and handed to
/// the storage layer.
#[derive(Debug, Clone)]
pub struct TagIdTable {
    ids: FnvHashMap<TagValue, u16>,
    values: Vec<TagValue>,
}

impl Default for TagIdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TagIdTable {
    const BITS_PER_DIMENSION: u32 = 4;
    const DIMENSION_MASK: u64 = (1 << Self::BITS_PER_DIMENSION) - 1;

    pub fn new() -> Self {
        let values = TagValue::all().collect::<Vec<_>>();
        let ids = values
            .iter()
            .enumerate()
            .map(|(id, value)| (*value, id as u16))
            .collect();

        Self { ids, values }
    }

    pub fn id(&self, value: &TagValue) -> Result<u16, FlowError> {
        self.ids
            .get(value)
            .copied()
            .ok_or_else(|| FlowError::InvalidTagKey(value.to_string()))
    }

    pub fn value(&self, id: u16) -> Option<TagValue> {
        self.values.get(usize::from(id)).copied()
    }

    /// Id of every dimension value of `tags`, in [`TagDimension::ALL`] order.
    pub fn ids(&self, tags: &AlertTags) -> Result<[u16; TagDimension::COUNT], FlowError> {
        let mut ids = [0; TagDimension::COUNT];
        for (slot, value) in ids.iter_mut().zip(tags.values()) {
            *slot = self.id(&value)?;
        }
        Ok(ids)
    }

    /// Every `(id, value)` pair, for writing the table out alongside persisted ids.
    pub fn entries(&self) -> impl Iterator<Item = (u16, TagValue)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(id, value)| (id as u16, *value))
    }

    /// Pack `tags` into a bitmask with four bits per dimension, dimension `n` at bit `4n`.
    pub fn pack(&self, tags: &AlertTags) -> u64 {
        tags.values()
            .iter()
            .enumerate()
            .fold(0, |packed, (index, value)| {
                packed | ((value.ordinal() as u64) << (index as u32 * Self::BITS_PER_DIMENSION))
            })
    }

    pub fn unpack(&self, packed: u64) -> Result<AlertTags, FlowError> {
        let invalid = || FlowError::InvalidTagKey(format!("{packed:#x}"));

        let used_bits = TagDimension::COUNT as u32 * Self::BITS_PER_DIMENSION;
        if packed >> used_bits != 0 {
            return Err(invalid());
        }

        let values = TagDimension::ALL
            .into_iter()
            .map(|dimension| {
                let shift = dimension.ordinal() as u32 * Self::BITS_PER_DIMENSION;
                let ordinal = ((packed >> shift) & Self::DIMENSION_MASK) as usize;
                TagValue::from_parts(dimension, ordinal).ok_or_else(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let [
            TagValue::OptionType(option_type),
            TagValue::Timeframe(timeframe),
            TagValue::Moneyness(moneyness),
            TagValue::TimeOfDay(time_of_day),
            TagValue::VolumeStdev(volume_stdev),
            TagValue::VolumeThreshold(volume_threshold),
            TagValue::UnderlyingPriceDelta(underlying_price_delta),
            TagValue::OptionPriceDelta(option_price_delta),
            TagValue::UnderlyingDailyHighLow(underlying_daily_hl),
            TagValue::UnderlyingLocalHighLow(underlying_local_hl),
            TagValue::OptionDailyHighLow(option_daily_hl),
            TagValue::OptionLocalHighLow(option_local_hl),
        ] = values[..]
        else {
            return Err(invalid());
        };

        Ok(AlertTags {
            option_type,
            timeframe,
            moneyness,
            time_of_day,
            volume_stdev,
            volume_threshold,
            underlying_price_delta,
            option_price_delta,
            underlying_daily_hl,
            underlying_local_hl,
            option_daily_hl,
            option_local_hl,
        })
    }
}
