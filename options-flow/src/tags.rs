use crate::timeframe::Timeframe;
use serde::{Deserialize, Serialize};

/// Categorical value of one [`AlertTags`] dimension.
pub trait Tag: Copy + Eq + 'static {
    /// Every value, in ordinal order.
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn ordinal(&self) -> usize;

    fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum OptionType {
    Call,
    Put,
}

impl Tag for OptionType {
    const ALL: &'static [Self] = &[OptionType::Call, OptionType::Put];

    fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl Tag for Timeframe {
    const ALL: &'static [Self] = &Timeframe::ALL;

    fn as_str(&self) -> &'static str {
        Timeframe::as_str(self)
    }

    fn ordinal(&self) -> usize {
        Timeframe::ordinal(self)
    }
}

/// Distance of the strike from the underlying price, in strike increments.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum Moneyness {
    DeepItm,
    Itm4,
    Itm3,
    Itm2,
    Itm1,
    Atm,
    Otm1,
    Otm2,
    Otm3,
    Otm4,
    DeepOtm,
}

impl Moneyness {
    /// Bucket a whole number of strike increments between strike and underlying.
    pub fn from_strikes(in_the_money: bool, strikes: u32) -> Self {
        match (in_the_money, strikes) {
            (_, 0) => Moneyness::Atm,
            (true, 1) => Moneyness::Itm1,
            (true, 2) => Moneyness::Itm2,
            (true, 3) => Moneyness::Itm3,
            (true, 4) => Moneyness::Itm4,
            (true, _) => Moneyness::DeepItm,
            (false, 1) => Moneyness::Otm1,
            (false, 2) => Moneyness::Otm2,
            (false, 3) => Moneyness::Otm3,
            (false, 4) => Moneyness::Otm4,
            (false, _) => Moneyness::DeepOtm,
        }
    }

    /// Same distance on the opposite side of at-the-money.
    pub fn mirror(&self) -> Self {
        match self {
            Moneyness::DeepItm => Moneyness::DeepOtm,
            Moneyness::Itm4 => Moneyness::Otm4,
            Moneyness::Itm3 => Moneyness::Otm3,
            Moneyness::Itm2 => Moneyness::Otm2,
            Moneyness::Itm1 => Moneyness::Otm1,
            Moneyness::Atm => Moneyness::Atm,
            Moneyness::Otm1 => Moneyness::Itm1,
            Moneyness::Otm2 => Moneyness::Itm2,
            Moneyness::Otm3 => Moneyness::Itm3,
            Moneyness::Otm4 => Moneyness::Itm4,
            Moneyness::DeepOtm => Moneyness::DeepItm,
        }
    }
}

impl Tag for Moneyness {
    const ALL: &'static [Self] = &[
        Moneyness::DeepItm,
        Moneyness::Itm4,
        Moneyness::Itm3,
        Moneyness::Itm2,
        Moneyness::Itm1,
        Moneyness::Atm,
        Moneyness::Otm1,
        Moneyness::Otm2,
        Moneyness::Otm3,
        Moneyness::Otm4,
        Moneyness::DeepOtm,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Moneyness::DeepItm => "deep_itm",
            Moneyness::Itm4 => "itm4",
            Moneyness::Itm3 => "itm3",
            Moneyness::Itm2 => "itm2",
            Moneyness::Itm1 => "itm1",
            Moneyness::Atm => "atm",
            Moneyness::Otm1 => "otm1",
            Moneyness::Otm2 => "otm2",
            Moneyness::Otm3 => "otm3",
            Moneyness::Otm4 => "otm4",
            Moneyness::DeepOtm => "deep_otm",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// One hour slot of the trading session, `Slot1` starting at the open.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum TimeOfDay {
    Slot1,
    Slot2,
    Slot3,
    Slot4,
    Slot5,
    Slot6,
    Slot7,
}

impl Tag for TimeOfDay {
    const ALL: &'static [Self] = &[
        TimeOfDay::Slot1,
        TimeOfDay::Slot2,
        TimeOfDay::Slot3,
        TimeOfDay::Slot4,
        TimeOfDay::Slot5,
        TimeOfDay::Slot6,
        TimeOfDay::Slot7,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Slot1 => "slot1",
            TimeOfDay::Slot2 => "slot2",
            TimeOfDay::Slot3 => "slot3",
            TimeOfDay::Slot4 => "slot4",
            TimeOfDay::Slot5 => "slot5",
            TimeOfDay::Slot6 => "slot6",
            TimeOfDay::Slot7 => "slot7",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// Bar volume measured in standard deviations from the running mean.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum VolumeStdev {
    LowVol,
    Over1,
    Over2,
    Over3,
    Over4,
}

impl VolumeStdev {
    pub fn from_std_dev(std_devs: f64) -> Self {
        match std_devs {
            x if x <= 1.0 => VolumeStdev::LowVol,
            x if x <= 2.0 => VolumeStdev::Over1,
            x if x <= 3.0 => VolumeStdev::Over2,
            x if x <= 4.0 => VolumeStdev::Over3,
            _ => VolumeStdev::Over4,
        }
    }
}

impl Tag for VolumeStdev {
    const ALL: &'static [Self] = &[
        VolumeStdev::LowVol,
        VolumeStdev::Over1,
        VolumeStdev::Over2,
        VolumeStdev::Over3,
        VolumeStdev::Over4,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            VolumeStdev::LowVol => "low_vol",
            VolumeStdev::Over1 => "over1",
            VolumeStdev::Over2 => "over2",
            VolumeStdev::Over3 => "over3",
            VolumeStdev::Over4 => "over4",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// Raw bar volume bucket.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum VolumeThreshold {
    LowVol,
    Vol100,
    Vol250,
    Vol500,
    Vol1000,
}

impl VolumeThreshold {
    pub fn from_volume(volume: f64) -> Self {
        match volume {
            v if v <= 100.0 => VolumeThreshold::LowVol,
            v if v <= 250.0 => VolumeThreshold::Vol100,
            v if v <= 500.0 => VolumeThreshold::Vol250,
            v if v <= 1000.0 => VolumeThreshold::Vol500,
            _ => VolumeThreshold::Vol1000,
        }
    }
}

impl Tag for VolumeThreshold {
    const ALL: &'static [Self] = &[
        VolumeThreshold::LowVol,
        VolumeThreshold::Vol100,
        VolumeThreshold::Vol250,
        VolumeThreshold::Vol500,
        VolumeThreshold::Vol1000,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            VolumeThreshold::LowVol => "low_vol",
            VolumeThreshold::Vol100 => "vol100",
            VolumeThreshold::Vol250 => "vol250",
            VolumeThreshold::Vol500 => "vol500",
            VolumeThreshold::Vol1000 => "vol1000",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// Bar price range measured in standard deviations from the running mean.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum PriceDelta {
    Under1,
    Under2,
    Over2,
}

impl PriceDelta {
    pub fn from_std_dev(std_devs: f64) -> Self {
        match std_devs {
            x if x < 1.0 => PriceDelta::Under1,
            x if x < 2.0 => PriceDelta::Under2,
            _ => PriceDelta::Over2,
        }
    }
}

impl Tag for PriceDelta {
    const ALL: &'static [Self] = &[PriceDelta::Under1, PriceDelta::Under2, PriceDelta::Over2];

    fn as_str(&self) -> &'static str {
        match self {
            PriceDelta::Under1 => "under1",
            PriceDelta::Under2 => "under2",
            PriceDelta::Over2 => "over2",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// Price position relative to the session high and low.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum DailyHighLow {
    NearDailyLow,
    NearDailyHigh,
    Inside,
}

impl DailyHighLow {
    /// Near-low takes priority when a narrow range puts the price near both extremes.
    pub fn from_flags(near_low: bool, near_high: bool) -> Self {
        match (near_low, near_high) {
            (true, _) => DailyHighLow::NearDailyLow,
            (false, true) => DailyHighLow::NearDailyHigh,
            (false, false) => DailyHighLow::Inside,
        }
    }
}

impl Tag for DailyHighLow {
    const ALL: &'static [Self] = &[
        DailyHighLow::NearDailyLow,
        DailyHighLow::NearDailyHigh,
        DailyHighLow::Inside,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            DailyHighLow::NearDailyLow => "ndl",
            DailyHighLow::NearDailyHigh => "ndh",
            DailyHighLow::Inside => "inside",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// Price position relative to the last committed 30 minute high and low.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum LocalHighLow {
    NearLocalLow,
    NearLocalHigh,
    Inside,
}

impl LocalHighLow {
    /// Near-low takes priority when a narrow range puts the price near both extremes.
    pub fn from_flags(near_low: bool, near_high: bool) -> Self {
        match (near_low, near_high) {
            (true, _) => LocalHighLow::NearLocalLow,
            (false, true) => LocalHighLow::NearLocalHigh,
            (false, false) => LocalHighLow::Inside,
        }
    }
}

impl Tag for LocalHighLow {
    const ALL: &'static [Self] = &[
        LocalHighLow::NearLocalLow,
        LocalHighLow::NearLocalHigh,
        LocalHighLow::Inside,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            LocalHighLow::NearLocalLow => "nll",
            LocalHighLow::NearLocalHigh => "nlh",
            LocalHighLow::Inside => "inside",
        }
    }

    fn ordinal(&self) -> usize {
        *self as usize
    }
}

/// Full classification of an anomalous bar. Used as an exact-match statistics key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct AlertTags {
    pub option_type: OptionType,
    pub timeframe: Timeframe,
    pub moneyness: Moneyness,
    pub time_of_day: TimeOfDay,
    pub volume_stdev: VolumeStdev,
    pub volume_threshold: VolumeThreshold,
    pub underlying_price_delta: PriceDelta,
    pub option_price_delta: PriceDelta,
    pub underlying_daily_hl: DailyHighLow,
    pub underlying_local_hl: LocalHighLow,
    pub option_daily_hl: DailyHighLow,
    pub option_local_hl: LocalHighLow,
}

impl AlertTags {
    /// Project the value of a single dimension.
    pub fn project(&self, dimension: TagDimension) -> TagValue {
        match dimension {
            TagDimension::OptionType => TagValue::OptionType(self.option_type),
            TagDimension::Timeframe => TagValue::Timeframe(self.timeframe),
            TagDimension::Moneyness => TagValue::Moneyness(self.moneyness),
            TagDimension::TimeOfDay => TagValue::TimeOfDay(self.time_of_day),
            TagDimension::VolumeStdev => TagValue::VolumeStdev(self.volume_stdev),
            TagDimension::VolumeThreshold => TagValue::VolumeThreshold(self.volume_threshold),
            TagDimension::UnderlyingPriceDelta => {
                TagValue::UnderlyingPriceDelta(self.underlying_price_delta)
            }
            TagDimension::OptionPriceDelta => TagValue::OptionPriceDelta(self.option_price_delta),
            TagDimension::UnderlyingDailyHighLow => {
                TagValue::UnderlyingDailyHighLow(self.underlying_daily_hl)
            }
            TagDimension::UnderlyingLocalHighLow => {
                TagValue::UnderlyingLocalHighLow(self.underlying_local_hl)
            }
            TagDimension::OptionDailyHighLow => TagValue::OptionDailyHighLow(self.option_daily_hl),
            TagDimension::OptionLocalHighLow => TagValue::OptionLocalHighLow(self.option_local_hl),
        }
    }

    /// Every dimension value of these tags, in [`TagDimension::ALL`] order.
    pub fn values(&self) -> [TagValue; TagDimension::COUNT] {
        TagDimension::ALL.map(|dimension| self.project(dimension))
    }
}

/// One of the twelve [`AlertTags`] dimensions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum TagDimension {
    OptionType,
    Timeframe,
    Moneyness,
    TimeOfDay,
    VolumeStdev,
    VolumeThreshold,
    UnderlyingPriceDelta,
    OptionPriceDelta,
    UnderlyingDailyHighLow,
    UnderlyingLocalHighLow,
    OptionDailyHighLow,
    OptionLocalHighLow,
}

impl TagDimension {
    pub const COUNT: usize = 12;

    pub const ALL: [TagDimension; Self::COUNT] = [
        TagDimension::OptionType,
        TagDimension::Timeframe,
        TagDimension::Moneyness,
        TagDimension::TimeOfDay,
        TagDimension::VolumeStdev,
        TagDimension::VolumeThreshold,
        TagDimension::UnderlyingPriceDelta,
        TagDimension::OptionPriceDelta,
        TagDimension::UnderlyingDailyHighLow,
        TagDimension::UnderlyingLocalHighLow,
        TagDimension::OptionDailyHighLow,
        TagDimension::OptionLocalHighLow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagDimension::OptionType => "option_type",
            TagDimension::Timeframe => "timeframe",
            TagDimension::Moneyness => "moneyness",
            TagDimension::TimeOfDay => "time_of_day",
            TagDimension::VolumeStdev => "volume_stdev",
            TagDimension::VolumeThreshold => "volume_threshold",
            TagDimension::UnderlyingPriceDelta => "underlying_price_delta",
            TagDimension::OptionPriceDelta => "option_price_delta",
            TagDimension::UnderlyingDailyHighLow => "underlying_daily_hl",
            TagDimension::UnderlyingLocalHighLow => "underlying_local_hl",
            TagDimension::OptionDailyHighLow => "option_daily_hl",
            TagDimension::OptionLocalHighLow => "option_local_hl",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dimension| dimension.as_str() == s)
    }

    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// Number of distinct values this dimension can take.
    pub fn cardinality(&self) -> usize {
        match self {
            TagDimension::OptionType => OptionType::ALL.len(),
            TagDimension::Timeframe => <Timeframe as Tag>::ALL.len(),
            TagDimension::Moneyness => Moneyness::ALL.len(),
            TagDimension::TimeOfDay => TimeOfDay::ALL.len(),
            TagDimension::VolumeStdev => VolumeStdev::ALL.len(),
            TagDimension::VolumeThreshold => VolumeThreshold::ALL.len(),
            TagDimension::UnderlyingPriceDelta | TagDimension::OptionPriceDelta => {
                PriceDelta::ALL.len()
            }
            TagDimension::UnderlyingDailyHighLow | TagDimension::OptionDailyHighLow => {
                DailyHighLow::ALL.len()
            }
            TagDimension::UnderlyingLocalHighLow | TagDimension::OptionLocalHighLow => {
                LocalHighLow::ALL.len()
            }
        }
    }
}

impl std::fmt::Display for TagDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dimension value, keyed by the dimension it came from.
///
/// The price delta and high/low enums are shared between the underlying and option dimensions,
/// so the variant, not the inner type, identifies the dimension.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum TagValue {
    OptionType(OptionType),
    Timeframe(Timeframe),
    Moneyness(Moneyness),
    TimeOfDay(TimeOfDay),
    VolumeStdev(VolumeStdev),
    VolumeThreshold(VolumeThreshold),
    UnderlyingPriceDelta(PriceDelta),
    OptionPriceDelta(PriceDelta),
    UnderlyingDailyHighLow(DailyHighLow),
    UnderlyingLocalHighLow(LocalHighLow),
    OptionDailyHighLow(DailyHighLow),
    OptionLocalHighLow(LocalHighLow),
}

impl TagValue {
    pub fn dimension(&self) -> TagDimension {
        match self {
            TagValue::OptionType(_) => TagDimension::OptionType,
            TagValue::Timeframe(_) => TagDimension::Timeframe,
            TagValue::Moneyness(_) => TagDimension::Moneyness,
            TagValue::TimeOfDay(_) => TagDimension::TimeOfDay,
            TagValue::VolumeStdev(_) => TagDimension::VolumeStdev,
            TagValue::VolumeThreshold(_) => TagDimension::VolumeThreshold,
            TagValue::UnderlyingPriceDelta(_) => TagDimension::UnderlyingPriceDelta,
            TagValue::OptionPriceDelta(_) => TagDimension::OptionPriceDelta,
            TagValue::UnderlyingDailyHighLow(_) => TagDimension::UnderlyingDailyHighLow,
            TagValue::UnderlyingLocalHighLow(_) => TagDimension::UnderlyingLocalHighLow,
            TagValue::OptionDailyHighLow(_) => TagDimension::OptionDailyHighLow,
            TagValue::OptionLocalHighLow(_) => TagDimension::OptionLocalHighLow,
        }
    }

    /// Position of the value within its dimension.
    pub fn ordinal(&self) -> usize {
        match self {
            TagValue::OptionType(value) => value.ordinal(),
            TagValue::Timeframe(value) => Tag::ordinal(value),
            TagValue::Moneyness(value) => value.ordinal(),
            TagValue::TimeOfDay(value) => value.ordinal(),
            TagValue::VolumeStdev(value) => value.ordinal(),
            TagValue::VolumeThreshold(value) => value.ordinal(),
            TagValue::UnderlyingPriceDelta(value) | TagValue::OptionPriceDelta(value) => {
                value.ordinal()
            }
            TagValue::UnderlyingDailyHighLow(value) | TagValue::OptionDailyHighLow(value) => {
                value.ordinal()
            }
            TagValue::UnderlyingLocalHighLow(value) | TagValue::OptionLocalHighLow(value) => {
                value.ordinal()
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagValue::OptionType(value) => value.as_str(),
            TagValue::Timeframe(value) => Tag::as_str(value),
            TagValue::Moneyness(value) => value.as_str(),
            TagValue::TimeOfDay(value) => value.as_str(),
            TagValue::VolumeStdev(value) => value.as_str(),
            TagValue::VolumeThreshold(value) => value.as_str(),
            TagValue::UnderlyingPriceDelta(value) | TagValue::OptionPriceDelta(value) => {
                value.as_str()
            }
            TagValue::UnderlyingDailyHighLow(value) | TagValue::OptionDailyHighLow(value) => {
                value.as_str()
            }
            TagValue::UnderlyingLocalHighLow(value) | TagValue::OptionLocalHighLow(value) => {
                value.as_str()
            }
        }
    }

    /// Rebuild a value from its dimension and ordinal.
    pub fn from_parts(dimension: TagDimension, ordinal: usize) -> Option<Self> {
        let value = match dimension {
            TagDimension::OptionType => TagValue::OptionType(OptionType::from_ordinal(ordinal)?),
            TagDimension::Timeframe => TagValue::Timeframe(Timeframe::from_ordinal(ordinal)?),
            TagDimension::Moneyness => TagValue::Moneyness(Moneyness::from_ordinal(ordinal)?),
            TagDimension::TimeOfDay => TagValue::TimeOfDay(TimeOfDay::from_ordinal(ordinal)?),
            TagDimension::VolumeStdev => {
                TagValue::VolumeStdev(VolumeStdev::from_ordinal(ordinal)?)
            }
            TagDimension::VolumeThreshold => {
                TagValue::VolumeThreshold(VolumeThreshold::from_ordinal(ordinal)?)
            }
            TagDimension::UnderlyingPriceDelta => {
                TagValue::UnderlyingPriceDelta(PriceDelta::from_ordinal(ordinal)?)
            }
            TagDimension::OptionPriceDelta => {
                TagValue::OptionPriceDelta(PriceDelta::from_ordinal(ordinal)?)
            }
            TagDimension::UnderlyingDailyHighLow => {
                TagValue::UnderlyingDailyHighLow(DailyHighLow::from_ordinal(ordinal)?)
            }
            TagDimension::UnderlyingLocalHighLow => {
                TagValue::UnderlyingLocalHighLow(LocalHighLow::from_ordinal(ordinal)?)
            }
            TagDimension::OptionDailyHighLow => {
                TagValue::OptionDailyHighLow(DailyHighLow::from_ordinal(ordinal)?)
            }
            TagDimension::OptionLocalHighLow => {
                TagValue::OptionLocalHighLow(LocalHighLow::from_ordinal(ordinal)?)
            }
        };
        Some(value)
    }

    /// Every value of every dimension.
    pub fn all() -> impl Iterator<Item = TagValue> {
        TagDimension::ALL.into_iter().flat_map(|dimension| {
            (0..dimension.cardinality())
                .filter_map(move |ordinal| TagValue::from_parts(dimension, ordinal))
        })
    }
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.dimension(), self.as_str())
    }
}
