use crate::{
    bar::Bar,
    contract::{ContractId, ContractKind},
    error::FlowError,
    series::BarSeries,
    session::SessionHours,
    tags::{
        AlertTags, DailyHighLow, LocalHighLow, Moneyness, OptionType, PriceDelta, VolumeStdev,
        VolumeThreshold,
    },
    timeframe::Timeframe,
};

/// Maps an anomalous option bar and its market context to [`AlertTags`].
///
/// Classification is pure: the same bar and series state always yield the same tags.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Classifier {
    pub session: SessionHours,
    pub underlying: ContractId,
    pub strike_increment: f64,
    pub proximity: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            session: SessionHours::default(),
            underlying: ContractId(0),
            strike_increment: 5.0,
            proximity: 0.001,
        }
    }
}

impl Classifier {
    pub fn classify(
        &self,
        timeframe: Timeframe,
        bar: &Bar,
        option: &BarSeries,
        underlying: &BarSeries,
    ) -> Result<AlertTags, FlowError> {
        let ContractKind::Option {
            option_type,
            strike,
        } = bar.contract.kind(self.underlying)
        else {
            return Err(FlowError::NotAnOption(bar.contract));
        };

        let underlying_price = underlying
            .last_price()
            .ok_or(FlowError::UnderlyingUnavailable(underlying.contract()))?;

        let time_of_day = self.session.time_of_day(bar.timestamp)?;

        let underlying_range_dev = underlying
            .last_bar(timeframe)
            .map(|last| underlying.range_stat(timeframe).num_std_dev(last.range()))
            .unwrap_or_default();

        let underlying_hl = underlying.high_low_comparisons(underlying_price, self.proximity);
        let option_hl = option.high_low_comparisons(bar.close, self.proximity);

        Ok(AlertTags {
            option_type,
            timeframe,
            moneyness: self.moneyness(option_type, strike, underlying_price),
            time_of_day,
            volume_stdev: VolumeStdev::from_std_dev(
                option.volume_stat(timeframe).num_std_dev(bar.volume),
            ),
            volume_threshold: VolumeThreshold::from_volume(bar.volume),
            underlying_price_delta: PriceDelta::from_std_dev(underlying_range_dev),
            option_price_delta: PriceDelta::from_std_dev(
                option.range_stat(timeframe).num_std_dev(bar.range()),
            ),
            underlying_daily_hl: DailyHighLow::from_flags(
                underlying_hl.near_daily_low,
                underlying_hl.near_daily_high,
            ),
            underlying_local_hl: LocalHighLow::from_flags(
                underlying_hl.near_local_low,
                underlying_hl.near_local_high,
            ),
            option_daily_hl: DailyHighLow::from_flags(
                option_hl.near_daily_low,
                option_hl.near_daily_high,
            ),
            option_local_hl: LocalHighLow::from_flags(
                option_hl.near_local_low,
                option_hl.near_local_high,
            ),
        })
    }

    /// Strikes between the option and the underlying, rounded up, labelled by which side of
    /// the money the option is on. A strike exactly at the underlying is at-the-money.
    pub fn moneyness(&self, option_type: OptionType, strike: f64, underlying: f64) -> Moneyness {
        let strikes = ((underlying - strike).abs() / self.strike_increment).ceil() as u32;

        let in_the_money = match option_type {
            OptionType::Call => underlying > strike,
            OptionType::Put => underlying < strike,
        };

        Moneyness::from_strikes(in_the_money, strikes)
    }
}
