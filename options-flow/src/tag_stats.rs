use crate::{
    outcome::AlertOutcome,
    tags::{AlertTags, TagDimension, TagValue},
};
use fnv::FnvHashMap;
use itertools::Itertools;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Running win statistics for one statistics key.
#[derive(Debug, Copy, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TagStatEntry {
    pub total_alerts: u64,
    pub total_win_units: f64,
    /// Alerts with a non-zero win class.
    pub winning_alerts: u64,
    /// Mean percent move of winning alerts.
    pub average_win: f64,
    /// `total_win_units / total_alerts`.
    pub win_rate: f64,
}

impl TagStatEntry {
    pub fn record(&mut self, outcome: &AlertOutcome) {
        self.total_alerts += 1;
        self.total_win_units += outcome.win_class.units();

        if outcome.win_class.is_win() {
            self.winning_alerts += 1;
            self.average_win +=
                (outcome.percent_move - self.average_win) / self.winning_alerts as f64;
        }

        self.win_rate = self.total_win_units / self.total_alerts as f64;
    }
}

#[derive(Debug, Default)]
struct StatMaps {
    combinations: FnvHashMap<AlertTags, TagStatEntry>,
    dimensions: [FnvHashMap<TagValue, TagStatEntry>; TagDimension::COUNT],
}

/// Win statistics per exact [`AlertTags`] combination and per single dimension value.
///
/// Every outcome updates the combination entry and all twelve dimension entries under one
/// write lock, so readers always see the thirteen maps in a consistent state.
#[derive(Debug, Default)]
pub struct TagStatistics {
    maps: RwLock<StatMaps>,
}

impl TagStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an outcome into every statistic keyed by `tags`, returning the updated combination
    /// entry.
    pub fn record_outcome(&self, tags: &AlertTags, outcome: &AlertOutcome) -> TagStatEntry {
        let mut maps = self.maps.write();

        let entry = maps.combinations.entry(*tags).or_default();
        entry.record(outcome);
        let updated = *entry;

        maps.dimensions
            .iter_mut()
            .zip(tags.values())
            .for_each(|(map, value)| map.entry(value).or_default().record(outcome));

        updated
    }

    /// Statistics of an exact combination, zeroed if it has never been recorded.
    pub fn lookup(&self, tags: &AlertTags) -> TagStatEntry {
        self.maps
            .read()
            .combinations
            .get(tags)
            .copied()
            .unwrap_or_default()
    }

    /// Statistics of a single dimension value, zeroed if it has never been recorded.
    pub fn lookup_dimension(&self, value: TagValue) -> TagStatEntry {
        self.maps.read().dimensions[value.dimension().ordinal()]
            .get(&value)
            .copied()
            .unwrap_or_default()
    }

    /// Number of distinct combinations recorded.
    pub fn len(&self) -> usize {
        self.maps.read().combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy every entry of all thirteen maps. The read lock is held only while copying.
    pub fn snapshot_all(&self) -> TagStatsSnapshot {
        let (combinations, dimensions) = {
            let maps = self.maps.read();
            let combinations = maps
                .combinations
                .iter()
                .map(|(tags, entry)| (*tags, *entry))
                .collect::<Vec<_>>();
            let dimensions = maps
                .dimensions
                .iter()
                .flat_map(|map| map.iter().map(|(value, entry)| (*value, *entry)))
                .collect::<Vec<_>>();
            (combinations, dimensions)
        };

        TagStatsSnapshot {
            combinations: combinations
                .into_iter()
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .collect(),
            dimensions: dimensions
                .into_iter()
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .collect(),
        }
    }
}

/// Point-in-time copy of [`TagStatistics`], sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TagStatsSnapshot {
    pub combinations: Vec<(AlertTags, TagStatEntry)>,
    pub dimensions: Vec<(TagValue, TagStatEntry)>,
}

impl TagStatsSnapshot {
    /// Total outcomes recorded.
    pub fn total_alerts(&self) -> u64 {
        self.combinations
            .iter()
            .map(|(_, entry)| entry.total_alerts)
            .sum()
    }

    /// Overall win rate across every recorded outcome.
    pub fn overall_win_rate(&self) -> f64 {
        let total = self.total_alerts();
        if total == 0 {
            return 0.0;
        }
        let units = self
            .combinations
            .iter()
            .map(|(_, entry)| entry.total_win_units)
            .sum::<f64>();
        units / total as f64
    }

    /// Entries of one dimension, in value order.
    pub fn dimension(
        &self,
        dimension: TagDimension,
    ) -> impl Iterator<Item = &(TagValue, TagStatEntry)> {
        self.dimensions
            .iter()
            .filter(move |(value, _)| value.dimension() == dimension)
    }

    /// Combinations with at least `min_alerts` outcomes, highest win rate first.
    pub fn top_combinations(
        &self,
        min_alerts: u64,
        limit: usize,
    ) -> Vec<(AlertTags, TagStatEntry)> {
        self.combinations
            .iter()
            .filter(|(_, entry)| entry.total_alerts >= min_alerts)
            .sorted_by(|(_, a), (_, b)| {
                b.win_rate
                    .total_cmp(&a.win_rate)
                    .then(b.total_alerts.cmp(&a.total_alerts))
            })
            .take(limit)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        outcome::WinClass,
        tags::{OptionType, tests::alert_tags},
        timeframe::Timeframe,
    };
    use std::sync::Arc;

    fn outcome(units: f64, percent_move: f64) -> AlertOutcome {
        let win_class = match units {
            u if u >= 1.0 => WinClass::Win,
            u if u > 0.0 => WinClass::Partial,
            _ => WinClass::Loss,
        };
        AlertOutcome::new(win_class, percent_move)
    }

    fn put_tags() -> AlertTags {
        AlertTags {
            option_type: OptionType::Put,
            ..alert_tags()
        }
    }

    fn assert_entry(actual: TagStatEntry, total_alerts: u64, win_rate: f64, average_win: f64) {
        assert_eq!(actual.total_alerts, total_alerts, "{actual:?}");
        assert!((actual.win_rate - win_rate).abs() < 1e-9, "{actual:?}");
        assert!((actual.average_win - average_win).abs() < 1e-9, "{actual:?}");
    }

    fn recorded() -> TagStatistics {
        let stats = TagStatistics::new();

        [(1.0, 100.0), (0.5, 50.0), (1.0, 100.0), (0.5, 50.0), (1.0, 100.0)]
            .into_iter()
            .for_each(|(units, pct)| {
                stats.record_outcome(&alert_tags(), &outcome(units, pct));
            });

        [(0.0, 0.0), (0.0, 0.0), (1.0, 60.0)]
            .into_iter()
            .for_each(|(units, pct)| {
                stats.record_outcome(&put_tags(), &outcome(units, pct));
            });

        stats
    }

    #[test]
    fn test_tag_statistics_combination_entries() {
        let stats = recorded();

        assert_entry(stats.lookup(&alert_tags()), 5, 0.8, 80.0);
        assert_entry(stats.lookup(&put_tags()), 3, 1.0 / 3.0, 60.0);
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_tag_statistics_dimension_entries() {
        struct TestCase {
            input: TagValue,
            expected: (u64, f64, f64),
        }

        let tests = vec![
            TestCase {
                // TC0: call dimension only sees the first combination
                input: TagValue::OptionType(OptionType::Call),
                expected: (5, 0.8, 80.0),
            },
            TestCase {
                // TC1: put dimension only sees the second combination
                input: TagValue::OptionType(OptionType::Put),
                expected: (3, 1.0 / 3.0, 60.0),
            },
            TestCase {
                // TC2: shared timeframe sees all eight outcomes
                input: TagValue::Timeframe(Timeframe::Tier2),
                expected: (8, 5.0 / 8.0, 460.0 / 6.0),
            },
            TestCase {
                // TC3: unseen value is zeroed, not an error
                input: TagValue::Timeframe(Timeframe::Tier4),
                expected: (0, 0.0, 0.0),
            },
        ];

        let stats = recorded();

        for (index, test) in tests.into_iter().enumerate() {
            let actual = stats.lookup_dimension(test.input);
            let (total, win_rate, average_win) = test.expected;
            assert_eq!(actual.total_alerts, total, "TC{} failed", index);
            assert!((actual.win_rate - win_rate).abs() < 1e-9, "TC{} failed", index);
            assert!(
                (actual.average_win - average_win).abs() < 1e-9,
                "TC{} failed",
                index
            );
        }
    }

    #[test]
    fn test_tag_statistics_lookup_missing_is_zero() {
        let stats = TagStatistics::new();
        assert_eq!(stats.lookup(&alert_tags()), TagStatEntry::default());
        assert!(stats.is_empty());
    }

    #[test]
    fn test_tag_statistics_snapshot_all() {
        let snapshot = recorded().snapshot_all();

        assert_eq!(snapshot.combinations.len(), 2);
        assert!(snapshot.combinations.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(snapshot.total_alerts(), 8);
        assert!((snapshot.overall_win_rate() - 5.0 / 8.0).abs() < 1e-12);

        // both tag vectors differ in option type only: 2 option type entries + 11 shared
        assert_eq!(snapshot.dimensions.len(), 13);
        assert_eq!(snapshot.dimension(TagDimension::OptionType).count(), 2);

        let top = snapshot.top_combinations(3, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0, alert_tags());
        assert!(snapshot.top_combinations(6, 10).is_empty());
    }

    #[test]
    fn test_tag_statistics_readers_see_atomic_updates() {
        let stats = Arc::new(TagStatistics::new());
        let tags = alert_tags();

        std::thread::scope(|scope| {
            let writer = stats.clone();
            scope.spawn(move || {
                for index in 0..2_000 {
                    let units = if index % 2 == 0 { 1.0 } else { 0.0 };
                    writer.record_outcome(&tags, &outcome(units, 70.0 * units));
                }
            });

            for _ in 0..4 {
                let reader = stats.clone();
                scope.spawn(move || {
                    for _ in 0..500 {
                        let snapshot = reader.snapshot_all();
                        let combination = snapshot
                            .combinations
                            .first()
                            .map(|(_, entry)| entry.total_alerts)
                            .unwrap_or_default();

                        assert!(snapshot
                            .dimensions
                            .iter()
                            .all(|(_, entry)| entry.total_alerts == combination));
                    }
                });
            }
        });

        assert_eq!(stats.lookup(&tags).total_alerts, 2_000);
        assert_eq!(stats.lookup(&tags).win_rate, 0.5);
    }
}
