//! # Explanation Aggregator
//!
//! [`ExplanationAggregator`] folds a stream of [`ExplanationRecord`]s into
//! per-class, per-feature running tallies and answers ranked statistic queries
//! over them without revisiting the raw records.
//!
//! For every class a record carries, the class is counted only when its
//! confidence is at least the aggregator's threshold. Each included class
//! contributes, for every feature in its ranked list:
//!
//! - one appearance,
//! - its score to the running score sum,
//! - its 1-based rank to the running rank sum and to a rank histogram.
//!
//! The histogram lets `top_k` be answered for whatever `k` the query asks for.
//! All tallies are sums, so feeding order never changes a result, and two
//! partial aggregators can be combined with [`ExplanationAggregator::merge`].

use crate::error::{XaiError, check_threshold};
use crate::record::{ClassLabel, ExplanationRecord};
use crate::stats::{ClassStatistics, FeatureStatistic, StatsType, check_k, rank_features};
use std::collections::BTreeMap;

/// Running tallies for one feature within one class.
#[derive(Debug, Clone, Default, PartialEq)]
struct FeatureTally {
    appearances: u64,
    /// Appearances per 1-based rank. Sparse, so a feature seen at rank
    /// 10 000 costs one entry rather than 10 000 counters.
    rank_histogram: BTreeMap<usize, u64>,
    score_sum: f64,
    rank_sum: u64,
}

impl FeatureTally {
    fn record(&mut self, rank: usize, score: f64) {
        self.appearances += 1;
        *self.rank_histogram.entry(rank).or_insert(0) += 1;
        self.score_sum += score;
        self.rank_sum += rank as u64;
    }

    fn count_within(&self, k: usize) -> u64 {
        self.rank_histogram.range(..=k).map(|(_, count)| count).sum()
    }

    fn average_score(&self) -> f64 {
        self.score_sum / self.appearances as f64
    }

    fn average_rank(&self) -> f64 {
        self.rank_sum as f64 / self.appearances as f64
    }

    fn merge(&mut self, other: &FeatureTally) {
        self.appearances += other.appearances;
        for (rank, count) in &other.rank_histogram {
            *self.rank_histogram.entry(*rank).or_insert(0) += count;
        }
        self.score_sum += other.score_sum;
        self.rank_sum += other.rank_sum;
    }
}

/// Running tallies for one class.
#[derive(Debug, Clone, Default, PartialEq)]
struct ClassTally {
    included: u64,
    features: BTreeMap<String, FeatureTally>,
}

impl ClassTally {
    fn statistics(&self, stats_type: StatsType, k: usize) -> Vec<FeatureStatistic> {
        let entries = self
            .features
            .iter()
            .filter_map(|(feature, tally)| {
                let value = match stats_type {
                    StatsType::TopK => {
                        let count = tally.count_within(k);
                        if count == 0 {
                            return None;
                        }
                        count as f64
                    }
                    StatsType::AverageScore => tally.average_score(),
                    StatsType::AverageRanking => tally.average_rank(),
                };
                Some(FeatureStatistic {
                    feature: feature.clone(),
                    value,
                    appearances: tally.appearances,
                })
            })
            .collect();
        rank_features(entries, stats_type, k)
    }
}

/// Streaming accumulator of explanation records.
///
/// ```
/// use xai_core::{ClassExplanation, ClassLabel, ExplanationAggregator, ExplanationRecord, StatsType};
///
/// let mut aggregator = ExplanationAggregator::new(0.5).unwrap();
/// let record = ExplanationRecord::new()
///     .with_class("spam", ClassExplanation::new(0.9, [("free", 0.7), ("winner", 0.2)]));
/// aggregator.feed(&record).unwrap();
///
/// let stats = aggregator.get_statistics(StatsType::TopK, 1).unwrap();
/// assert_eq!(stats[&ClassLabel::from("spam")][0].feature, "free");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExplanationAggregator {
    confidence_threshold: f64,
    records_seen: u64,
    classes: BTreeMap<ClassLabel, ClassTally>,
}

impl ExplanationAggregator {
    /// Create an aggregator that only counts classes whose confidence is at
    /// least `confidence_threshold`, which must lie in `[0, 1]`.
    pub fn new(confidence_threshold: f64) -> Result<Self, XaiError> {
        check_threshold(confidence_threshold)?;
        Ok(Self {
            confidence_threshold,
            records_seen: 0,
            classes: BTreeMap::new(),
        })
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Number of records fed so far, whether or not any class was included.
    pub fn records_seen(&self) -> u64 {
        self.records_seen
    }

    /// Number of records in which `label` passed the confidence threshold.
    pub fn included_records(&self, label: &ClassLabel) -> u64 {
        self.classes.get(label).map_or(0, |c| c.included)
    }

    /// Every class seen so far, including those never above the threshold.
    pub fn classes(&self) -> impl Iterator<Item = &ClassLabel> {
        self.classes.keys()
    }

    /// Accumulate one record.
    ///
    /// The record is validated before any tally changes, so a malformed
    /// record leaves the aggregator untouched.
    pub fn feed(&mut self, record: &ExplanationRecord) -> Result<(), XaiError> {
        record.validate()?;
        self.records_seen += 1;

        for (label, class) in record {
            let tally = self.classes.entry(label.clone()).or_default();
            if class.confidence < self.confidence_threshold {
                tracing::trace!(
                    class = %label,
                    confidence = class.confidence,
                    threshold = self.confidence_threshold,
                    "class below confidence threshold"
                );
                continue;
            }
            tally.included += 1;
            for (rank, feature, score) in class.ranked() {
                tally
                    .features
                    .entry(feature.to_string())
                    .or_default()
                    .record(rank, score);
            }
        }
        Ok(())
    }

    /// Ranked statistics for every class seen.
    ///
    /// Each class's list is sorted by the statistic (descending for `top_k`
    /// and `average_score`, ascending for `average_ranking`), ties broken by
    /// feature name, and truncated to `k` entries. For `top_k`, features that
    /// never appeared within the first `k` positions are left out. A class
    /// seen only below the threshold maps to an empty list.
    pub fn get_statistics(
        &self,
        stats_type: StatsType,
        k: usize,
    ) -> Result<ClassStatistics, XaiError> {
        check_k(k)?;
        Ok(self
            .classes
            .iter()
            .map(|(label, tally)| (label.clone(), tally.statistics(stats_type, k)))
            .collect())
    }

    /// Fold the tallies of `other` into `self`.
    ///
    /// Equivalent to having fed `self` every record `other` was fed. Both
    /// aggregators must share the same confidence threshold.
    pub fn merge(&mut self, other: &ExplanationAggregator) -> Result<(), XaiError> {
        if self.confidence_threshold != other.confidence_threshold {
            return Err(XaiError::config(format!(
                "cannot merge aggregators with thresholds {} and {}",
                self.confidence_threshold, other.confidence_threshold
            )));
        }
        self.records_seen += other.records_seen;
        for (label, theirs) in &other.classes {
            let mine = self.classes.entry(label.clone()).or_default();
            mine.included += theirs.included;
            for (feature, tally) in &theirs.features {
                mine.features
                    .entry(feature.clone())
                    .or_default()
                    .merge(tally);
            }
        }
        Ok(())
    }
}
