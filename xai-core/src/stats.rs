//! Statistic kinds and ranked per-class results.

use crate::error::XaiError;
use crate::record::ClassLabel;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of summary computed over aggregated explanations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsType {
    /// How often a feature appears within the first `k` ranked positions.
    #[default]
    TopK,
    /// Mean importance score of a feature over its appearances.
    AverageScore,
    /// Mean rank position of a feature over its appearances (lower is better).
    AverageRanking,
}

impl StatsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopK => "top_k",
            Self::AverageScore => "average_score",
            Self::AverageRanking => "average_ranking",
        }
    }

    /// Whether larger values rank first.
    pub fn descending(&self) -> bool {
        !matches!(self, Self::AverageRanking)
    }
}

impl fmt::Display for StatsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsType {
    type Err = XaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_k" => Ok(Self::TopK),
            "average_score" => Ok(Self::AverageScore),
            "average_ranking" => Ok(Self::AverageRanking),
            other => Err(XaiError::unsupported_statistic(other)),
        }
    }
}

/// One ranked entry of a class's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistic {
    pub feature: String,
    /// Top-k count, average score or average rank depending on the statistic.
    pub value: f64,
    /// Number of included records in which the feature appeared at all.
    pub appearances: u64,
}

/// Ranked statistics per class.
pub type ClassStatistics = BTreeMap<ClassLabel, Vec<FeatureStatistic>>;

pub(crate) fn check_k(k: usize) -> Result<(), XaiError> {
    if k == 0 {
        return Err(XaiError::invalid_argument("k must be at least 1"));
    }
    Ok(())
}

/// Sort entries by value in the statistic's direction, breaking ties by
/// feature name ascending, and keep the first `k`.
pub(crate) fn rank_features(
    mut entries: Vec<FeatureStatistic>,
    stats_type: StatsType,
    k: usize,
) -> Vec<FeatureStatistic> {
    let descending = stats_type.descending();
    entries.sort_by(|a, b| {
        let by_value = if descending {
            b.value.total_cmp(&a.value)
        } else {
            a.value.total_cmp(&b.value)
        };
        match by_value {
            Ordering::Equal => a.feature.cmp(&b.feature),
            other => other,
        }
    });
    entries.truncate(k);
    entries
}

/// Feature names of each class, in ranked order.
pub fn feature_names(stats: &ClassStatistics) -> BTreeMap<ClassLabel, Vec<String>> {
    stats
        .iter()
        .map(|(label, entries)| {
            (
                label.clone(),
                entries.iter().map(|e| e.feature.clone()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(feature: &str, value: f64) -> FeatureStatistic {
        FeatureStatistic {
            feature: feature.into(),
            value,
            appearances: 1,
        }
    }

    fn names(entries: &[FeatureStatistic]) -> Vec<&str> {
        entries.iter().map(|e| e.feature.as_str()).collect()
    }

    #[test]
    fn test_parse_stats_type() {
        assert_eq!("top_k".parse::<StatsType>().unwrap(), StatsType::TopK);
        assert_eq!(
            "average_score".parse::<StatsType>().unwrap(),
            StatsType::AverageScore
        );
        assert_eq!(
            "average_ranking".parse::<StatsType>().unwrap(),
            StatsType::AverageRanking
        );
        assert!(matches!(
            "median".parse::<StatsType>(),
            Err(XaiError::UnsupportedStatistic { .. })
        ));
    }

    #[test]
    fn test_rank_descending_with_tie_break() {
        let ranked = rank_features(
            vec![stat("c", 1.0), stat("b", 2.0), stat("a", 1.0)],
            StatsType::TopK,
            10,
        );
        assert_eq!(names(&ranked), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_rank_ascending_for_average_ranking() {
        let ranked = rank_features(
            vec![stat("x", 3.5), stat("y", 1.0), stat("z", 2.0)],
            StatsType::AverageRanking,
            2,
        );
        assert_eq!(names(&ranked), vec!["y", "z"]);
    }

    #[test]
    fn test_serde_names_match_display() {
        for stats_type in [
            StatsType::TopK,
            StatsType::AverageScore,
            StatsType::AverageRanking,
        ] {
            let json = serde_json::to_string(&stats_type).unwrap();
            assert_eq!(json, format!("\"{stats_type}\""));
        }
    }
}
