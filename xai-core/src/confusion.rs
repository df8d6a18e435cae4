//! Confusion-cell error analysis: explanations grouped by (ground truth, predicted).

use crate::aggregator::ExplanationAggregator;
use crate::error::{XaiError, check_threshold};
use crate::record::{ClassLabel, ExplanationRecord};
use crate::stats::{ClassStatistics, StatsType, check_k};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

/// One cell of the confusion matrix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfusionCell {
    pub ground_truth: ClassLabel,
    pub predicted: ClassLabel,
}

impl ConfusionCell {
    pub fn new(ground_truth: impl Into<ClassLabel>, predicted: impl Into<ClassLabel>) -> Self {
        Self {
            ground_truth: ground_truth.into(),
            predicted: predicted.into(),
        }
    }
}

impl fmt::Display for ConfusionCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.ground_truth, self.predicted)
    }
}

/// Outcome of observing one labelled explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Correct(ClassLabel),
    Misclassified(ConfusionCell),
}

/// The class with the highest confidence in `record`.
///
/// Ties go to the lowest [`ClassLabel`]. A record without classes cannot be
/// classified and is reported as malformed.
pub fn predicted_label(record: &ExplanationRecord) -> Result<&ClassLabel, XaiError> {
    let mut best: Option<(&ClassLabel, f64)> = None;
    for (label, class) in record {
        match best {
            Some((_, confidence)) if class.confidence <= confidence => {}
            _ => best = Some((label, class.confidence)),
        }
    }
    best.map(|(label, _)| label)
        .ok_or_else(|| XaiError::malformed("record has no classes to predict from"))
}

/// Per-cell explanation aggregators, created the first time a cell is seen.
#[derive(Debug, Clone)]
pub struct ConfusionAnalysis {
    confidence_threshold: f64,
    cells: BTreeMap<ConfusionCell, ExplanationAggregator>,
    observed: u64,
    misclassified: u64,
}

impl ConfusionAnalysis {
    pub fn new(confidence_threshold: f64) -> Result<Self, XaiError> {
        check_threshold(confidence_threshold)?;
        Ok(Self {
            confidence_threshold,
            cells: BTreeMap::new(),
            observed: 0,
            misclassified: 0,
        })
    }

    /// Classify `record`, and feed it to its cell's aggregator when the
    /// prediction disagrees with `ground_truth`.
    pub fn observe(
        &mut self,
        ground_truth: &ClassLabel,
        record: &ExplanationRecord,
    ) -> Result<Observation, XaiError> {
        record.validate()?;
        let predicted = predicted_label(record)?;
        self.observed += 1;

        if predicted == ground_truth {
            return Ok(Observation::Correct(predicted.clone()));
        }

        let cell = ConfusionCell {
            ground_truth: ground_truth.clone(),
            predicted: predicted.clone(),
        };
        let aggregator = match self.cells.entry(cell.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::debug!(%cell, "New confusion cell");
                entry.insert(ExplanationAggregator::new(self.confidence_threshold)?)
            }
        };
        aggregator.feed(record)?;
        self.misclassified += 1;
        Ok(Observation::Misclassified(cell))
    }

    /// Number of records observed, correct or not.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn misclassified(&self) -> u64 {
        self.misclassified
    }

    pub fn cell(&self, cell: &ConfusionCell) -> Option<&ExplanationAggregator> {
        self.cells.get(cell)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&ConfusionCell, &ExplanationAggregator)> {
        self.cells.iter()
    }

    /// Statistics of every cell that received at least one record.
    pub fn get_statistics(
        &self,
        stats_type: StatsType,
        k: usize,
    ) -> Result<BTreeMap<ConfusionCell, ClassStatistics>, XaiError> {
        check_k(k)?;
        self.cells
            .iter()
            .map(|(cell, aggregator)| Ok((cell.clone(), aggregator.get_statistics(stats_type, k)?)))
            .collect()
    }

    /// Cells ordered by how many misclassified records they hold, most first.
    pub fn top_cells(&self, n: usize) -> Vec<(&ConfusionCell, u64)> {
        let mut items: Vec<_> = self
            .cells
            .iter()
            .map(|(cell, aggregator)| (cell, aggregator.records_seen()))
            .collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        items.into_iter().take(n).collect()
    }
}
