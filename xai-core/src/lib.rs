//! # xai-core — Explanation Aggregation & Error Analysis
//!
//! This crate turns streams of per-instance, model-agnostic explanations
//! (ranked feature importances per class, each with a confidence) into
//! summary statistics, and groups the explanations of misclassified samples
//! by confusion-matrix cell.
//!
//! ## Components
//!
//! 1. **Records**: [`ExplanationRecord`]: class label to confidence and ranked features
//! 2. **Aggregation**: [`ExplanationAggregator`]: confidence-filtered `top_k`,
//!    `average_score` and `average_ranking` statistics
//! 3. **Error analysis**: [`ConfusionAnalysis`]: one aggregator per
//!    (ground truth, predicted) cell
//! 4. **Interpretation**: [`ModelInterpreter`]: drives an [`Explainer`]
//!    resolved from an [`ExplainerRegistry`] over samples

// Foundation
pub mod config;
pub mod error;
pub mod progress;

// Data model
pub mod record;
pub mod stats;

// Aggregation
pub mod aggregator;
pub mod confusion;

// Explainers & orchestration
pub mod explainer;
pub mod interpreter;

// Re-exports
pub use aggregator::ExplanationAggregator;
pub use config::{ErrorAnalysisConfig, InterpretConfig, XaiConfig, load_config};
pub use confusion::{ConfusionAnalysis, ConfusionCell, Observation, predicted_label};
pub use error::XaiError;
pub use explainer::{
    Domain, ExplainRequest, Explainer, ExplainerConstructor, ExplainerOptions, ExplainerRegistry,
    Instance,
};
pub use interpreter::{ErrorAnalysisStatistics, ModelInterpreter};
pub use progress::{
    NoProgress, Operation, ProgressEvent, ProgressObserver, ProgressTicker, TracingProgress,
};
pub use record::{ClassExplanation, ClassLabel, ExplanationRecord};
pub use stats::{ClassStatistics, FeatureStatistic, StatsType, feature_names};
