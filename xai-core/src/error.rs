//! Error types for the xai-core crate.

use thiserror::Error;

/// Top-level error type for explanation aggregation and interpretation.
#[derive(Debug, Error)]
pub enum XaiError {
    #[error(
        "Interpreter is not yet built: call build_interpreter() before interpreting a model"
    )]
    InterpreterUninitialized,

    #[error("Unsupported statistic '{name}' (expected top_k, average_score or average_ranking)")]
    UnsupportedStatistic { name: String },

    #[error("No explainer registered for domain '{domain}' and algorithm '{algorithm}'")]
    ExplainerSelection { domain: String, algorithm: String },

    #[error("Malformed explanation record: {0}")]
    MalformedRecord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Explainer error: {0}")]
    Explainer(String),
}

impl XaiError {
    pub fn unsupported_statistic(name: impl Into<String>) -> Self {
        Self::UnsupportedStatistic { name: name.into() }
    }

    pub fn explainer_selection(domain: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self::ExplainerSelection {
            domain: domain.into(),
            algorithm: algorithm.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn explainer(msg: impl Into<String>) -> Self {
        Self::Explainer(msg.into())
    }
}

/// Validate that a confidence threshold lies in `[0, 1]`.
pub(crate) fn check_threshold(threshold: f64) -> Result<(), XaiError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(XaiError::config(format!(
            "confidence threshold {threshold} is outside [0, 1]"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_threshold_bounds() {
        assert!(check_threshold(0.0).is_ok());
        assert!(check_threshold(1.0).is_ok());
        assert!(check_threshold(0.8).is_ok());
        assert!(check_threshold(-0.01).is_err());
        assert!(check_threshold(1.01).is_err());
        assert!(check_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = XaiError::explainer_selection("tabular", "shap");
        assert_eq!(
            err.to_string(),
            "No explainer registered for domain 'tabular' and algorithm 'shap'"
        );
        let err = XaiError::unsupported_statistic("median");
        assert!(err.to_string().contains("'median'"));
    }
}
