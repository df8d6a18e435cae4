//! Explainer trait and the types exchanged with explainer implementations.

pub mod registry;

use crate::error::XaiError;
use crate::record::ExplanationRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use registry::{ExplainerConstructor, ExplainerRegistry};

/// Keyword options handed to [`Explainer::build_explainer`].
pub type ExplainerOptions = serde_json::Map<String, serde_json::Value>;

/// Input domain an explainer works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Tabular,
    Text,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tabular => "tabular",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = XaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tabular" => Ok(Self::Tabular),
            "text" => Ok(Self::Text),
            _ => Err(XaiError::explainer_selection(s, "*")),
        }
    }
}

/// A single instance to explain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instance {
    /// One row of tabular features.
    Vector(Vec<f64>),
    /// A raw text document.
    Text(String),
}

impl Instance {
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Vector(values) => Some(values),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Vector(_) => None,
        }
    }
}

impl From<Vec<f64>> for Instance {
    fn from(values: Vec<f64>) -> Self {
        Self::Vector(values)
    }
}

impl From<&str> for Instance {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Instance {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Parameters for one `explain_instance` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainRequest {
    /// Number of most probable classes to explain.
    pub top_labels: usize,
    /// Perturbation sampling budget available to the explainer.
    pub num_samples: usize,
    /// Maximum number of features to report per class.
    pub num_features: usize,
}

/// A model-agnostic explainer.
///
/// Implementations are constructed through an [`ExplainerRegistry`], built
/// once with caller-supplied options, and then asked to explain instances one
/// at a time.
pub trait Explainer: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Prepare the explainer (training data, class names, model handle, ...).
    fn build_explainer(&mut self, options: &ExplainerOptions) -> Result<(), XaiError>;

    /// Explain one instance, returning ranked features for up to
    /// `request.top_labels` classes.
    fn explain_instance(
        &self,
        instance: &Instance,
        request: &ExplainRequest,
    ) -> Result<ExplanationRecord, XaiError>;
}
