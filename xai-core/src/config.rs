//! Configuration types for interpretation and error analysis.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> explicit file -> environment.

use crate::error::{XaiError, check_threshold};
use crate::stats::StatsType;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XaiConfig {
    /// Statistic reported when the caller does not choose one.
    #[serde(default)]
    pub stats_type: StatsType,
    /// Number of features per class reported when the caller does not choose.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Model interpretation policy.
    #[serde(default)]
    pub interpret: InterpretConfig,
    /// Confusion-cell error analysis policy.
    #[serde(default)]
    pub error_analysis: ErrorAnalysisConfig,
}

impl Default for XaiConfig {
    fn default() -> Self {
        Self {
            stats_type: StatsType::default(),
            k: default_k(),
            interpret: InterpretConfig::default(),
            error_analysis: ErrorAnalysisConfig::default(),
        }
    }
}

fn default_k() -> usize {
    5
}

/// Policy for `interpret_model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpretConfig {
    /// Minimum per-class confidence for a class to count (0.0-1.0).
    #[serde(default = "default_interpret_threshold")]
    pub confidence_threshold: f64,
    /// Lower bound on the explainer's sampling budget.
    #[serde(default = "default_min_num_samples")]
    pub min_num_samples: usize,
    /// Budget is `sample_count / num_samples_divisor` when that exceeds the minimum.
    #[serde(default = "default_num_samples_divisor")]
    pub num_samples_divisor: usize,
    /// Report progress every N samples (0 disables).
    #[serde(default = "default_interpret_progress")]
    pub progress_interval: usize,
}

impl Default for InterpretConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_interpret_threshold(),
            min_num_samples: default_min_num_samples(),
            num_samples_divisor: default_num_samples_divisor(),
            progress_interval: default_interpret_progress(),
        }
    }
}

impl InterpretConfig {
    /// Explainer sampling budget for a run over `sample_count` samples.
    pub fn num_samples_for(&self, sample_count: usize) -> usize {
        let scaled = sample_count / self.num_samples_divisor.max(1);
        scaled.max(self.min_num_samples)
    }
}

fn default_interpret_threshold() -> f64 {
    0.8
}

fn default_min_num_samples() -> usize {
    100
}

fn default_num_samples_divisor() -> usize {
    10
}

fn default_interpret_progress() -> usize {
    100
}

/// Policy for `error_analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysisConfig {
    /// Threshold for each confusion cell's aggregator (0.0 keeps everything).
    #[serde(default)]
    pub confidence_threshold: f64,
    /// Explainer sampling budget per sample.
    #[serde(default = "default_error_num_samples")]
    pub num_samples: usize,
    /// Report progress every N samples (0 disables).
    #[serde(default = "default_error_progress")]
    pub progress_interval: usize,
}

impl Default for ErrorAnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.0,
            num_samples: default_error_num_samples(),
            progress_interval: default_error_progress(),
        }
    }
}

fn default_error_num_samples() -> usize {
    100
}

fn default_error_progress() -> usize {
    10
}

impl XaiConfig {
    pub fn validate(&self) -> Result<(), XaiError> {
        check_threshold(self.interpret.confidence_threshold)?;
        check_threshold(self.error_analysis.confidence_threshold)?;
        if self.k == 0 {
            return Err(XaiError::config("k must be at least 1"));
        }
        Ok(())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `XAI_`, nested with `__`)
/// 2. Explicit config file
/// 3. Workspace-local config (`.xai/config.toml`)
/// 4. User config (`~/.config/xai/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<XaiConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(XaiConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "xai", "xai") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".xai").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        figment = figment.merge(Toml::file(path));
    }

    // XAI_INTERPRET__CONFIDENCE_THRESHOLD, XAI_ERROR_ANALYSIS__NUM_SAMPLES, ...
    figment = figment.merge(Env::prefixed("XAI_").split("__"));

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = XaiConfig::default();
        assert_eq!(config.k, 5);
        assert_eq!(config.stats_type, StatsType::TopK);
        assert_eq!(config.interpret.confidence_threshold, 0.8);
        assert_eq!(config.error_analysis.confidence_threshold, 0.0);
        assert_eq!(config.error_analysis.num_samples, 100);
        assert_eq!(config.interpret.progress_interval, 100);
        assert_eq!(config.error_analysis.progress_interval, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_num_samples_budget() {
        let interpret = InterpretConfig::default();
        assert_eq!(interpret.num_samples_for(3), 100);
        assert_eq!(interpret.num_samples_for(1000), 100);
        assert_eq!(interpret.num_samples_for(1009), 100);
        assert_eq!(interpret.num_samples_for(5000), 500);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: XaiConfig = toml::from_str(
            r#"
            stats_type = "average_ranking"

            [interpret]
            confidence_threshold = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(config.stats_type, StatsType::AverageRanking);
        assert_eq!(config.k, 5);
        assert_eq!(config.interpret.confidence_threshold, 0.6);
        assert_eq!(config.interpret.min_num_samples, 100);
        assert_eq!(config.error_analysis, ErrorAnalysisConfig::default());
    }

    #[test]
    fn test_load_workspace_config() {
        let dir = tempfile::tempdir().unwrap();
        let xai_dir = dir.path().join(".xai");
        std::fs::create_dir_all(&xai_dir).unwrap();
        std::fs::write(
            xai_dir.join("config.toml"),
            "k = 3\n[error_analysis]\nnum_samples = 250\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.k, 3);
        assert_eq!(config.error_analysis.num_samples, 250);
        assert_eq!(config.error_analysis.progress_interval, 10);
    }

    #[test]
    fn test_explicit_file_overrides_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let xai_dir = dir.path().join(".xai");
        std::fs::create_dir_all(&xai_dir).unwrap();
        std::fs::write(xai_dir.join("config.toml"), "k = 3\n").unwrap();
        let explicit = dir.path().join("override.toml");
        std::fs::write(&explicit, "k = 7\n").unwrap();

        let config = load_config(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(config.k, 7);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = XaiConfig::default();
        config.interpret.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
