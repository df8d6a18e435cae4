//! # Model Interpreter
//!
//! Drives an explainer over a set of samples and aggregates what it returns.
//!
//! - [`ModelInterpreter::interpret_model`] explains the top predicted class of
//!   every sample and summarizes the confident explanations.
//! - [`ModelInterpreter::error_analysis`] explains every class of each
//!   validation sample, picks the most confident class as the prediction, and
//!   groups the explanations of misclassified samples by confusion cell.
//!
//! Construction is two-phase: [`ModelInterpreter::new`] records the domain
//! and algorithm, [`ModelInterpreter::build_interpreter`] resolves and builds
//! the explainer. Samples are processed strictly in order, and the first
//! explainer failure aborts the whole pass without returning partial results.

use crate::aggregator::ExplanationAggregator;
use crate::config::XaiConfig;
use crate::confusion::{ConfusionAnalysis, ConfusionCell, Observation};
use crate::error::XaiError;
use crate::explainer::{
    Domain, ExplainRequest, Explainer, ExplainerOptions, ExplainerRegistry, Instance,
};
use crate::progress::{NoProgress, Operation, ProgressObserver, ProgressTicker};
use crate::record::ClassLabel;
use crate::stats::{ClassStatistics, StatsType, check_k};
use std::collections::BTreeMap;
use std::fmt;

/// Statistics per confusion cell, as returned by error analysis.
pub type ErrorAnalysisStatistics = BTreeMap<ConfusionCell, ClassStatistics>;

/// Interprets a model through a model-agnostic explainer.
pub struct ModelInterpreter {
    domain: Domain,
    algorithm: Option<String>,
    config: XaiConfig,
    explainer: Option<Box<dyn Explainer>>,
}

impl ModelInterpreter {
    /// Record the domain and algorithm. `None` selects the registry's default
    /// algorithm for the domain at build time.
    pub fn new(domain: Domain, algorithm: Option<&str>) -> Self {
        Self {
            domain,
            algorithm: algorithm.map(str::to_string),
            config: XaiConfig::default(),
            explainer: None,
        }
    }

    pub fn with_config(mut self, config: XaiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    pub fn config(&self) -> &XaiConfig {
        &self.config
    }

    pub fn is_built(&self) -> bool {
        self.explainer.is_some()
    }

    /// Resolve the explainer for this interpreter's domain and algorithm and
    /// build it with `options`. May only succeed once.
    pub fn build_interpreter(
        &mut self,
        registry: &ExplainerRegistry,
        options: &ExplainerOptions,
    ) -> Result<(), XaiError> {
        if self.explainer.is_some() {
            return Err(XaiError::config("interpreter is already built"));
        }
        self.config.validate()?;

        let mut explainer = registry.create(self.domain, self.algorithm.as_deref())?;
        explainer.build_explainer(options)?;
        tracing::info!(
            domain = %self.domain,
            algorithm = self.algorithm.as_deref().unwrap_or("<default>"),
            explainer = explainer.name(),
            "Built model interpreter"
        );
        self.explainer = Some(explainer);
        Ok(())
    }

    fn explainer(&self) -> Result<&dyn Explainer, XaiError> {
        self.explainer
            .as_deref()
            .ok_or(XaiError::InterpreterUninitialized)
    }

    /// Aggregate explanations of each sample's top predicted class.
    pub fn interpret_model(
        &self,
        samples: &[Instance],
        stats_type: StatsType,
        k: usize,
    ) -> Result<ClassStatistics, XaiError> {
        self.interpret_model_with_progress(samples, stats_type, k, &NoProgress)
    }

    pub fn interpret_model_with_progress(
        &self,
        samples: &[Instance],
        stats_type: StatsType,
        k: usize,
        progress: &dyn ProgressObserver,
    ) -> Result<ClassStatistics, XaiError> {
        let explainer = self.explainer()?;
        check_k(k)?;

        let policy = &self.config.interpret;
        let mut aggregator = ExplanationAggregator::new(policy.confidence_threshold)?;
        let request = ExplainRequest {
            top_labels: 1,
            num_samples: policy.num_samples_for(samples.len()),
            num_features: k,
        };
        tracing::info!(
            samples = samples.len(),
            num_samples = request.num_samples,
            %stats_type,
            k,
            "Interpreting model"
        );

        let mut ticker = ProgressTicker::new(
            Operation::InterpretModel,
            policy.progress_interval,
            Some(samples.len()),
            progress,
        );
        for sample in samples {
            let record = explainer.explain_instance(sample, &request)?;
            aggregator.feed(&record)?;
            ticker.tick();
        }

        aggregator.get_statistics(stats_type, k)
    }

    /// Aggregate explanations of misclassified validation samples per
    /// (ground truth, predicted) cell.
    pub fn error_analysis(
        &self,
        class_num: usize,
        valid_x: &[Instance],
        valid_y: &[ClassLabel],
        stats_type: StatsType,
        k: usize,
    ) -> Result<ErrorAnalysisStatistics, XaiError> {
        self.error_analysis_with_progress(class_num, valid_x, valid_y, stats_type, k, &NoProgress)
    }

    pub fn error_analysis_with_progress(
        &self,
        class_num: usize,
        valid_x: &[Instance],
        valid_y: &[ClassLabel],
        stats_type: StatsType,
        k: usize,
        progress: &dyn ProgressObserver,
    ) -> Result<ErrorAnalysisStatistics, XaiError> {
        let explainer = self.explainer()?;
        check_k(k)?;
        if valid_x.len() != valid_y.len() {
            return Err(XaiError::invalid_argument(format!(
                "{} validation samples but {} labels",
                valid_x.len(),
                valid_y.len()
            )));
        }

        let policy = &self.config.error_analysis;
        let mut analysis = ConfusionAnalysis::new(policy.confidence_threshold)?;
        let request = ExplainRequest {
            top_labels: class_num,
            num_samples: policy.num_samples,
            num_features: k,
        };
        tracing::info!(samples = valid_x.len(), class_num, %stats_type, k, "Running error analysis");

        let mut ticker = ProgressTicker::new(
            Operation::ErrorAnalysis,
            policy.progress_interval,
            Some(valid_x.len()),
            progress,
        );
        for (sample, ground_truth) in valid_x.iter().zip(valid_y) {
            let record = explainer.explain_instance(sample, &request)?;
            if let Observation::Misclassified(cell) = analysis.observe(ground_truth, &record)? {
                tracing::trace!(%cell, "Misclassified sample");
            }
            ticker.tick();
        }

        tracing::info!(
            observed = analysis.observed(),
            misclassified = analysis.misclassified(),
            "Error analysis complete"
        );
        analysis.get_statistics(stats_type, k)
    }
}

impl fmt::Debug for ModelInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelInterpreter")
            .field("domain", &self.domain)
            .field("algorithm", &self.algorithm)
            .field("config", &self.config)
            .field("explainer", &self.explainer.as_ref().map(|e| e.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ClassExplanation, ExplanationRecord};
    use crate::stats::feature_names;
    use std::sync::Mutex;

    /// Returns a fixed record and remembers every request it received.
    struct FixedExplainer {
        record: ExplanationRecord,
        requests: Mutex<Vec<ExplainRequest>>,
        built: bool,
    }

    impl FixedExplainer {
        fn new(record: ExplanationRecord) -> Self {
            Self {
                record,
                requests: Mutex::new(Vec::new()),
                built: false,
            }
        }
    }

    impl Explainer for FixedExplainer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn build_explainer(&mut self, _options: &ExplainerOptions) -> Result<(), XaiError> {
            self.built = true;
            Ok(())
        }

        fn explain_instance(
            &self,
            _instance: &Instance,
            request: &ExplainRequest,
        ) -> Result<ExplanationRecord, XaiError> {
            assert!(self.built, "explain_instance called before build_explainer");
            self.requests.lock().unwrap().push(*request);
            Ok(self.record.clone())
        }
    }

    fn fixed_record() -> ExplanationRecord {
        ExplanationRecord::new().with_class(
            "pos",
            ClassExplanation::new(0.9, [("f1", 0.5), ("f2", 0.3)]),
        )
    }

    fn registry() -> ExplainerRegistry {
        let mut registry = ExplainerRegistry::new();
        registry
            .register(Domain::Tabular, "fixed", || {
                Box::new(FixedExplainer::new(fixed_record()))
            })
            .unwrap();
        registry
    }

    fn samples(n: usize) -> Vec<Instance> {
        (0..n).map(|i| Instance::Vector(vec![i as f64])).collect()
    }

    #[test]
    fn test_requires_build() {
        let interpreter = ModelInterpreter::new(Domain::Tabular, Some("fixed"));
        assert!(!interpreter.is_built());
        assert!(matches!(
            interpreter.interpret_model(&samples(3), StatsType::TopK, 5),
            Err(XaiError::InterpreterUninitialized)
        ));
        assert!(matches!(
            interpreter.error_analysis(2, &samples(1), &[ClassLabel::Index(0)], StatsType::TopK, 5),
            Err(XaiError::InterpreterUninitialized)
        ));
    }

    #[test]
    fn test_accessors_reflect_construction() {
        let mut config = XaiConfig::default();
        config.k = 9;
        let interpreter = ModelInterpreter::new(Domain::Text, Some("lime")).with_config(config);
        assert_eq!(interpreter.domain(), Domain::Text);
        assert_eq!(interpreter.algorithm(), Some("lime"));
        assert_eq!(interpreter.config().k, 9);

        let default_algo = ModelInterpreter::new(Domain::Tabular, None);
        assert_eq!(default_algo.algorithm(), None);
        assert_eq!(default_algo.config(), &XaiConfig::default());
    }

    #[test]
    fn test_build_unknown_algorithm() {
        let mut interpreter = ModelInterpreter::new(Domain::Tabular, Some("anchor"));
        let err = interpreter
            .build_interpreter(&registry(), &ExplainerOptions::new())
            .unwrap_err();
        assert!(matches!(err, XaiError::ExplainerSelection { .. }));
        assert!(!interpreter.is_built());
    }

    #[test]
    fn test_build_twice_is_rejected() {
        let mut interpreter = ModelInterpreter::new(Domain::Tabular, None);
        interpreter
            .build_interpreter(&registry(), &ExplainerOptions::new())
            .unwrap();
        assert!(interpreter.is_built());
        assert!(matches!(
            interpreter.build_interpreter(&registry(), &ExplainerOptions::new()),
            Err(XaiError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_interpret_model_top_k() {
        let mut interpreter = ModelInterpreter::new(Domain::Tabular, Some("fixed"));
        interpreter
            .build_interpreter(&registry(), &ExplainerOptions::new())
            .unwrap();

        let stats = interpreter
            .interpret_model(&samples(3), StatsType::TopK, 1)
            .unwrap();
        assert_eq!(
            feature_names(&stats),
            BTreeMap::from([(ClassLabel::from("pos"), vec!["f1".to_string()])])
        );
        assert_eq!(stats[&ClassLabel::from("pos")][0].value, 3.0);
    }

    #[test]
    fn test_interpret_model_rejects_zero_k_before_explaining() {
        let mut interpreter = ModelInterpreter::new(Domain::Tabular, Some("fixed"));
        interpreter
            .build_interpreter(&registry(), &ExplainerOptions::new())
            .unwrap();
        assert!(matches!(
            interpreter.interpret_model(&samples(3), StatsType::TopK, 0),
            Err(XaiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_error_analysis_length_mismatch() {
        let mut interpreter = ModelInterpreter::new(Domain::Tabular, Some("fixed"));
        interpreter
            .build_interpreter(&registry(), &ExplainerOptions::new())
            .unwrap();
        assert!(matches!(
            interpreter.error_analysis(2, &samples(2), &[ClassLabel::Index(0)], StatsType::TopK, 5),
            Err(XaiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_debug_shows_explainer_name() {
        let mut interpreter = ModelInterpreter::new(Domain::Tabular, None);
        interpreter
            .build_interpreter(&registry(), &ExplainerOptions::new())
            .unwrap();
        let debug = format!("{interpreter:?}");
        assert!(debug.contains("Some(\"fixed\")"));
    }
}
