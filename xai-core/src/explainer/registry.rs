//! Explainer registry: maps `(domain, algorithm)` to explainer constructors.

use super::{Domain, Explainer};
use crate::error::XaiError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Creates a fresh, unbuilt explainer.
pub type ExplainerConstructor = Arc<dyn Fn() -> Box<dyn Explainer> + Send + Sync>;

/// Registry of explainer implementations.
///
/// The first algorithm registered for a domain becomes that domain's default
/// until [`ExplainerRegistry::set_default`] picks another.
#[derive(Clone, Default)]
pub struct ExplainerRegistry {
    constructors: HashMap<(Domain, String), ExplainerConstructor>,
    defaults: HashMap<Domain, String>,
}

impl ExplainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &mut self,
        domain: Domain,
        algorithm: impl Into<String>,
        constructor: F,
    ) -> Result<(), XaiError>
    where
        F: Fn() -> Box<dyn Explainer> + Send + Sync + 'static,
    {
        let algorithm = algorithm.into();
        let key = (domain, algorithm.clone());
        if self.constructors.contains_key(&key) {
            return Err(XaiError::config(format!(
                "explainer '{algorithm}' is already registered for domain '{domain}'"
            )));
        }
        self.constructors.insert(key, Arc::new(constructor));
        self.defaults.entry(domain).or_insert_with(|| algorithm.clone());
        tracing::debug!(%domain, %algorithm, "Registered explainer");
        Ok(())
    }

    pub fn set_default(&mut self, domain: Domain, algorithm: &str) -> Result<(), XaiError> {
        if !self.contains(domain, algorithm) {
            return Err(XaiError::explainer_selection(domain.as_str(), algorithm));
        }
        self.defaults.insert(domain, algorithm.to_string());
        Ok(())
    }

    pub fn default_algorithm(&self, domain: Domain) -> Option<&str> {
        self.defaults.get(&domain).map(String::as_str)
    }

    pub fn contains(&self, domain: Domain, algorithm: &str) -> bool {
        self.constructors
            .contains_key(&(domain, algorithm.to_string()))
    }

    /// Construct the explainer for `domain` and `algorithm`, falling back to
    /// the domain default when no algorithm is given.
    pub fn create(
        &self,
        domain: Domain,
        algorithm: Option<&str>,
    ) -> Result<Box<dyn Explainer>, XaiError> {
        let algorithm = match algorithm {
            Some(name) => name,
            None => self
                .default_algorithm(domain)
                .ok_or_else(|| XaiError::explainer_selection(domain.as_str(), "<default>"))?,
        };
        let constructor = self
            .constructors
            .get(&(domain, algorithm.to_string()))
            .ok_or_else(|| XaiError::explainer_selection(domain.as_str(), algorithm))?;
        Ok(constructor())
    }

    /// All registered `(domain, algorithm)` pairs, sorted.
    pub fn list(&self) -> Vec<(Domain, &str)> {
        let mut entries: Vec<_> = self
            .constructors
            .keys()
            .map(|(domain, algorithm)| (*domain, algorithm.as_str()))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for ExplainerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplainerRegistry")
            .field("explainers", &self.list())
            .field("defaults", &self.defaults)
            .finish()
    }
}
