//! Explanation records: the per-instance output of an explainer.
//!
//! An [`ExplanationRecord`] maps each explained class to a [`ClassExplanation`]:
//! the explainer's confidence for that class plus the features it ranked, most
//! important first. Records are consumed as-is; nothing here re-sorts the
//! explainer's ranking.

use crate::error::XaiError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

// ---------------------------------------------------------------------------
// Class labels
// ---------------------------------------------------------------------------

/// Identifier of a class, either a numeric index or a string name.
///
/// Labels are totally ordered: every `Index` sorts before every `Name`,
/// indices compare numerically and names lexicographically. That order is
/// what breaks ties between equally confident predictions.
///
/// A string that parses as an integer always becomes an `Index`, whether it
/// comes from JSON or from `From<&str>`, so JSON object keys (`"0"`), plain
/// numbers (`0`) and `ClassLabel::from("0")` name the same class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassLabel {
    Index(i64),
    Name(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ClassLabel {
    fn from(value: i64) -> Self {
        Self::Index(value)
    }
}

impl From<&str> for ClassLabel {
    fn from(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(i) => Self::Index(i),
            Err(_) => Self::Name(value.to_string()),
        }
    }
}

impl From<String> for ClassLabel {
    fn from(value: String) -> Self {
        match value.parse::<i64>() {
            Ok(i) => Self::Index(i),
            Err(_) => Self::Name(value),
        }
    }
}

impl Serialize for ClassLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Index(i) => serializer.serialize_i64(*i),
            Self::Name(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for ClassLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelVisitor;

        impl Visitor<'_> for LabelVisitor {
            type Value = ClassLabel;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer class index or a class name")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ClassLabel, E> {
                Ok(ClassLabel::Index(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ClassLabel, E> {
                i64::try_from(v)
                    .map(ClassLabel::Index)
                    .map_err(|_| E::custom(format!("class index {v} out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ClassLabel, E> {
                Ok(ClassLabel::from(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<ClassLabel, E> {
                Ok(ClassLabel::from(v))
            }
        }

        deserializer.deserialize_any(LabelVisitor)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Explanation of one instance for a single class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassExplanation {
    /// Explainer confidence that the instance belongs to this class, in `[0, 1]`.
    pub confidence: f64,
    /// `(feature, importance)` pairs in descending importance, as produced by
    /// the explainer. Position `i` in this list is rank `i + 1`.
    pub features: Vec<(String, f64)>,
}

impl ClassExplanation {
    pub fn new<F, I>(confidence: f64, features: I) -> Self
    where
        F: Into<String>,
        I: IntoIterator<Item = (F, f64)>,
    {
        Self {
            confidence,
            features: features
                .into_iter()
                .map(|(name, score)| (name.into(), score))
                .collect(),
        }
    }

    /// Ranked features with their 1-based rank position.
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &str, f64)> {
        self.features
            .iter()
            .enumerate()
            .map(|(idx, (name, score))| (idx + 1, name.as_str(), *score))
    }
}

/// Per-instance explanation: class label to class explanation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExplanationRecord {
    classes: BTreeMap<ClassLabel, ClassExplanation>,
}

impl ExplanationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_class(mut self, label: impl Into<ClassLabel>, explanation: ClassExplanation) -> Self {
        self.insert(label, explanation);
        self
    }

    pub fn insert(&mut self, label: impl Into<ClassLabel>, explanation: ClassExplanation) {
        self.classes.insert(label.into(), explanation);
    }

    pub fn get(&self, label: &ClassLabel) -> Option<&ClassExplanation> {
        self.classes.get(label)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ClassLabel, ClassExplanation> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Check the record contract: every confidence lies in `[0, 1]` and every
    /// importance score is finite.
    pub fn validate(&self) -> Result<(), XaiError> {
        for (label, class) in &self.classes {
            if !(0.0..=1.0).contains(&class.confidence) {
                return Err(XaiError::malformed(format!(
                    "class {label}: confidence {} is outside [0, 1]",
                    class.confidence
                )));
            }
            if let Some((feature, score)) = class.features.iter().find(|(_, s)| !s.is_finite()) {
                return Err(XaiError::malformed(format!(
                    "class {label}: feature '{feature}' has non-finite score {score}"
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(ClassLabel, ClassExplanation)> for ExplanationRecord {
    fn from_iter<T: IntoIterator<Item = (ClassLabel, ClassExplanation)>>(iter: T) -> Self {
        Self {
            classes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ExplanationRecord {
    type Item = (&'a ClassLabel, &'a ClassExplanation);
    type IntoIter = btree_map::Iter<'a, ClassLabel, ClassExplanation>;

    fn into_iter(self) -> Self::IntoIter {
        self.classes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_ordering() {
        let mut labels = vec![
            ClassLabel::from("b"),
            ClassLabel::from(10),
            ClassLabel::from("a"),
            ClassLabel::from(-1),
        ];
        labels.sort();
        assert_eq!(
            labels,
            vec![
                ClassLabel::Index(-1),
                ClassLabel::Index(10),
                ClassLabel::Name("a".into()),
                ClassLabel::Name("b".into()),
            ]
        );
    }

    #[test]
    fn test_label_deserialize_numeric_strings() {
        let a: ClassLabel = serde_json::from_str("3").unwrap();
        let b: ClassLabel = serde_json::from_str("\"3\"").unwrap();
        let c: ClassLabel = serde_json::from_str("\"cat\"").unwrap();
        assert_eq!(a, ClassLabel::Index(3));
        assert_eq!(a, b);
        assert_eq!(c, ClassLabel::Name("cat".into()));
    }

    #[test]
    fn test_numeric_names_are_indices() {
        assert_eq!(ClassLabel::from("3"), ClassLabel::Index(3));
        assert_eq!(ClassLabel::from(String::from("-2")), ClassLabel::Index(-2));
        assert_eq!(ClassLabel::from("3a"), ClassLabel::Name("3a".into()));
    }

    #[test]
    fn test_record_survives_json_round_trip() {
        let record = ExplanationRecord::new()
            .with_class("3", ClassExplanation::new(0.7, [("a", 0.5)]))
            .with_class("spam", ClassExplanation::new(0.3, [("b", 0.25)]))
            .with_class(4, ClassExplanation::new(0.0, Vec::<(String, f64)>::new()));

        let json = serde_json::to_string(&record).unwrap();
        let back: ExplanationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
        assert!(back.get(&ClassLabel::Index(3)).is_some());
    }

    #[test]
    fn test_record_from_json() {
        let json = r#"{"1": {"confidence": 0.9, "features": [["age", 0.4], ["income", 0.1]]}}"#;
        let record: ExplanationRecord = serde_json::from_str(json).unwrap();
        let class = record.get(&ClassLabel::Index(1)).unwrap();
        assert_eq!(class.confidence, 0.9);
        let ranked: Vec<_> = class.ranked().collect();
        assert_eq!(ranked, vec![(1, "age", 0.4), (2, "income", 0.1)]);
    }

    #[test]
    fn test_record_missing_field_is_rejected() {
        let json = r#"{"1": {"features": []}}"#;
        assert!(serde_json::from_str::<ExplanationRecord>(json).is_err());
        let json = r#"{"1": {"confidence": 0.5}}"#;
        assert!(serde_json::from_str::<ExplanationRecord>(json).is_err());
    }

    #[test]
    fn test_validate() {
        let ok = ExplanationRecord::new().with_class(0, ClassExplanation::new(1.0, [("a", 0.2)]));
        assert!(ok.validate().is_ok());

        let bad = ExplanationRecord::new().with_class(0, ClassExplanation::new(1.5, [("a", 0.2)]));
        assert!(matches!(bad.validate(), Err(XaiError::MalformedRecord(_))));

        let nan = ExplanationRecord::new()
            .with_class(0, ClassExplanation::new(0.5, [("a", f64::NAN)]));
        assert!(matches!(nan.validate(), Err(XaiError::MalformedRecord(_))));
    }
}
