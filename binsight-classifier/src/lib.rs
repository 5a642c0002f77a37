//! Multinomial naive Bayes classifier for item descriptions.
//!
//! The model file is a labelled corpus:
//!
//! ```json
//! { "smoothing": 1.0, "docs": [ { "label": "Compost", "text": "banana peel" } ] }
//! ```
//!
//! It is fitted once when loaded; classification afterwards only reads the fitted counts.

mod tokenize;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use binsight_core::{Category, ClassifierPort, PortError};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::tokenize::tokenize;

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading or fitting a model.
pub enum ClassifierError {
    /// The model file could not be read.
    #[error("Cannot read model {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The model file is not valid JSON for a model.
    #[error("Malformed model: {0}")]
    Parse(#[from] serde_json::Error),
    /// A document carries a label outside the category set.
    #[error("Unknown label {0:?} in model")]
    UnknownLabel(String),
    /// A category has no training documents.
    #[error("No training documents for {0}")]
    MissingCategory(Category),
    /// The smoothing constant is not a positive number.
    #[error("Smoothing must be positive, got {0}")]
    InvalidSmoothing(f64),
}

/// One labelled training document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelledDoc {
    /// Category label, e.g. `Recycling`.
    pub label: String,
    /// Example description.
    pub text: String,
}

/// Serialized model: a labelled corpus plus the smoothing constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    /// Additive smoothing applied to token counts.
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    /// Training documents.
    pub docs: Vec<LabelledDoc>,
}

const fn default_smoothing() -> f64 {
    1.0
}

#[derive(Debug, Default)]
struct ClassStats {
    docs: u64,
    tokens: u64,
    counts: HashMap<String, u64>,
}

/// Fitted classifier, immutable after construction.
#[derive(Debug)]
pub struct NaiveBayes {
    smoothing: f64,
    total_docs: u64,
    vocabulary: HashSet<String>,
    classes: Vec<(Category, ClassStats)>,
}

impl NaiveBayes {
    /// Read a model file and fit it.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifierError`] when the file is missing, malformed, or unusable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: ModelFile = serde_json::from_str(&raw)?;
        let fitted = Self::from_model(&model)?;

        info!(
            path = %path.display(),
            docs = fitted.total_docs,
            vocabulary = fitted.vocabulary.len(),
            "classifier model loaded"
        );
        Ok(fitted)
    }

    /// Fit a classifier from an in-memory model.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifierError`] for unknown labels, categories without documents, or a
    /// non-positive smoothing constant.
    pub fn from_model(model: &ModelFile) -> Result<Self, ClassifierError> {
        if !(model.smoothing.is_finite() && model.smoothing > 0.0) {
            return Err(ClassifierError::InvalidSmoothing(model.smoothing));
        }

        let mut stats: HashMap<Category, ClassStats> = HashMap::new();
        let mut vocabulary = HashSet::new();

        for doc in &model.docs {
            let Ok(category) = doc.label.parse::<Category>() else {
                return Err(ClassifierError::UnknownLabel(doc.label.clone()));
            };
            let entry = stats.entry(category).or_default();
            entry.docs += 1;

            for token in tokenize(&doc.text) {
                entry.tokens += 1;
                *entry.counts.entry(token.clone()).or_default() += 1;
                vocabulary.insert(token);
            }
        }

        let mut classes = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let class = stats
                .remove(&category)
                .ok_or(ClassifierError::MissingCategory(category))?;
            classes.push((category, class));
        }

        Ok(Self {
            smoothing: model.smoothing,
            total_docs: classes.iter().map(|(_, class)| class.docs).sum(),
            vocabulary,
            classes,
        })
    }

    /// Pick the most likely category for `text`.
    ///
    /// Tokens never seen in training are ignored; text without known tokens gets the
    /// category with the most training documents. Ties go to the earlier category in
    /// [`Category::ALL`].
    #[must_use]
    pub fn classify(&self, text: &str) -> Category {
        let tokens: Vec<String> = tokenize(text)
            .into_iter()
            .filter(|token| self.vocabulary.contains(token))
            .collect();

        let mut best: Option<(Category, f64)> = None;
        for (category, class) in &self.classes {
            let score = self.log_score(class, &tokens);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((*category, score));
            }
        }

        best.map_or(Category::Trash, |(category, _)| category)
    }

    #[expect(clippy::cast_precision_loss, reason = "corpus counts stay far below 2^52")]
    fn log_score(&self, class: &ClassStats, tokens: &[String]) -> f64 {
        let prior = (class.docs as f64 / self.total_docs as f64).ln();
        let denominator = class.tokens as f64 + self.smoothing * self.vocabulary.len() as f64;

        tokens.iter().fold(prior, |score, token| {
            let count = class.counts.get(token).copied().unwrap_or(0) as f64;
            score + ((count + self.smoothing) / denominator).ln()
        })
    }
}

impl ClassifierPort for NaiveBayes {
    fn classify(&self, text: &str) -> Result<Category, PortError> {
        Ok(Self::classify(self, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(label: &str, text: &str) -> LabelledDoc {
        LabelledDoc {
            label: label.to_owned(),
            text: text.to_owned(),
        }
    }

    fn corpus() -> ModelFile {
        ModelFile {
            smoothing: 1.0,
            docs: vec![
                doc("Compost", "banana peel"),
                doc("Compost", "apple core"),
                doc("Compost", "coffee grounds"),
                doc("Recycling", "plastic bottle"),
                doc("Recycling", "aluminum can"),
                doc("Recycling", "cardboard box"),
                doc("Trash", "chip bag"),
                doc("Trash", "styrofoam cup"),
                doc("Trash", "used diaper"),
            ],
        }
    }

    #[test]
    fn classifies_known_descriptions() {
        let model = NaiveBayes::from_model(&corpus()).expect("valid corpus");

        assert_eq!(model.classify("banana peel"), Category::Compost, "exact doc");
        assert_eq!(
            model.classify("Empty plastic bottles"),
            Category::Recycling,
            "plural and unseen word"
        );
        assert_eq!(model.classify("a styrofoam cup"), Category::Trash, "stop word");
        assert_eq!(
            model.classify("old cardboard boxes"),
            Category::Recycling,
            "es plural"
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let model = NaiveBayes::from_model(&corpus()).expect("valid corpus");
        let first = model.classify("brown banana");
        for _ in 0..100 {
            assert_eq!(model.classify("brown banana"), first, "same text, same label");
        }
    }

    #[test]
    fn unknown_text_falls_back_to_first_category_on_even_prior() {
        let model = NaiveBayes::from_model(&corpus()).expect("valid corpus");
        assert_eq!(model.classify("zzz qqq"), Category::Trash, "unseen tokens");
        assert_eq!(model.classify(""), Category::Trash, "empty text");
    }

    #[test]
    fn unknown_text_follows_larger_prior() {
        let mut model = corpus();
        model.docs.push(doc("Recycling", "glass jar"));
        let fitted = NaiveBayes::from_model(&model).expect("valid corpus");
        assert_eq!(
            fitted.classify("something unheard of"),
            Category::Recycling,
            "largest class wins without evidence"
        );
    }

    #[test]
    fn port_wraps_classification() {
        let model = NaiveBayes::from_model(&corpus()).expect("valid corpus");
        let port: &dyn ClassifierPort = &model;
        assert_eq!(
            port.classify("apple core").ok(),
            Some(Category::Compost),
            "port returns the inherent label"
        );
    }

    #[test]
    fn rejects_unknown_label() {
        let mut model = corpus();
        model.docs.push(doc("Landfill", "old shoe"));
        assert!(
            matches!(
                NaiveBayes::from_model(&model),
                Err(ClassifierError::UnknownLabel(label)) if label == "Landfill"
            ),
            "labels outside the category set are rejected"
        );
    }

    #[test]
    fn rejects_missing_category() {
        let mut model = corpus();
        model.docs.retain(|doc| doc.label != "Trash");
        assert!(
            matches!(
                NaiveBayes::from_model(&model),
                Err(ClassifierError::MissingCategory(Category::Trash))
            ),
            "every category needs documents"
        );
    }

    #[test]
    fn rejects_non_positive_smoothing() {
        let mut model = corpus();
        model.smoothing = 0.0;
        assert!(
            matches!(
                NaiveBayes::from_model(&model),
                Err(ClassifierError::InvalidSmoothing(_))
            ),
            "zero smoothing is rejected"
        );
    }

    #[test]
    fn smoothing_defaults_when_absent() {
        let model: ModelFile =
            serde_json::from_str(r#"{"docs":[{"label":"Trash","text":"gum"}]}"#).expect("json");
        assert!(
            (model.smoothing - 1.0).abs() < f64::EPSILON,
            "smoothing defaults to 1.0"
        );
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(
            matches!(
                NaiveBayes::load("/definitely/not/here/classifier.json"),
                Err(ClassifierError::Io { .. })
            ),
            "missing file is an io error"
        );
    }

    #[test]
    fn loads_bundled_model() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../models/classifier.json");
        let model = NaiveBayes::load(path).expect("bundled model loads");

        assert_eq!(model.classify("banana peel"), Category::Compost, "food scrap");
        assert_eq!(
            model.classify("aluminum soda can"),
            Category::Recycling,
            "metal can"
        );
        assert_eq!(
            model.classify("plastic chip bag"),
            Category::Trash,
            "mixed film packaging"
        );
    }
}
