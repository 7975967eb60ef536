//! Sentiment classifier seam and the linear bag-of-words model behind it.
//!
//! The model artifact is JSON produced by the training pipeline:
//!
//! ```json
//! {
//!   "vocabulary": {"great": 0, "awful": 1},
//!   "classes": ["negative", "neutral", "positive"],
//!   "coefficients": [[-0.2, 1.4], [0.0, 0.1], [1.3, -0.9]],
//!   "intercepts": [0.0, 0.1, -0.05]
//! }
//! ```
//!
//! Prediction counts vocabulary terms in the text, scores every class as
//! `coefficients[c] · counts + intercepts[c]` and returns the best class.

use std::collections::HashMap;
use std::path::Path;

use harvest_common::SentimentLabel;
use serde::Deserialize;
use tracing::info;

use crate::error::{LabelError, Result};

pub trait SentimentClassifier: Send + Sync {
    /// Top predicted label for one post's text.
    fn predict(&self, text: &str) -> Result<SentimentLabel>;
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    vocabulary: HashMap<String, usize>,
    classes: Vec<String>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    vocabulary: HashMap<String, usize>,
    classes: Vec<SentimentLabel>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LinearModel {
    /// Load and validate a model artifact.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| LabelError::io(path, e))?;
        let model = Self::from_json(&raw).map_err(|reason| LabelError::Model {
            path: path.to_path_buf(),
            reason,
        })?;
        info!(
            path = %path.display(),
            features = model.vocabulary.len(),
            classes = model.classes.len(),
            "Loaded classifier"
        );
        Ok(model)
    }

    pub fn from_json(raw: &str) -> std::result::Result<Self, String> {
        let file: ModelFile = serde_json::from_str(raw).map_err(|e| e.to_string())?;

        let classes = file
            .classes
            .iter()
            .map(|name| SentimentLabel::from_name(name).map_err(|e| e.to_string()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if classes.is_empty() {
            return Err("model has no classes".into());
        }
        if file.coefficients.len() != classes.len() || file.intercepts.len() != classes.len() {
            return Err(format!(
                "{} classes but {} coefficient rows and {} intercepts",
                classes.len(),
                file.coefficients.len(),
                file.intercepts.len()
            ));
        }
        let features = file.vocabulary.values().max().map_or(0, |m| m + 1);
        if let Some(row) = file.coefficients.iter().find(|row| row.len() < features) {
            return Err(format!(
                "coefficient row has {} weights, vocabulary needs {features}",
                row.len()
            ));
        }

        Ok(Self {
            vocabulary: file.vocabulary,
            classes,
            coefficients: file.coefficients,
            intercepts: file.intercepts,
        })
    }

    fn scores(&self, counts: &HashMap<usize, f64>) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, intercept)| {
                counts
                    .iter()
                    .map(|(&idx, count)| row[idx] * count)
                    .sum::<f64>()
                    + intercept
            })
            .collect()
    }
}

impl SentimentClassifier for LinearModel {
    fn predict(&self, text: &str) -> Result<SentimentLabel> {
        if text.trim().is_empty() {
            return Err(LabelError::Classifier("cannot classify empty text".into()));
        }

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_default() += 1.0;
            }
        }

        let scores = self.scores(&counts);
        // First maximum wins, so ties go to the lowest class index.
        let mut best = 0;
        for (idx, score) in scores.iter().enumerate() {
            if score.is_nan() {
                return Err(LabelError::Classifier("model produced NaN score".into()));
            }
            if *score > scores[best] {
                best = idx;
            }
        }
        Ok(self.classes[best])
    }
}

/// Lowercase and split on anything that is not alphanumeric, `#` or `'`.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '#' || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
