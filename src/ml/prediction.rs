use super::artifact::TrainedArtifact;
use super::explain::{RawAttribution, TreeShapExplainer};
use super::models::{argmax, runner_up, Classifier};
use crate::config::ExplanationConfig;
use crate::data::CsvConnector;
use crate::engines::explanation::{
    Explanation, ExplanationGenerator, ExplanationReport, ExplanationRequest,
};
use crate::error::{IdsightError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One classified row. `raw_values` are the inputs before scaling, in
/// selected-feature order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    pub probabilities: Vec<f64>,
    pub is_attack: bool,
    pub raw_values: Vec<f64>,
    pub model_input: Vec<f64>,
}

impl Prediction {
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .get(self.class_index)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Maps every selected feature to a column of an uploaded table by exact
/// name. Resolved once per table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    sources: Vec<Option<usize>>,
}

impl ColumnMapping {
    pub fn resolve(selected_features: &[String], uploaded_columns: &[String]) -> Self {
        let sources = selected_features
            .iter()
            .map(|feature| uploaded_columns.iter().position(|c| c == feature))
            .collect();
        Self { sources }
    }

    pub fn sources(&self) -> &[Option<usize>] {
        &self.sources
    }

    pub fn unmapped<'a>(&self, selected_features: &'a [String]) -> Vec<&'a str> {
        selected_features
            .iter()
            .zip(&self.sources)
            .filter(|(_, source)| source.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.sources.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchPrediction {
    /// `(input row index, prediction)` for every row that could be read.
    pub predictions: Vec<(usize, Prediction)>,
    pub rows_dropped: usize,
    pub attack_count: usize,
    pub benign_count: usize,
}

/// Read-only front end over a shared artifact.
pub struct Predictor {
    artifact: Arc<TrainedArtifact>,
    generator: ExplanationGenerator,
    benign_label: String,
}

impl Predictor {
    pub fn new(artifact: Arc<TrainedArtifact>, config: &ExplanationConfig) -> Self {
        Self {
            artifact,
            generator: ExplanationGenerator::new(config),
            benign_label: config.benign_label.clone(),
        }
    }

    pub fn artifact(&self) -> &Arc<TrainedArtifact> {
        &self.artifact
    }

    /// Classify raw values given in selected-feature order.
    pub fn predict_row(&self, raw_values: &[f64]) -> Result<Prediction> {
        if let Some(i) = raw_values.iter().position(|v| !v.is_finite()) {
            return Err(IdsightError::Validation(format!(
                "Value for '{}' is not a finite number",
                self.artifact
                    .selected_features()
                    .get(i)
                    .map_or("?", |s| s.as_str())
            )));
        }
        let model_input = self.artifact.prepare_row(raw_values)?;
        let probabilities = self.artifact.model().predict_proba(&model_input);
        let class_index = argmax(&probabilities);
        let label = self.artifact.labels().decode(class_index)?.to_string();

        Ok(Prediction {
            class_index,
            is_attack: label != self.benign_label,
            label,
            probabilities,
            raw_values: raw_values.to_vec(),
            model_input,
        })
    }

    /// Classify every row of an uploaded table. Selected features with no
    /// matching column read as 0.0; rows whose mapped values are missing or
    /// not numeric are dropped.
    pub fn predict_batch(&self, df: &DataFrame) -> Result<BatchPrediction> {
        let selected = self.artifact.selected_features();
        let uploaded: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mapping = ColumnMapping::resolve(selected, &uploaded);
        let unmapped = mapping.unmapped(selected);
        if !unmapped.is_empty() {
            log::warn!(
                "{} selected feature(s) missing from the upload, using 0.0: {}",
                unmapped.len(),
                unmapped.join(", ")
            );
        }

        let mut columns: Vec<Option<Vec<Option<f64>>>> = Vec::with_capacity(selected.len());
        for source in mapping.sources() {
            let column = match source {
                Some(idx) => {
                    let series = df.column(&uploaded[*idx])?.cast(&DataType::Float64)?;
                    let values = series
                        .f64()?
                        .into_iter()
                        .map(|v| v.filter(|x| x.is_finite()))
                        .collect();
                    Some(values)
                }
                None => None,
            };
            columns.push(column);
        }

        let mut batch = BatchPrediction {
            predictions: Vec::with_capacity(df.height()),
            rows_dropped: 0,
            attack_count: 0,
            benign_count: 0,
        };
        for row in 0..df.height() {
            let values: Option<Vec<f64>> = columns
                .iter()
                .map(|column| match column {
                    Some(values) => values[row],
                    None => Some(0.0),
                })
                .collect();
            let Some(values) = values else {
                batch.rows_dropped += 1;
                continue;
            };
            let prediction = self.predict_row(&values)?;
            if prediction.is_attack {
                batch.attack_count += 1;
            } else {
                batch.benign_count += 1;
            }
            batch.predictions.push((row, prediction));
        }

        if batch.rows_dropped > 0 {
            log::warn!(
                "Dropped {} of {} uploaded rows with missing or non-numeric values",
                batch.rows_dropped,
                df.height()
            );
        }
        log::info!(
            "Batch prediction: {} attack, {} benign",
            batch.attack_count,
            batch.benign_count
        );
        Ok(batch)
    }

    pub fn predict_csv<P: AsRef<Path>>(&self, path: P) -> Result<BatchPrediction> {
        let df = CsvConnector::load(path)?;
        self.predict_batch(&df)
    }

    /// Attribute the predicted class score to the selected features and
    /// check the decomposition against the model's own probability.
    pub fn try_explain(&self, prediction: &Prediction) -> Result<ExplanationReport> {
        let request_parts = self.explanation_parts(prediction)?;
        self.generator.try_explain(&request_parts.request(prediction, self))
    }

    /// Never fails; problems yield [`Explanation::Unavailable`].
    pub fn explain(&self, prediction: &Prediction) -> Explanation {
        match self.explanation_parts(prediction) {
            Ok(parts) => self.generator.explain(&parts.request(prediction, self)),
            Err(e) => {
                log::warn!("Explanation unavailable: {}", e);
                Explanation::Unavailable {
                    predicted_label: prediction.label.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn explanation_parts(&self, prediction: &Prediction) -> Result<ExplanationParts> {
        let model = self.artifact.model();
        if prediction.model_input.len() != model.n_features() {
            return Err(IdsightError::AttributionShapeMismatch {
                attributions: prediction.model_input.len(),
                features: model.n_features(),
            });
        }
        let shap = TreeShapExplainer::new(model).shap_values(&prediction.model_input);
        let attribution =
            RawAttribution::from(shap).normalize(prediction.class_index, model.n_features())?;

        let other_label = match runner_up(&prediction.probabilities, prediction.class_index) {
            Some(other) => self.artifact.labels().decode(other)?.to_string(),
            None => "other".to_string(),
        };

        Ok(ExplanationParts {
            attribution: attribution.per_feature,
            baseline: attribution.baseline,
            other_label,
        })
    }
}

struct ExplanationParts {
    attribution: Vec<f64>,
    baseline: f64,
    other_label: String,
}

impl ExplanationParts {
    fn request<'a>(
        &'a self,
        prediction: &'a Prediction,
        predictor: &'a Predictor,
    ) -> ExplanationRequest<'a> {
        ExplanationRequest {
            attribution_values: &self.attribution,
            feature_names: predictor.artifact.selected_features(),
            feature_values: &prediction.raw_values,
            predicted_label: &prediction.label,
            other_label: &self.other_label,
            baseline: self.baseline,
            model_score: Some(prediction.confidence()),
        }
    }
}
