use crate::data::{LabelEncoder, StandardScaler};
use crate::error::{IdsightError, Result};
use crate::ml::models::{Classifier, RandomForest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Everything needed to reproduce a prediction: the model, the scaler it
/// was trained behind, the label mapping and the selected feature order.
///
/// The four parts are checked against each other on construction and on
/// load; an artifact that exists is always consistent. It is never mutated
/// after construction, so it can be shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainedArtifact {
    model: RandomForest,
    scaler: StandardScaler,
    labels: LabelEncoder,
    selected_features: Vec<String>,
    trained_at: DateTime<Utc>,
    #[serde(skip)]
    scaler_columns: Vec<usize>,
}

impl TrainedArtifact {
    pub fn new(
        model: RandomForest,
        scaler: StandardScaler,
        labels: LabelEncoder,
        selected_features: Vec<String>,
    ) -> Result<Self> {
        Self::assemble(model, scaler, labels, selected_features, Utc::now())
    }

    fn assemble(
        model: RandomForest,
        scaler: StandardScaler,
        labels: LabelEncoder,
        selected_features: Vec<String>,
        trained_at: DateTime<Utc>,
    ) -> Result<Self> {
        if selected_features.is_empty() {
            return Err(IdsightError::ArtifactIntegrity(
                "no selected features".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = selected_features.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(IdsightError::ArtifactIntegrity(format!(
                "feature '{}' selected twice",
                dup
            )));
        }
        model.check_structure().map_err(|e| match e {
            IdsightError::Validation(msg) => {
                IdsightError::ArtifactIntegrity(format!("model is corrupted: {}", msg))
            }
            other => other,
        })?;
        if model.n_features() != selected_features.len() {
            return Err(IdsightError::ArtifactIntegrity(format!(
                "model expects {} features but {} are selected",
                model.n_features(),
                selected_features.len()
            )));
        }
        if model.n_classes() != labels.n_classes() {
            return Err(IdsightError::ArtifactIntegrity(format!(
                "model predicts {} classes but the label mapping has {}",
                model.n_classes(),
                labels.n_classes()
            )));
        }

        let scaler_columns = selected_features
            .iter()
            .map(|name| {
                scaler
                    .feature_names()
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| {
                        IdsightError::ArtifactIntegrity(format!(
                            "selected feature '{}' is unknown to the scaler",
                            name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            model,
            scaler,
            labels,
            selected_features,
            trained_at,
            scaler_columns,
        })
    }

    pub fn model(&self) -> &RandomForest {
        &self.model
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    pub fn selected_features(&self) -> &[String] {
        &self.selected_features
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Scale raw values given in selected-feature order into model input.
    pub fn prepare_row(&self, raw_values: &[f64]) -> Result<Vec<f64>> {
        if raw_values.len() != self.selected_features.len() {
            return Err(IdsightError::ArtifactIntegrity(format!(
                "got {} values for {} selected features",
                raw_values.len(),
                self.selected_features.len()
            )));
        }
        self.scaler.transform_subset(&self.scaler_columns, raw_values)
    }
}

/// On-disk shape. Every part is optional here so a missing one can be
/// reported by name instead of as a generic parse error.
#[derive(Deserialize)]
struct ArtifactDocument {
    model: Option<RandomForest>,
    scaler: Option<StandardScaler>,
    labels: Option<LabelEncoder>,
    selected_features: Option<Vec<String>>,
    trained_at: Option<DateTime<Utc>>,
}

fn require<T>(part: Option<T>, name: &str) -> Result<T> {
    part.ok_or_else(|| IdsightError::ArtifactIntegrity(format!("artifact is missing '{}'", name)))
}

/// Persists a [`TrainedArtifact`] as one JSON document.
pub struct ArtifactStore;

impl ArtifactStore {
    pub fn to_json(artifact: &TrainedArtifact) -> Result<String> {
        Ok(serde_json::to_string_pretty(artifact)?)
    }

    pub fn from_json(json: &str) -> Result<TrainedArtifact> {
        let document: ArtifactDocument = serde_json::from_str(json)?;
        TrainedArtifact::assemble(
            require(document.model, "model")?,
            require(document.scaler, "scaler")?,
            require(document.labels, "labels")?,
            require(document.selected_features, "selected_features")?,
            require(document.trained_at, "trained_at")?,
        )
    }

    pub fn save<P: AsRef<Path>>(artifact: &TrainedArtifact, path: P) -> Result<()> {
        std::fs::write(&path, Self::to_json(artifact)?)?;
        log::info!("Saved model artifact to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<TrainedArtifact> {
        let json = std::fs::read_to_string(&path)?;
        let artifact = Self::from_json(&json)?;
        log::info!(
            "Loaded model artifact from {} ({} features, {} classes, trained {})",
            path.as_ref().display(),
            artifact.selected_features.len(),
            artifact.labels.n_classes(),
            artifact.trained_at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(artifact)
    }
}
