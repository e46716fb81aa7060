use crate::config::AppConfig;
use crate::data::{CsvConnector, DataValidator, DatasetSummary, LabeledDataset, StandardScaler};
use crate::engines::metrics::EvaluationMetrics;
use crate::engines::selection::{GeneticSelector, ProgressCallback, SelectionResult};
use crate::engines::training::ModelTrainer;
use crate::error::{IdsightError, Result};
use crate::ml::{ArtifactStore, Predictor, TrainedArtifact};
use crate::types::FeatureMatrix;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owns every intermediate result of one analysis: the dataset and its
/// scaled copy, the last selection, the last metrics and the current
/// artifact. Loading a new dataset clears everything downstream of it.
pub struct PipelineSession {
    config: AppConfig,
    dataset: Option<LabeledDataset>,
    scaler: Option<StandardScaler>,
    scaled: Option<FeatureMatrix>,
    selection: Option<SelectionResult>,
    metrics: Option<EvaluationMetrics>,
    test_rows: Vec<usize>,
    artifact: Option<Arc<TrainedArtifact>>,
    cancel: Arc<AtomicBool>,
}

impl PipelineSession {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            dataset: None,
            scaler: None,
            scaled: None,
            selection: None,
            metrics: None,
            test_rows: Vec::new(),
            artifact: None,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn load_dataset<P: AsRef<Path>>(&mut self, path: P) -> Result<DatasetSummary> {
        let (dataset, _report) = CsvConnector::load_dataset(
            path,
            &self.config.data.label_column,
            &self.config.data.excluded_columns,
        )?;
        self.set_dataset(dataset)
    }

    /// Install a dataset and fit the scaler over all of its rows.
    pub fn set_dataset(&mut self, dataset: LabeledDataset) -> Result<DatasetSummary> {
        DataValidator::validate_minimum_rows(&dataset, self.config.data.min_rows)?;
        DataValidator::validate_alignment(&dataset)?;

        let scaler = StandardScaler::fit(&dataset.features)?;
        let scaled = scaler.transform(&dataset.features)?;
        let summary = dataset.summary();
        log::info!(
            "Dataset ready: {} rows, {} features, {} classes",
            summary.num_rows,
            summary.num_features,
            summary.class_counts.len()
        );
        let imbalance = summary.imbalance_ratio();
        if imbalance > self.config.data.max_imbalance_ratio {
            log::warn!(
                "Class distribution is skewed: largest class is {:.1}x the smallest",
                imbalance
            );
        }

        self.dataset = Some(dataset);
        self.scaler = Some(scaler);
        self.scaled = Some(scaled);
        self.selection = None;
        self.metrics = None;
        self.test_rows.clear();
        Ok(summary)
    }

    pub fn dataset(&self) -> Option<&LabeledDataset> {
        self.dataset.as_ref()
    }

    pub fn scaled_features(&self) -> Option<&FeatureMatrix> {
        self.scaled.as_ref()
    }

    /// Shared flag that stops a running selection at its next generation
    /// boundary. The flag is cleared when that run ends, so a cancellation
    /// only ever affects one run.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run_selection<C: ProgressCallback>(&mut self, callback: &mut C) -> Result<&SelectionResult> {
        let (dataset, scaled) = self.prepared()?;
        let selector = GeneticSelector::new(self.config.selection.clone())?
            .with_class_names(dataset.encoder.class_names().to_vec())
            .with_cancellation(Arc::clone(&self.cancel));
        let result = selector.select(scaled, &dataset.labels, callback);
        self.cancel.store(false, Ordering::SeqCst);
        let result = result?;

        self.metrics = None;
        self.test_rows.clear();
        Ok(&*self.selection.insert(result))
    }

    pub fn selection(&self) -> Option<&SelectionResult> {
        self.selection.as_ref()
    }

    /// Train the final model on the selected features and publish a fresh
    /// artifact. The previous artifact, if any, is replaced, not modified.
    pub fn train(&mut self) -> Result<&EvaluationMetrics> {
        let selection = self.selection.as_ref().ok_or_else(|| {
            IdsightError::Validation("Run feature selection before training".to_string())
        })?;
        let (dataset, scaled) = self.prepared()?;
        let scaler = self
            .scaler
            .as_ref()
            .ok_or_else(|| IdsightError::Validation("No scaler fitted".to_string()))?;

        let projected = scaled.project(&selection.selected_indices())?;
        let trainer = ModelTrainer::new(self.config.training.clone())?;
        let outcome =
            trainer.train_and_evaluate(&projected, &dataset.labels, dataset.encoder.class_names())?;

        let artifact = TrainedArtifact::new(
            outcome.model,
            scaler.clone(),
            dataset.encoder.clone(),
            selection.selected_features.clone(),
        )?;

        self.artifact = Some(Arc::new(artifact));
        self.test_rows = outcome.split.holdout;
        Ok(&*self.metrics.insert(outcome.metrics))
    }

    pub fn metrics(&self) -> Option<&EvaluationMetrics> {
        self.metrics.as_ref()
    }

    pub fn artifact(&self) -> Option<Arc<TrainedArtifact>> {
        self.artifact.clone()
    }

    pub fn predictor(&self) -> Result<Predictor> {
        let artifact = self
            .artifact
            .clone()
            .ok_or_else(|| IdsightError::Validation("No trained model available".to_string()))?;
        Ok(Predictor::new(artifact, &self.config.explanation))
    }

    pub fn load_artifact<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<TrainedArtifact>> {
        let artifact = Arc::new(ArtifactStore::load(path)?);
        self.artifact = Some(Arc::clone(&artifact));
        self.metrics = None;
        self.test_rows.clear();
        Ok(artifact)
    }

    pub fn save_artifact<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let artifact = self
            .artifact
            .as_ref()
            .ok_or_else(|| IdsightError::Validation("No trained model to save".to_string()))?;
        ArtifactStore::save(artifact, path)
    }

    /// Row indices of the last training run's test partition.
    pub fn test_rows(&self) -> &[usize] {
        &self.test_rows
    }

    /// Raw (unscaled) values of a dataset row, in the artifact's
    /// selected-feature order.
    pub fn raw_row_for_artifact(&self, row: usize) -> Result<Vec<f64>> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| IdsightError::Validation("No dataset loaded".to_string()))?;
        let artifact = self
            .artifact
            .as_ref()
            .ok_or_else(|| IdsightError::Validation("No trained model available".to_string()))?;
        if row >= dataset.features.n_rows() {
            return Err(IdsightError::Validation(format!(
                "Row {} out of range for {} rows",
                row,
                dataset.features.n_rows()
            )));
        }
        artifact
            .selected_features()
            .iter()
            .map(|name| {
                dataset
                    .features
                    .column_index(name)
                    .map(|c| dataset.features.get(row, c))
                    .ok_or_else(|| {
                        IdsightError::ArtifactIntegrity(format!(
                            "dataset has no column '{}'",
                            name
                        ))
                    })
            })
            .collect()
    }

    fn prepared(&self) -> Result<(&LabeledDataset, &FeatureMatrix)> {
        match (self.dataset.as_ref(), self.scaled.as_ref()) {
            (Some(dataset), Some(scaled)) => Ok((dataset, scaled)),
            _ => Err(IdsightError::Validation("No dataset loaded".to_string())),
        }
    }
}
