use crate::config::SelectionConfig;
use crate::engines::selection::{ChannelProgressCallback, GeneticSelector, ProgressMessage, SelectionResult};
use crate::error::{IdsightError, Result};
use crate::types::{FeatureMatrix, LabelVector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Runs a selection on a background thread so a front end can keep polling
/// progress and request cancellation.
pub struct SelectionRunner {
    handle: Option<JoinHandle<Result<SelectionResult>>>,
    progress_rx: Receiver<ProgressMessage>,
    cancel_flag: Arc<AtomicBool>,
}

impl SelectionRunner {
    pub fn start(
        features: FeatureMatrix,
        labels: LabelVector,
        class_names: Vec<String>,
        config: SelectionConfig,
    ) -> Result<Self> {
        let selector = GeneticSelector::new(config)?.with_class_names(class_names);
        let (progress_tx, progress_rx) = channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let selector = selector.with_cancellation(Arc::clone(&cancel_flag));

        let handle = thread::Builder::new()
            .name("feature-selection".to_string())
            .spawn(move || {
                let mut callback = ChannelProgressCallback::new(progress_tx);
                selector.select(&features, &labels, &mut callback)
            })?;

        Ok(Self {
            handle: Some(handle),
            progress_rx,
            cancel_flag,
        })
    }

    /// Drain every progress message received so far.
    pub fn poll_progress(&self) -> Vec<ProgressMessage> {
        self.progress_rx.try_iter().collect()
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Block until the run ends.
    pub fn join(mut self) -> Result<SelectionResult> {
        let handle = self.handle.take().ok_or_else(|| {
            IdsightError::Validation("Selection result already collected".to_string())
        })?;
        handle
            .join()
            .map_err(|_| IdsightError::Validation("Selection thread panicked".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (FeatureMatrix, LabelVector) {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 2) as f64 * 3.0 + (i % 5) as f64 * 0.1, (i % 7) as f64])
            .collect();
        let codes = (0..40).map(|i| i % 2).collect();
        (
            FeatureMatrix::from_rows(vec!["a".into(), "b".into()], rows).unwrap(),
            LabelVector::new(codes, 2).unwrap(),
        )
    }

    fn config() -> SelectionConfig {
        let mut config = SelectionConfig {
            population_size: 4,
            generations: 3,
            ..SelectionConfig::default()
        };
        config.fitness_model.n_trees = 3;
        config
    }

    #[test]
    fn test_runner_completes_and_reports() {
        let (x, y) = data();
        let runner =
            SelectionRunner::start(x, y, vec!["Benign".into(), "Bot".into()], config()).unwrap();
        while !runner.is_finished() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let completed = runner
            .poll_progress()
            .into_iter()
            .filter(|m| matches!(m, ProgressMessage::GenerationComplete { .. }))
            .count();
        assert_eq!(completed, 3);

        let result = runner.join().unwrap();
        assert_eq!(result.generations_run, 3);
    }

    #[test]
    fn test_cancel_before_first_generation_or_finish() {
        let (x, y) = data();
        let runner =
            SelectionRunner::start(x, y, vec!["Benign".into(), "Bot".into()], config()).unwrap();
        runner.cancel();
        match runner.join() {
            Ok(result) => assert!(result.generations_run <= 3),
            Err(IdsightError::Cancelled { completed_generations }) => {
                assert!(completed_generations < 3)
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
}
