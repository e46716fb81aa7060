use idsight::config::{AppConfig, ConfigManager};
use idsight::data::{CsvConnector, LabelEncoder, LabeledDataset};
use idsight::engines::selection::SilentProgress;
use idsight::ml::{ArtifactStore, ColumnMapping};
use idsight::pipeline::PipelineSession;
use idsight::{FeatureMatrix, IdsightError};
use polars::df;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::Ordering;

const SAMPLE: &str = "tests/data/flows_sample.csv";

fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.selection.population_size = 8;
    config.selection.generations = 3;
    config.selection.fitness_model.n_trees = 4;
    config.training.forest.n_trees = 20;
    config
}

fn synthetic_dataset() -> LabeledDataset {
    let mut rng = StdRng::seed_from_u64(4);
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..90 {
        let (label, centre) = match i % 3 {
            0 => ("Benign", 0.0),
            1 => ("FTP-BruteForce", 4.0),
            _ => ("SSH-Bruteforce", 8.0),
        };
        rows.push(vec![
            centre + rng.gen_range(-1.0..1.0),
            rng.gen_range(0.0..100.0),
            rng.gen_range(0.0..1.0),
        ]);
        labels.push(label);
    }
    let features = FeatureMatrix::from_rows(
        vec!["Fwd Pkt Len Max".into(), "Flow IAT Mean".into(), "Init Win Byts".into()],
        rows,
    )
    .unwrap();
    let (encoder, labels) = LabelEncoder::fit_transform(&labels).unwrap();
    LabeledDataset {
        features,
        labels,
        encoder,
    }
}

#[test]
fn test_csv_fixture_loads_and_cleans() {
    let (dataset, report) =
        CsvConnector::load_dataset(SAMPLE, "Label", &["Timestamp".to_string()]).unwrap();
    assert_eq!(report.rows_read, 60);
    assert_eq!(report.rows_dropped, 3);
    assert_eq!(dataset.features.n_features(), 5);
    assert_eq!(dataset.encoder.class_names(), &["Benign", "Bot", "DDoS"]);

    let summary = dataset.summary();
    assert_eq!(summary.num_rows, 57);
    let counts: Vec<usize> = summary.class_counts.iter().map(|(_, c)| *c).collect();
    assert_eq!(counts, vec![20, 19, 18]);
}

#[test]
fn test_session_runs_end_to_end_from_csv() {
    let mut session = PipelineSession::new(fast_config()).unwrap();
    session.load_dataset(SAMPLE).unwrap();

    let selection = session.run_selection(&mut SilentProgress).unwrap().clone();
    assert!(!selection.selected_features.is_empty());

    let metrics = session.train().unwrap().clone();
    let cm = &metrics.confusion_matrix;
    assert_eq!(cm.labels(), &["Benign", "Bot", "DDoS"]);
    assert_eq!(cm.total(), session.test_rows().len());

    let artifact = session.artifact().unwrap();
    assert_eq!(artifact.selected_features(), selection.selected_features.as_slice());

    let predictor = session.predictor().unwrap();
    let row = session.test_rows()[0];
    let prediction = predictor
        .predict_row(&session.raw_row_for_artifact(row).unwrap())
        .unwrap();
    let explanation = predictor.explain(&prediction);
    assert!(explanation.is_available(), "{}", explanation);
}

#[test]
fn test_confusion_matrix_keeps_every_class() {
    let mut session = PipelineSession::new(fast_config()).unwrap();
    session.set_dataset(synthetic_dataset()).unwrap();
    session.run_selection(&mut SilentProgress).unwrap();
    let metrics = session.train().unwrap().clone();

    let cm = &metrics.confusion_matrix;
    assert_eq!(cm.labels().len(), 3);
    assert_eq!(cm.counts().len(), 3);
    assert!(cm.counts().iter().all(|row| row.len() == 3));
    let row_sums = cm.row_sums();
    assert_eq!(row_sums.iter().sum::<usize>(), session.test_rows().len());
    // 30 rows per class, 20% held out
    assert!(row_sums.iter().all(|&n| n == 6));
    assert!(metrics.accuracy > 0.8);
}

#[test]
fn test_retraining_replaces_artifact() {
    let mut session = PipelineSession::new(fast_config()).unwrap();
    session.set_dataset(synthetic_dataset()).unwrap();
    session.run_selection(&mut SilentProgress).unwrap();
    session.train().unwrap();
    let first = session.artifact().unwrap();

    session.train().unwrap();
    let second = session.artifact().unwrap();
    assert!(!std::sync::Arc::ptr_eq(&first, &second));
    // The old handle still works for readers that hold it
    assert_eq!(first.selected_features(), second.selected_features());
}

#[test]
fn test_artifact_save_and_load_through_session() {
    let dir = std::env::temp_dir().join(format!("idsight-artifact-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("model.json");

    let mut session = PipelineSession::new(fast_config()).unwrap();
    session.set_dataset(synthetic_dataset()).unwrap();
    session.run_selection(&mut SilentProgress).unwrap();
    session.train().unwrap();
    session.save_artifact(&path).unwrap();

    let original = session.predictor().unwrap();
    let raw = session.raw_row_for_artifact(0).unwrap();
    let expected = original.predict_row(&raw).unwrap();

    let mut fresh = PipelineSession::new(fast_config()).unwrap();
    fresh.load_artifact(&path).unwrap();
    let restored = fresh.predictor().unwrap().predict_row(&raw).unwrap();
    assert_eq!(restored.label, expected.label);

    let loaded = ArtifactStore::load(&path).unwrap();
    assert_eq!(loaded.labels().class_names().len(), 3);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_batch_prediction_with_partial_upload() {
    let mut session = PipelineSession::new(fast_config()).unwrap();
    session.set_dataset(synthetic_dataset()).unwrap();
    session.run_selection(&mut SilentProgress).unwrap();
    session.train().unwrap();
    let predictor = session.predictor().unwrap();
    let selected = predictor.artifact().selected_features().to_vec();

    // Upload carries only the first selected feature plus an unrelated column
    let df = df! {
        selected[0].as_str() => &[1.0, f64::NAN, 7.5],
        "Src IP" => &["10.0.0.1", "10.0.0.2", "10.0.0.3"],
    }
    .unwrap();
    let uploaded: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mapping = ColumnMapping::resolve(&selected, &uploaded);
    assert_eq!(mapping.unmapped(&selected).len(), selected.len() - 1);

    let batch = predictor.predict_batch(&df).unwrap();
    assert_eq!(batch.rows_dropped, 1);
    assert_eq!(batch.predictions.len(), 2);
    assert_eq!(batch.attack_count + batch.benign_count, 2);
}

#[test]
fn test_cancelled_session_selection() {
    let mut session = PipelineSession::new(fast_config()).unwrap();
    session.set_dataset(synthetic_dataset()).unwrap();
    session.cancel_flag().store(true, Ordering::SeqCst);
    let result = session.run_selection(&mut SilentProgress);
    assert!(matches!(result, Err(IdsightError::Cancelled { .. })));
    assert!(session.selection().is_none());
}

#[test]
fn test_selection_runs_again_after_cancel() {
    let mut session = PipelineSession::new(fast_config()).unwrap();
    session.set_dataset(synthetic_dataset()).unwrap();
    let flag = session.cancel_flag();
    flag.store(true, Ordering::SeqCst);
    assert!(session.run_selection(&mut SilentProgress).is_err());
    assert!(!flag.load(Ordering::SeqCst));

    let result = session.run_selection(&mut SilentProgress).unwrap();
    assert!(!result.selected_features.is_empty());
    assert!(session.selection().is_some());
}

#[test]
fn test_training_requires_selection() {
    let mut session = PipelineSession::new(fast_config()).unwrap();
    session.set_dataset(synthetic_dataset()).unwrap();
    assert!(matches!(session.train(), Err(IdsightError::Validation(_))));
}

#[test]
fn test_config_file_drives_session() {
    let manager = ConfigManager::new();
    manager
        .load_from_str(
            r#"
            [selection]
            population_size = 6
            generations = 2

            [selection.fitness_model]
            n_trees = 3

            [explanation]
            top_n = 5
            benign_label = "BENIGN"
            "#,
        )
        .unwrap();
    let config = manager.get();
    assert_eq!(config.explanation.benign_label, "BENIGN");

    let mut session = PipelineSession::new(config).unwrap();
    session.set_dataset(synthetic_dataset()).unwrap();
    let result = session.run_selection(&mut SilentProgress).unwrap();
    assert_eq!(result.generations_run, 2);
}
