use anyhow::{bail, Context};
use idsight::config::ConfigManager;
use idsight::engines::selection::LogProgressCallback;
use idsight::pipeline::PipelineSession;

const USAGE: &str = "usage: idsight <dataset.csv> [config.toml] [artifact-out.json]";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(dataset_path) = args.first() else {
        bail!(USAGE);
    };

    let manager = ConfigManager::new();
    if let Some(config_path) = args.get(1) {
        manager
            .load_from_file(config_path)
            .with_context(|| format!("loading configuration from {}", config_path))?;
    }

    let mut session = PipelineSession::new(manager.get())?;
    let summary = session
        .load_dataset(dataset_path)
        .with_context(|| format!("loading dataset {}", dataset_path))?;
    for (class, count) in &summary.class_counts {
        log::info!("  {:<24} {:>8}", class, count);
    }

    let selection = session.run_selection(&mut LogProgressCallback)?;
    log::info!(
        "Selected features ({}/{}): {}",
        selection.selected_features.len(),
        selection.total_features,
        selection.selected_features.join(", ")
    );

    let metrics = session.train()?;
    log::info!(
        "Accuracy {:.4} | Precision {:.4} | Recall {:.4} | F1 {:.4}",
        metrics.accuracy,
        metrics.precision,
        metrics.recall,
        metrics.f1_score
    );
    log::info!("Confusion matrix (rows = true, columns = predicted):\n{}", metrics.confusion_matrix);

    let predictor = session.predictor()?;
    if let Some(&row) = session.test_rows().first() {
        let raw = session.raw_row_for_artifact(row)?;
        let prediction = predictor.predict_row(&raw)?;
        println!("{}", predictor.explain(&prediction));
    }

    if let Some(out) = args.get(2) {
        session
            .save_artifact(out)
            .with_context(|| format!("saving artifact to {}", out))?;
    }

    Ok(())
}
