use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdsightError {
    #[error("Degenerate feature subset: {0}")]
    DegenerateSubset(String),

    #[error("Cannot stratify split: class '{class}' has only {count} sample(s)")]
    SplitStratificationFailure { class: String, count: usize },

    #[error("Attribution shape mismatch: {attributions} attribution value(s) for {features} feature(s)")]
    AttributionShapeMismatch { attributions: usize, features: usize },

    #[error("Additive identity violated: model score {expected}, baseline + attributions = {reconstructed}")]
    AttributionIdentityViolation { expected: f64, reconstructed: f64 },

    #[error("Artifact integrity error: {0}")]
    ArtifactIntegrity(String),

    #[error("Selection cancelled after {completed_generations} generation(s)")]
    Cancelled { completed_generations: usize },

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IdsightError>;
