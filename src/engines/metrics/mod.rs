pub mod classification;
pub mod confusion;
pub mod engine;

pub use classification::{ClassScores, ClassificationMetrics};
pub use confusion::ConfusionMatrix;
pub use engine::{EvaluationMetrics, MetricsEngine};
