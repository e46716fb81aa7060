pub mod artifact;
pub mod explain;
pub mod models;
pub mod prediction;

pub use artifact::{ArtifactStore, TrainedArtifact};
pub use prediction::{BatchPrediction, ColumnMapping, Prediction, Predictor};
