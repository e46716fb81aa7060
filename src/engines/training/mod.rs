pub mod trainer;

pub use trainer::{ModelTrainer, TrainingOutcome};
