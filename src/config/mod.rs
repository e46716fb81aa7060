pub mod data;
pub mod explanation;
pub mod manager;
pub mod selection;
pub mod traits;
pub mod training;

pub use data::DataConfig;
pub use explanation::ExplanationConfig;
pub use manager::{AppConfig, ConfigManager};
pub use selection::{CrossoverKind, SelectionConfig, SelectionMethod};
pub use training::TrainingConfig;
pub use traits::ConfigSection;
