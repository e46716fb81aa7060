pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod ml;
pub mod pipeline;
pub mod types;

pub use error::{IdsightError, Result};
pub use types::{FeatureMatrix, LabelVector};
