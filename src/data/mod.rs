pub mod connectors;
pub mod encoder;
pub mod scaler;

pub use connectors::{CsvConnector, DataValidator, DatasetSummary, LabeledDataset, LoadReport};
pub use encoder::LabelEncoder;
pub use scaler::StandardScaler;
