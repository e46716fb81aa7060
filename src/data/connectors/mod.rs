mod csv;
mod types;
mod validator;

pub use csv::CsvConnector;
pub use types::{DatasetSummary, LabeledDataset, LoadReport};
pub use validator::DataValidator;
