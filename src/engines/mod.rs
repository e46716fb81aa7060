pub mod explanation;
pub mod metrics;
pub mod selection;
pub mod splitters;
pub mod training;
