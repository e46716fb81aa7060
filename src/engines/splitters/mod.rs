pub mod stratified;
pub mod types;

pub use stratified::StratifiedSplitter;
pub use types::{DataSplit, SplitConfig};
