pub mod attribution;
pub mod tree_shap;

pub use attribution::{strip_bias, Attribution, OutputScale, RawAttribution};
pub use tree_shap::{ShapValues, TreeShapExplainer};
