pub mod generator;

pub use generator::{
    Contributor, Explanation, ExplanationGenerator, ExplanationReport, ExplanationRequest, Verdict,
};
