use crate::error::{IdsightError, Result};
use crate::types::LabelVector;
use serde::{Deserialize, Serialize};

/// Reversible mapping between class names and dense integer codes.
///
/// Classes are kept in lexicographic order, so code `i` always names the
/// `i`-th smallest class string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn from_classes(mut classes: Vec<String>) -> Result<Self> {
        classes.sort();
        classes.dedup();
        if classes.is_empty() {
            return Err(IdsightError::Validation(
                "Label encoder needs at least one class".to_string(),
            ));
        }
        Ok(Self { classes })
    }

    /// Fit on raw labels and encode them in one pass.
    pub fn fit_transform<S: AsRef<str>>(labels: &[S]) -> Result<(Self, LabelVector)> {
        let encoder = Self::from_classes(labels.iter().map(|s| s.as_ref().to_string()).collect())?;
        let codes = labels
            .iter()
            .map(|s| encoder.encode(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let vector = LabelVector::new(codes, encoder.n_classes())?;
        Ok((encoder, vector))
    }

    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| IdsightError::Validation(format!("Unknown class label: {}", label)))
    }

    pub fn decode(&self, code: usize) -> Result<&str> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| IdsightError::Validation(format!("Unknown class code: {}", code)))
    }

    pub fn class_names(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}
