use crate::error::{IdsightError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Dense numeric feature table with a fixed, ordered list of feature names.
///
/// Values are stored row-major. The name list is established once when the
/// matrix is built and every later stage addresses columns by index into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    feature_names: Vec<String>,
    values: Vec<f64>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Build from row vectors. Rejects duplicated names, ragged rows and
    /// non-finite values.
    pub fn from_rows(feature_names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = feature_names.len();
        if width == 0 {
            return Err(IdsightError::Validation(
                "Feature matrix needs at least one column".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(width);
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(IdsightError::Validation(format!(
                    "Duplicate feature name: {}",
                    name
                )));
            }
        }

        let n_rows = rows.len();
        let mut values = Vec::with_capacity(n_rows * width);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(IdsightError::Validation(format!(
                    "Row {} has {} values, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(IdsightError::Validation(format!(
                    "Non-finite value at row {}, column '{}'",
                    i, feature_names[j]
                )));
            }
            values.extend(row);
        }

        Ok(Self {
            feature_names,
            values,
            n_rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let width = self.n_features();
        &self.values[i * width..(i + 1) * width]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_features() + col]
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.n_rows).map(|r| self.get(r, col)).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.n_features())
    }

    /// Keep only the given columns, in the given order.
    pub fn project(&self, columns: &[usize]) -> Result<Self> {
        if columns.is_empty() {
            return Err(IdsightError::DegenerateSubset(
                "no columns selected".to_string(),
            ));
        }
        if let Some(&bad) = columns.iter().find(|&&c| c >= self.n_features()) {
            return Err(IdsightError::Validation(format!(
                "Column index {} out of range for {} features",
                bad,
                self.n_features()
            )));
        }

        let feature_names = columns
            .iter()
            .map(|&c| self.feature_names[c].clone())
            .collect();
        let mut values = Vec::with_capacity(self.n_rows * columns.len());
        for row in self.rows() {
            values.extend(columns.iter().map(|&c| row[c]));
        }

        Ok(Self {
            feature_names,
            values,
            n_rows: self.n_rows,
        })
    }

    /// Keep only the given rows, in the given order (duplicates allowed).
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let mut values = Vec::with_capacity(indices.len() * self.n_features());
        for &i in indices {
            values.extend_from_slice(self.row(i));
        }
        Self {
            feature_names: self.feature_names.clone(),
            values,
            n_rows: indices.len(),
        }
    }

    /// True when at least one column takes more than one distinct value.
    pub fn has_varying_column(&self) -> bool {
        (0..self.n_features()).any(|c| {
            let first = self.get(0, c);
            (1..self.n_rows).any(|r| self.get(r, c) != first)
        })
    }
}

/// Integer class codes aligned with the rows of a [`FeatureMatrix`].
///
/// Codes always form the dense range `0..n_classes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVector {
    codes: Vec<usize>,
    n_classes: usize,
}

impl LabelVector {
    pub fn new(codes: Vec<usize>, n_classes: usize) -> Result<Self> {
        if let Some(&bad) = codes.iter().find(|&&c| c >= n_classes) {
            return Err(IdsightError::Validation(format!(
                "Label code {} outside 0..{}",
                bad, n_classes
            )));
        }
        Ok(Self { codes, n_classes })
    }

    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn get(&self, i: usize) -> usize {
        self.codes[i]
    }

    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            codes: indices.iter().map(|&i| self.codes[i]).collect(),
            n_classes: self.n_classes,
        }
    }

    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &c in &self.codes {
            counts[c] += 1;
        }
        counts
    }

    pub fn distinct_classes(&self) -> usize {
        self.class_counts().iter().filter(|&&c| c > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = FeatureMatrix::from_rows(
            vec!["a".to_string(), "a".to_string()],
            vec![vec![1.0, 2.0]],
        );
        assert!(matches!(result, Err(IdsightError::Validation(_))));
    }

    #[test]
    fn test_rejects_non_finite() {
        let result = FeatureMatrix::from_rows(names(2), vec![vec![1.0, f64::NAN]]);
        assert!(result.is_err());
        let result = FeatureMatrix::from_rows(names(2), vec![vec![f64::INFINITY, 0.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_project_keeps_order() {
        let m = FeatureMatrix::from_rows(names(3), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
            .unwrap();
        let p = m.project(&[2, 0]).unwrap();
        assert_eq!(p.feature_names(), &["f2".to_string(), "f0".to_string()]);
        assert_eq!(p.row(1), &[6.0, 4.0]);
        assert!(matches!(m.project(&[]), Err(IdsightError::DegenerateSubset(_))));
    }

    #[test]
    fn test_varying_column() {
        let constant = FeatureMatrix::from_rows(names(1), vec![vec![1.0], vec![1.0]]).unwrap();
        assert!(!constant.has_varying_column());
        let varying = FeatureMatrix::from_rows(names(1), vec![vec![1.0], vec![2.0]]).unwrap();
        assert!(varying.has_varying_column());
    }

    #[test]
    fn test_label_vector_counts() {
        let labels = LabelVector::new(vec![0, 1, 1, 2], 4).unwrap();
        assert_eq!(labels.class_counts(), vec![1, 2, 1, 0]);
        assert_eq!(labels.distinct_classes(), 3);
        assert!(LabelVector::new(vec![5], 2).is_err());
    }
}
