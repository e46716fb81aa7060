use crate::error::{IdsightError, Result};
use crate::types::FeatureMatrix;
use serde::{Deserialize, Serialize};

/// Per-feature standardisation `(x - mean) / std`.
///
/// Zero-variance columns use a scale of 1.0 so they map to zero instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(matrix: &FeatureMatrix) -> Result<Self> {
        let n = matrix.n_rows();
        if n == 0 {
            return Err(IdsightError::Validation(
                "Cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let mut means = Vec::with_capacity(matrix.n_features());
        let mut scales = Vec::with_capacity(matrix.n_features());
        for c in 0..matrix.n_features() {
            let column = matrix.column(c);
            let mean = column.iter().sum::<f64>() / n as f64;
            let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            let std = variance.sqrt();
            means.push(mean);
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        Ok(Self {
            feature_names: matrix.feature_names().to_vec(),
            means,
            scales,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn transform(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix> {
        if matrix.feature_names() != self.feature_names.as_slice() {
            return Err(IdsightError::Validation(
                "Scaler was fitted on a different feature list".to_string(),
            ));
        }
        let rows = matrix
            .rows()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(c, v)| (v - self.means[c]) / self.scales[c])
                    .collect()
            })
            .collect();
        FeatureMatrix::from_rows(self.feature_names.clone(), rows)
    }

    /// Scale a row holding only the features at `columns` (indices into the
    /// scaler's own feature list).
    pub fn transform_subset(&self, columns: &[usize], values: &[f64]) -> Result<Vec<f64>> {
        if columns.len() != values.len() {
            return Err(IdsightError::Validation(format!(
                "Expected {} values, got {}",
                columns.len(),
                values.len()
            )));
        }
        columns
            .iter()
            .zip(values)
            .map(|(&c, v)| {
                if c >= self.n_features() {
                    return Err(IdsightError::ArtifactIntegrity(format!(
                        "Scaler has no column {}",
                        c
                    )));
                }
                Ok((v - self.means[c]) / self.scales[c])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardises_columns() {
        let m = FeatureMatrix::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 5.0], vec![3.0, 5.0]],
        )
        .unwrap();
        let scaler = StandardScaler::fit(&m).unwrap();
        let scaled = scaler.transform(&m).unwrap();
        assert!((scaled.get(0, 0) + 1.0).abs() < 1e-12);
        assert!((scaled.get(1, 0) - 1.0).abs() < 1e-12);
        // constant column maps to zero
        assert_eq!(scaled.get(0, 1), 0.0);
    }

    #[test]
    fn test_transform_subset_matches_full() {
        let m = FeatureMatrix::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![1.0, 10.0, -2.0], vec![2.0, 30.0, 4.0], vec![6.0, 20.0, 1.0]],
        )
        .unwrap();
        let scaler = StandardScaler::fit(&m).unwrap();
        let full = scaler.transform(&m).unwrap();
        let subset = scaler.transform_subset(&[2, 1], &[4.0, 30.0]).unwrap();
        assert!((subset[0] - full.get(1, 2)).abs() < 1e-12);
        assert!((subset[1] - full.get(1, 1)).abs() < 1e-12);
    }
}
