//! Standardization utilities for model inputs.
//!
//! Feature columns live on very different scales (head counts, day counts,
//! percentages), so both clustering and classification work on z-scores.

use crate::{Result, WorkforceError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Column-wise z-score standardization.
///
/// Computes z = (x - mean) / std per column, with the population standard
/// deviation. Constant columns keep a scale of one so they map to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Standardizer {
    /// Learn column means and scales from `data` (rows are observations).
    pub fn fit(data: &Array2<f64>) -> Result<Self> {
        let mean = data
            .mean_axis(Axis(0))
            .ok_or(WorkforceError::InsufficientData {
                required: 1,
                available: 0,
            })?;
        let std = data.std_axis(Axis(0), 0.0);
        let scale = std
            .iter()
            .map(|&s| if s > f64::EPSILON { s } else { 1.0 })
            .collect();

        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    /// Number of columns the standardizer was fitted on.
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Standardize every row of `data`.
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let mut out = data.clone();
        for mut row in out.outer_iter_mut() {
            for ((value, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *value = (*value - mean) / scale;
            }
        }
        Ok(out)
    }

    /// Standardize a single observation.
    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((value, mean), scale)| (value - mean) / scale)
            .collect())
    }

    /// Map standardized values back to original units.
    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let mut out = data.clone();
        for mut row in out.outer_iter_mut() {
            for ((value, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *value = *value * scale + mean;
            }
        }
        Ok(out)
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width == self.width() {
            Ok(())
        } else {
            Err(WorkforceError::Model(format!(
                "expected {} feature columns, got {width}",
                self.width()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_standardize_columns() {
        let data = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let scaler = Standardizer::fit(&data).unwrap();
        let z = scaler.transform(&data).unwrap();

        // Mean 2, population std sqrt(2/3).
        let std = (2.0f64 / 3.0).sqrt();
        assert_relative_eq!(z[[0, 0]], -1.0 / std, epsilon = 1e-12);
        assert_relative_eq!(z[[1, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(z[[2, 0]], 1.0 / std, epsilon = 1e-12);
        // Constant column maps to zero.
        assert!(z.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_inverse_round_trip() {
        let data = array![[5.0, -1.0], [7.0, 3.0], [9.0, 2.0]];
        let scaler = Standardizer::fit(&data).unwrap();
        let back = scaler
            .inverse_transform(&scaler.transform(&data).unwrap())
            .unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }

        let single = scaler.transform_row(data.row(1)).unwrap();
        assert_relative_eq!(single[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_width_mismatch_and_empty_input() {
        let scaler = Standardizer::fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0, 2.0, 3.0]]).is_err());
        assert!(Standardizer::fit(&Array2::<f64>::zeros((0, 2))).is_err());
    }
}
