//! Min-max feature scaling to [0, 1].

use crate::domain::error::SigtraderError;
use ndarray::{Array1, Array2, Axis};

/// Per-column min-max scaler. Fit on the training matrix, then apply the same bounds to
/// any later matrix. Values outside the fitted range map outside [0, 1]. A column with
/// zero range maps to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    range: Array1<f64>,
}

impl MinMaxScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self, SigtraderError> {
        if x.nrows() == 0 {
            return Err(SigtraderError::Classifier {
                reason: "cannot fit scaler on an empty matrix".into(),
            });
        }
        let min = x.fold_axis(Axis(0), f64::INFINITY, |acc, v| acc.min(*v));
        let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, v| acc.max(*v));
        let range = &max - &min;
        Ok(Self { min, range })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, SigtraderError> {
        if x.ncols() != self.min.len() {
            return Err(SigtraderError::LengthMismatch {
                what: "scaled feature columns".into(),
                expected: self.min.len(),
                got: x.ncols(),
            });
        }
        let mut out = x.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (min, range) = (self.min[j], self.range[j]);
            column.mapv_inplace(|v| if range == 0.0 { 0.0 } else { (v - min) / range });
        }
        Ok(out)
    }
}
