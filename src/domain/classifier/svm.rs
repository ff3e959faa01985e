//! Linear SVM fitted with Pegasos (stochastic sub-gradient descent on the L2-regularized
//! hinge loss). Labels 0/1 are mapped to -1/+1 for training. The bias is treated as the
//! weight of a constant feature and shrinks with the other weights.

use super::{check_training, check_width, Classifier};
use crate::domain::error::SigtraderError;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LinearSvm {
    lambda: f64,
    epochs: usize,
    seed: u64,
    weights: Option<Array1<f64>>,
    bias: f64,
}

impl LinearSvm {
    pub fn new(lambda: f64, epochs: usize, seed: u64) -> Self {
        Self {
            lambda,
            epochs,
            seed,
            weights: None,
            bias: 0.0,
        }
    }

    /// Signed distance-like score `w·x + b` per row.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>, SigtraderError> {
        check_width(self.name(), self.weights.as_ref().map(|w| w.len()), x)?;
        let weights = self.weights.as_ref().ok_or_else(|| SigtraderError::Classifier {
            reason: "svm has not been trained".into(),
        })?;
        Ok(x.dot(weights) + self.bias)
    }
}

impl Classifier for LinearSvm {
    fn name(&self) -> &str {
        "svm"
    }

    fn train(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), SigtraderError> {
        check_training(x, y)?;
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(SigtraderError::Classifier {
                reason: format!("svm regularization must be positive, got {}", self.lambda),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..x.nrows()).collect();
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        let mut step = 0usize;
        let mut violations = 0usize;

        for _ in 0..self.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                step += 1;
                let eta = 1.0 / (self.lambda * step as f64);
                let row = x.row(i);
                let target = if y[i] == 1 { 1.0 } else { -1.0 };
                let margin = target * (row.dot(&weights) + bias);

                let shrink = 1.0 - eta * self.lambda;
                weights *= shrink;
                bias *= shrink;
                if margin < 1.0 {
                    weights.scaled_add(eta * target, &row);
                    bias += eta * target;
                    violations += 1;
                }
            }
        }

        debug!(
            epochs = self.epochs,
            steps = step,
            violations,
            "linear svm trained"
        );
        self.weights = Some(weights);
        self.bias = bias;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, SigtraderError> {
        Ok(self
            .decision_function(x)?
            .iter()
            .map(|&s| u8::from(s >= 0.0))
            .collect())
    }
}
