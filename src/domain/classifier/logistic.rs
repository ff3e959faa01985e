//! Logistic regression trained with batch gradient descent on log loss.

use super::{check_training, check_width, sigmoid, Classifier};
use crate::domain::error::SigtraderError;
use ndarray::{Array1, Array2};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    epochs: usize,
    /// L2 penalty on the weights (not the bias).
    l2: f64,
    weights: Option<Array1<f64>>,
    bias: f64,
    pub loss_history: Vec<f64>,
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, epochs: usize, l2: f64) -> Self {
        Self {
            learning_rate,
            epochs,
            l2,
            weights: None,
            bias: 0.0,
            loss_history: Vec::new(),
        }
    }

    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    /// P(up) per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, SigtraderError> {
        check_width(self.name(), self.weights.as_ref().map(|w| w.len()), x)?;
        let weights = self.weights.as_ref().ok_or_else(|| SigtraderError::Classifier {
            reason: "logistic has not been trained".into(),
        })?;
        Ok((x.dot(weights) + self.bias).mapv(sigmoid))
    }
}

fn log_loss(y: &Array1<f64>, p: &Array1<f64>) -> f64 {
    let eps = 1e-15;
    -y.iter()
        .zip(p.iter())
        .map(|(&t, &q)| {
            let q = q.clamp(eps, 1.0 - eps);
            t * q.ln() + (1.0 - t) * (1.0 - q).ln()
        })
        .sum::<f64>()
        / y.len() as f64
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic"
    }

    fn train(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), SigtraderError> {
        check_training(x, y)?;
        let n = x.nrows() as f64;
        let y: Array1<f64> = y.iter().map(|&v| f64::from(v)).collect();

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        self.loss_history.clear();

        for _ in 0..self.epochs {
            let p = (x.dot(&weights) + bias).mapv(sigmoid);
            let errors = &p - &y;
            let grad_w = x.t().dot(&errors) / n + &weights * self.l2;
            let grad_b = errors.sum() / n;

            weights = weights - grad_w * self.learning_rate;
            bias -= grad_b * self.learning_rate;
            self.loss_history.push(log_loss(&y, &p));
        }

        debug!(
            epochs = self.epochs,
            final_loss = self.loss_history.last().copied().unwrap_or(f64::NAN),
            "logistic regression trained"
        );
        self.weights = Some(weights);
        self.bias = bias;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, SigtraderError> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|&p| u8::from(p >= 0.5))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<u8>) {
        let x = array![
            [0.0, 0.1],
            [0.1, 0.0],
            [0.2, 0.1],
            [0.8, 0.9],
            [0.9, 1.0],
            [1.0, 0.8]
        ];
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn learns_separable_data() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(1.0, 2000, 0.0);
        model.train(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn loss_decreases() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(0.5, 200, 0.0);
        model.train(&x, &y).unwrap();
        let first = model.loss_history[0];
        let last = *model.loss_history.last().unwrap();
        assert!(last < first);
        assert!((first - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn probabilities_in_unit_interval() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(1.0, 100, 0.01);
        model.train(&x, &y).unwrap();
        for p in model.predict_proba(&x).unwrap().iter() {
            assert!((0.0..=1.0).contains(p));
        }
    }

    #[test]
    fn l2_penalty_shrinks_weights() {
        let (x, y) = separable();
        let mut free = LogisticRegression::new(1.0, 500, 0.0);
        let mut penalized = LogisticRegression::new(1.0, 500, 0.5);
        assert!(free.weights().is_none());
        free.train(&x, &y).unwrap();
        penalized.train(&x, &y).unwrap();

        let norm = |m: &LogisticRegression| m.weights().unwrap().mapv(|w| w * w).sum();
        assert_eq!(free.weights().unwrap().len(), 2);
        assert!(norm(&penalized) < norm(&free));
    }

    #[test]
    fn predict_before_train_fails() {
        let model = LogisticRegression::new(0.1, 10, 0.0);
        assert!(model.predict(&array![[1.0, 2.0]]).is_err());
    }

    #[test]
    fn wrong_width_fails() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(0.1, 10, 0.0);
        model.train(&x, &y).unwrap();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(SigtraderError::LengthMismatch { .. })
        ));
    }
}
