//! Feed-forward network: dense ReLU hidden layers, one sigmoid output unit, binary
//! cross-entropy, full-batch gradient descent. Weights are drawn from a seeded RNG so a
//! given seed always trains the same network.

use super::{check_training, check_width, sigmoid, Classifier};
use crate::domain::error::SigtraderError;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

#[derive(Debug, Clone)]
struct Dense {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl Dense {
    /// Xavier-uniform weights, zero bias.
    fn new(input: usize, output: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (input + output) as f64).sqrt();
        let weights = Array2::from_shape_fn((input, output), |_| rng.gen_range(-limit..limit));
        Self {
            weights,
            bias: Array1::zeros(output),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedForwardNet {
    hidden_units: Vec<usize>,
    learning_rate: f64,
    epochs: usize,
    seed: u64,
    layers: Vec<Dense>,
    pub loss_history: Vec<f64>,
}

impl FeedForwardNet {
    pub fn new(hidden_units: Vec<usize>, learning_rate: f64, epochs: usize, seed: u64) -> Self {
        Self {
            hidden_units,
            learning_rate,
            epochs,
            seed,
            layers: Vec::new(),
            loss_history: Vec::new(),
        }
    }

    fn input_width(&self) -> Option<usize> {
        self.layers.first().map(|l| l.weights.nrows())
    }

    /// Returns the activations of every layer (input first) and the pre-activations of
    /// every layer.
    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut activations = vec![x.clone()];
        let mut pre = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let z = activations[i].dot(&layer.weights) + &layer.bias;
            let a = if i + 1 == self.layers.len() {
                z.mapv(sigmoid)
            } else {
                z.mapv(|v| v.max(0.0))
            };
            pre.push(z);
            activations.push(a);
        }
        (activations, pre)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, SigtraderError> {
        check_width(self.name(), self.input_width(), x)?;
        let (mut activations, _) = self.forward(x);
        let out = activations.pop().ok_or_else(|| SigtraderError::Classifier {
            reason: "network has no layers".into(),
        })?;
        Ok(out.column(0).to_owned())
    }
}

fn cross_entropy(y: &Array2<f64>, p: &Array2<f64>) -> f64 {
    let eps = 1e-15;
    let total: f64 = y
        .iter()
        .zip(p.iter())
        .map(|(&t, &q)| {
            let q = q.clamp(eps, 1.0 - eps);
            t * q.ln() + (1.0 - t) * (1.0 - q).ln()
        })
        .sum();
    -total / y.len() as f64
}

impl Classifier for FeedForwardNet {
    fn name(&self) -> &str {
        "mlp"
    }

    fn train(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), SigtraderError> {
        check_training(x, y)?;
        if self.hidden_units.contains(&0) {
            return Err(SigtraderError::Classifier {
                reason: "hidden layers must have at least one unit".into(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut widths = vec![x.ncols()];
        widths.extend(&self.hidden_units);
        widths.push(1);
        self.layers = widths
            .windows(2)
            .map(|w| Dense::new(w[0], w[1], &mut rng))
            .collect();

        let n = x.nrows() as f64;
        let target = Array2::from_shape_fn((y.len(), 1), |(i, _)| f64::from(y[i]));
        self.loss_history.clear();

        for _ in 0..self.epochs {
            let (activations, pre) = self.forward(x);
            let output = &activations[self.layers.len()];
            self.loss_history.push(cross_entropy(&target, output));

            let mut delta = (output - &target) / n;
            for l in (0..self.layers.len()).rev() {
                let grad_w = activations[l].t().dot(&delta);
                let grad_b = delta.sum_axis(Axis(0));
                let next = if l > 0 {
                    let relu_grad = pre[l - 1].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
                    Some(delta.dot(&self.layers[l].weights.t()) * &relu_grad)
                } else {
                    None
                };
                self.layers[l].weights.scaled_add(-self.learning_rate, &grad_w);
                self.layers[l].bias.scaled_add(-self.learning_rate, &grad_b);
                if let Some(d) = next {
                    delta = d;
                }
            }
        }

        debug!(
            layers = self.layers.len(),
            epochs = self.epochs,
            final_loss = self.loss_history.last().copied().unwrap_or(f64::NAN),
            "feed-forward network trained"
        );
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
