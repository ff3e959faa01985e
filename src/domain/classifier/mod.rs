//! Binary classifiers behind one train/predict interface.
//!
//! The pipeline only sees `dyn Classifier`; which model sits behind it is decided by
//! [`ModelConfig::kind`].

pub mod logistic;
pub mod mlp;
pub mod scaler;
pub mod svm;

use crate::domain::error::SigtraderError;
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;

pub use logistic::LogisticRegression;
pub use mlp::FeedForwardNet;
pub use scaler::MinMaxScaler;
pub use svm::LinearSvm;

pub trait Classifier {
    fn name(&self) -> &str;

    /// Fit on a rows × features matrix and a 0/1 label per row.
    fn train(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), SigtraderError>;

    /// One 0/1 prediction per row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, SigtraderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    #[default]
    Logistic,
    Mlp,
    Svm,
    AlwaysInvest,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Logistic => write!(f, "logistic"),
            ModelKind::Mlp => write!(f, "mlp"),
            ModelKind::Svm => write!(f, "svm"),
            ModelKind::AlwaysInvest => write!(f, "always_invest"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logistic" | "logit" => Ok(ModelKind::Logistic),
            "mlp" | "nn" => Ok(ModelKind::Mlp),
            "svm" => Ok(ModelKind::Svm),
            "always_invest" => Ok(ModelKind::AlwaysInvest),
            other => Err(format!(
                "unknown model kind '{other}' (expected logistic, mlp, svm or always_invest)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub epochs: usize,
    pub learning_rate: f64,
    pub hidden_units: Vec<usize>,
    pub regularization: f64,
    pub seed: u64,
    pub normalize: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::Logistic,
            epochs: 500,
            learning_rate: 0.1,
            hidden_units: vec![10, 10],
            regularization: 0.01,
            seed: 100,
            normalize: true,
        }
    }
}

pub fn build(config: &ModelConfig) -> Box<dyn Classifier> {
    match config.kind {
        ModelKind::Logistic => Box::new(LogisticRegression::new(
            config.learning_rate,
            config.epochs,
            config.regularization,
        )),
        ModelKind::Mlp => Box::new(FeedForwardNet::new(
            config.hidden_units.clone(),
            config.learning_rate,
            config.epochs,
            config.seed,
        )),
        ModelKind::Svm => Box::new(LinearSvm::new(
            config.regularization,
            config.epochs,
            config.seed,
        )),
        ModelKind::AlwaysInvest => Box::new(AlwaysInvest),
    }
}

/// Predicts 1 for every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysInvest;

impl Classifier for AlwaysInvest {
    fn name(&self) -> &str {
        "always_invest"
    }

    fn train(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), SigtraderError> {
        check_training(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, SigtraderError> {
        Ok(vec![1; x.nrows()])
    }
}

/// Shape, label and value checks shared by every model.
pub(crate) fn check_training(x: &Array2<f64>, y: &[u8]) -> Result<(), SigtraderError> {
    if x.nrows() != y.len() {
        return Err(SigtraderError::LengthMismatch {
            what: "training labels".into(),
            expected: x.nrows(),
            got: y.len(),
        });
    }
    if x.nrows() == 0 {
        return Err(SigtraderError::Classifier {
            reason: "training set is empty".into(),
        });
    }
    if let Some(label) = y.iter().find(|l| **l > 1) {
        return Err(SigtraderError::Classifier {
            reason: format!("labels must be 0 or 1, got {label}"),
        });
    }
    check_finite(x)
}

pub(crate) fn check_finite(x: &Array2<f64>) -> Result<(), SigtraderError> {
    if let Some(((row, col), _)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(SigtraderError::Classifier {
            reason: format!("feature ({row}, {col}) is not finite"),
        });
    }
    Ok(())
}

/// A trained model's expected input width.
pub(crate) fn check_width(
    name: &str,
    fitted: Option<usize>,
    x: &Array2<f64>,
) -> Result<(), SigtraderError> {
    let expected = fitted.ok_or_else(|| SigtraderError::Classifier {
        reason: format!("{name} has not been trained"),
    })?;
    if x.ncols() != expected {
        return Err(SigtraderError::LengthMismatch {
            what: format!("{name} feature columns"),
            expected,
            got: x.ncols(),
        });
    }
    check_finite(x)
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
