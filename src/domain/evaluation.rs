//! Scoring of 0/1 predictions against labels.

use crate::domain::error::SigtraderError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationReport {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Area under the ROC curve of hard predictions: (TPR + TNR) / 2.
    pub auc: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn check_lengths(labels: &[u8], predictions: &[u8]) -> Result<(), SigtraderError> {
    if labels.len() != predictions.len() {
        return Err(SigtraderError::LengthMismatch {
            what: "prediction vector".into(),
            expected: labels.len(),
            got: predictions.len(),
        });
    }
    Ok(())
}

impl ClassificationReport {
    pub fn compute(labels: &[u8], predictions: &[u8]) -> Result<Self, SigtraderError> {
        check_lengths(labels, predictions)?;
        let mut c = ConfusionMatrix::default();
        for (&t, &p) in labels.iter().zip(predictions) {
            match (t == 1, p == 1) {
                (true, true) => c.true_positive += 1,
                (false, false) => c.true_negative += 1,
                (false, true) => c.false_positive += 1,
                (true, false) => c.false_negative += 1,
            }
        }

        let precision = ratio(c.true_positive, c.true_positive + c.false_positive);
        let recall = ratio(c.true_positive, c.true_positive + c.false_negative);
        let specificity = ratio(c.true_negative, c.true_negative + c.false_positive);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Ok(Self {
            confusion: c,
            accuracy: ratio(c.true_positive + c.true_negative, c.total()),
            precision,
            recall,
            f1,
            auc: (recall + specificity) / 2.0,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.confusion;
        writeln!(f, "                 pred 0   pred 1")?;
        writeln!(f, "  actual 0    {:>8} {:>8}", c.true_negative, c.false_positive)?;
        writeln!(f, "  actual 1    {:>8} {:>8}", c.false_negative, c.true_positive)?;
        writeln!(f, "  Accuracy:    {:.4}", self.accuracy)?;
        writeln!(f, "  Precision:   {:.4}", self.precision)?;
        writeln!(f, "  Recall:      {:.4}", self.recall)?;
        writeln!(f, "  F1:          {:.4}", self.f1)?;
        write!(f, "  AUC:         {:.4}", self.auc)
    }
}

/// 1 where the prediction matches the label. The last row is always 0, as it has no
/// realized next-day move in the backtest.
pub fn accuracy_flags(labels: &[u8], predictions: &[u8]) -> Result<Vec<u8>, SigtraderError> {
    check_lengths(labels, predictions)?;
    let mut flags: Vec<u8> = labels
        .iter()
        .zip(predictions)
        .map(|(t, p)| u8::from(t == p))
        .collect();
    if let Some(last) = flags.last_mut() {
        *last = 0;
    }
    Ok(flags)
}
