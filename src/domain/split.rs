//! Chronological train/test split.

use crate::domain::encoding::EncodedDataset;
use crate::domain::error::SigtraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: EncodedDataset,
    pub test: EncodedDataset,
}

/// `cut = floor(train_fraction * len)`; train is `rows[..cut]`, test `rows[cut..]`.
/// Order is preserved.
pub fn split(dataset: &EncodedDataset, train_fraction: f64) -> Result<Split, SigtraderError> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(SigtraderError::InvalidFraction {
            fraction: train_fraction,
            reason: "must lie strictly between 0 and 1".into(),
        });
    }

    let cut = (train_fraction * dataset.len() as f64).floor() as usize;
    if cut == 0 || cut >= dataset.len() {
        return Err(SigtraderError::InvalidFraction {
            fraction: train_fraction,
            reason: format!(
                "cut at {} of {} rows leaves an empty segment",
                cut,
                dataset.len()
            ),
        });
    }

    let (train, test) = dataset.rows.split_at(cut);
    Ok(Split {
        train: EncodedDataset {
            feature_names: dataset.feature_names.clone(),
            rows: train.to_vec(),
        },
        test: EncodedDataset {
            feature_names: dataset.feature_names.clone(),
            rows: test.to_vec(),
        },
    })
}
