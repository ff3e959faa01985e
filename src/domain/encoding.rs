//! One-hot expansion of signals into a feature matrix.
//!
//! Features per row are `adx`, `obv`, then the one-hot columns of each signal group
//! (rsi, stochastic_d, bollinger, macd). A group contributes one column per category
//! observed in the dataset, in declaration order, minus its default. A row whose
//! category is the default is all-zero in that group.
//!
//! Columns are chosen over the whole dataset before it is split, so train and test
//! matrices share one layout.

use crate::domain::label::{LabeledRow, Position};
use crate::domain::signal::{
    discretize, BandSignal, CrossSignal, RsiSignal, SignalCategory, SignalRow, StochasticSignal,
};
use chrono::NaiveDate;
use ndarray::Array2;

pub const RAW_FEATURES: [&str; 2] = ["adx", "obv"];

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub date: NaiveDate,
    pub adj_close: f64,
    pub position: Position,
    pub signals: SignalRow,
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<EncodedRow>,
}

impl EncodedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows × features.
    pub fn feature_matrix(&self) -> Array2<f64> {
        let width = self.feature_names.len();
        Array2::from_shape_fn((self.rows.len(), width), |(i, j)| self.rows[i].features[j])
    }

    /// Binary labels: 1 = up, 0 = flat or down.
    pub fn labels(&self) -> Vec<u8> {
        self.rows.iter().map(|r| r.position.binary()).collect()
    }

    pub fn multiclass_labels(&self) -> Vec<u8> {
        self.rows.iter().map(|r| r.position.multiclass()).collect()
    }

    pub fn adj_closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.adj_close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Indices of the columns belonging to a signal group.
    pub fn group_columns(&self, group: &str) -> Vec<usize> {
        let prefix = format!("{group}_");
        self.feature_names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(&prefix))
            .map(|(i, _)| i)
            .collect()
    }
}

fn observed<C: SignalCategory>(values: &[C]) -> Vec<C> {
    C::ALL
        .iter()
        .copied()
        .filter(|c| *c != C::DEFAULT && values.contains(c))
        .collect()
}

fn column_names<C: SignalCategory>(columns: &[C], names: &mut Vec<String>) {
    names.extend(columns.iter().map(|c| format!("{}_{}", C::GROUP, c.suffix())));
}

fn one_hot<C: SignalCategory>(value: C, columns: &[C], out: &mut Vec<f64>) {
    out.extend(columns.iter().map(|c| if *c == value { 1.0 } else { 0.0 }));
}

/// Discretize and one-hot encode labelled rows.
pub fn encode(rows: &[LabeledRow]) -> EncodedDataset {
    let signals = discretize(rows.iter().map(|r| &r.indicators));

    let rsi: Vec<RsiSignal> = signals.iter().map(|s| s.rsi).collect();
    let stochastic: Vec<StochasticSignal> = signals.iter().map(|s| s.stochastic_d).collect();
    let bollinger: Vec<BandSignal> = signals.iter().map(|s| s.bollinger).collect();
    let macd: Vec<CrossSignal> = signals.iter().map(|s| s.macd).collect();

    let rsi_cols = observed(&rsi);
    let stochastic_cols = observed(&stochastic);
    let bollinger_cols = observed(&bollinger);
    let macd_cols = observed(&macd);

    let mut feature_names: Vec<String> = RAW_FEATURES.iter().map(|s| s.to_string()).collect();
    column_names(&rsi_cols, &mut feature_names);
    column_names(&stochastic_cols, &mut feature_names);
    column_names(&bollinger_cols, &mut feature_names);
    column_names(&macd_cols, &mut feature_names);

    let encoded = rows
        .iter()
        .zip(signals)
        .map(|(row, signal)| {
            let mut features = Vec::with_capacity(feature_names.len());
            features.push(row.indicators.adx);
            features.push(row.indicators.obv);
            one_hot(signal.rsi, &rsi_cols, &mut features);
            one_hot(signal.stochastic_d, &stochastic_cols, &mut features);
            one_hot(signal.bollinger, &bollinger_cols, &mut features);
            one_hot(signal.macd, &macd_cols, &mut features);
            EncodedRow {
                date: row.date,
                adj_close: row.adj_close,
                position: row.position,
                signals: signal,
                features,
            }
        })
        .collect();

    EncodedDataset {
        feature_names,
        rows: encoded,
    }
}
