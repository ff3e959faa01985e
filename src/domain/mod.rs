//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod label;
pub mod signal;
pub mod encoding;
pub mod split;
pub mod classifier;
pub mod evaluation;
pub mod backtest;
pub mod metrics;
pub mod pipeline;
pub mod config_validation;
pub mod error;
