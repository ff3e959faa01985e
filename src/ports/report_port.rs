//! Report output port.

use crate::domain::backtest::BacktestLedger;
use crate::domain::error::SigtraderError;
use std::path::Path;

/// Port for exporting a backtest ledger.
pub trait ReportPort {
    fn write_ledger(
        &self,
        ledger: &BacktestLedger,
        predictions_correct: &[u8],
        output_path: &Path,
    ) -> Result<(), SigtraderError>;
}
