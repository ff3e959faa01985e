//! Next-day move labels.

use crate::domain::error::SigtraderError;
use crate::domain::indicator::{IndicatorFrame, IndicatorRow};
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    Up,
    Flat,
    Down,
}

impl Position {
    pub fn from_move(today: f64, tomorrow: f64) -> Self {
        if tomorrow > today {
            Position::Up
        } else if tomorrow < today {
            Position::Down
        } else {
            Position::Flat
        }
    }

    /// 1 = up, 0 = flat or down.
    pub fn binary(self) -> u8 {
        match self {
            Position::Up => 1,
            Position::Flat | Position::Down => 0,
        }
    }

    /// Three-way class index for multinomial baselines: down 0, flat 1, up 2.
    pub fn multiclass(self) -> u8 {
        match self {
            Position::Down => 0,
            Position::Flat => 1,
            Position::Up => 2,
        }
    }
}

/// One trading day with its indicators and the direction of the following move.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub date: NaiveDate,
    pub adj_close: f64,
    pub position: Position,
    pub indicators: IndicatorRow,
}

/// Pairs each frame row with the move from its day to the next. The frame row for
/// the final bar has no next day and is dropped.
pub fn label_rows(
    series: &PriceSeries,
    frame: &IndicatorFrame,
) -> Result<Vec<LabeledRow>, SigtraderError> {
    let bars = series.bars();
    let mut rows = Vec::with_capacity(frame.len().saturating_sub(1));

    for (k, indicators) in frame.rows.iter().enumerate() {
        let t = frame.start + k;
        let Some(next) = bars.get(t + 1) else {
            break;
        };
        let today = &bars[t];
        if indicators.date != today.date {
            return Err(SigtraderError::malformed(
                t,
                "date",
                format!(
                    "indicator row dated {} does not match bar {}",
                    indicators.date, today.date
                ),
            ));
        }
        check_finite(t, indicators)?;

        rows.push(LabeledRow {
            date: today.date,
            adj_close: today.adj_close,
            position: Position::from_move(today.adj_close, next.adj_close),
            indicators: indicators.clone(),
        });
    }

    Ok(rows)
}

fn check_finite(index: usize, row: &IndicatorRow) -> Result<(), SigtraderError> {
    let fields = [
        ("adj_close", row.adj_close),
        ("rsi", row.rsi),
        ("stochastic_k", row.stochastic_k),
        ("stochastic_d", row.stochastic_d),
        ("bollinger_ma", row.bollinger_ma),
        ("bollinger_upper", row.bollinger_upper),
        ("bollinger_lower", row.bollinger_lower),
        ("macd_short", row.macd_short),
        ("macd_long", row.macd_long),
        ("adx", row.adx),
        ("obv", row.obv),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, _)) => Err(SigtraderError::malformed(index, name, "is not finite")),
        None => Ok(()),
    }
}
