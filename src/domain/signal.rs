//! Crossover signals derived from indicator rows.
//!
//! Each signal group is a small enum with a default category. The first row of every
//! series has no predecessor and is seeded with the default.

use crate::domain::indicator::IndicatorRow;

/// A discrete signal group that can be one-hot expanded.
pub trait SignalCategory: Copy + Eq + std::fmt::Debug + 'static {
    /// Column prefix for this group.
    const GROUP: &'static str;
    /// Every category, in declaration order.
    const ALL: &'static [Self];
    /// The no-signal category, dropped by one-hot expansion.
    const DEFAULT: Self;

    fn suffix(&self) -> &'static str;
}

/// Crossing of an oscillator through an upper or lower threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdSignal {
    CrossAboveUpper,
    CrossBelowUpper,
    CrossAboveLower,
    CrossBelowLower,
    None,
}

/// Adjusted close relative to the Bollinger bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandSignal {
    AboveUpper,
    BelowLower,
    Inside,
}

/// Short average crossing the long average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrossSignal {
    Bullish,
    Bearish,
    None,
}

impl ThresholdSignal {
    fn suffix(&self) -> &'static str {
        match self {
            ThresholdSignal::CrossAboveUpper => "cross_above_upper",
            ThresholdSignal::CrossBelowUpper => "cross_below_upper",
            ThresholdSignal::CrossAboveLower => "cross_above_lower",
            ThresholdSignal::CrossBelowLower => "cross_below_lower",
            ThresholdSignal::None => "none",
        }
    }
}

/// RSI crossings of 70 / 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RsiSignal(pub ThresholdSignal);

/// Stochastic %D crossings of 80 / 20.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StochasticSignal(pub ThresholdSignal);

impl SignalCategory for RsiSignal {
    const GROUP: &'static str = "rsi";
    const ALL: &'static [Self] = &[
        RsiSignal(ThresholdSignal::CrossAboveUpper),
        RsiSignal(ThresholdSignal::CrossBelowUpper),
        RsiSignal(ThresholdSignal::CrossAboveLower),
        RsiSignal(ThresholdSignal::CrossBelowLower),
        RsiSignal(ThresholdSignal::None),
    ];
    const DEFAULT: Self = RsiSignal(ThresholdSignal::None);

    fn suffix(&self) -> &'static str {
        self.0.suffix()
    }
}

impl SignalCategory for StochasticSignal {
    const GROUP: &'static str = "stochastic_d";
    const ALL: &'static [Self] = &[
        StochasticSignal(ThresholdSignal::CrossAboveUpper),
        StochasticSignal(ThresholdSignal::CrossBelowUpper),
        StochasticSignal(ThresholdSignal::CrossAboveLower),
        StochasticSignal(ThresholdSignal::CrossBelowLower),
        StochasticSignal(ThresholdSignal::None),
    ];
    const DEFAULT: Self = StochasticSignal(ThresholdSignal::None);

    fn suffix(&self) -> &'static str {
        self.0.suffix()
    }
}

impl SignalCategory for BandSignal {
    const GROUP: &'static str = "bollinger";
    const ALL: &'static [Self] = &[
        BandSignal::AboveUpper,
        BandSignal::BelowLower,
        BandSignal::Inside,
    ];
    const DEFAULT: Self = BandSignal::Inside;

    fn suffix(&self) -> &'static str {
        match self {
            BandSignal::AboveUpper => "above_upper",
            BandSignal::BelowLower => "below_lower",
            BandSignal::Inside => "inside",
        }
    }
}

impl SignalCategory for CrossSignal {
    const GROUP: &'static str = "macd";
    const ALL: &'static [Self] = &[CrossSignal::Bullish, CrossSignal::Bearish, CrossSignal::None];
    const DEFAULT: Self = CrossSignal::None;

    fn suffix(&self) -> &'static str {
        match self {
            CrossSignal::Bullish => "bullish",
            CrossSignal::Bearish => "bearish",
            CrossSignal::None => "none",
        }
    }
}

pub const RSI_UPPER: f64 = 70.0;
pub const RSI_LOWER: f64 = 30.0;
pub const STOCHASTIC_UPPER: f64 = 80.0;
pub const STOCHASTIC_LOWER: f64 = 20.0;

/// Classify the move from `prev` to `cur` against the two thresholds. Comparisons are
/// strict and checked in declaration order; the first match wins.
pub fn threshold_cross(prev: f64, cur: f64, upper: f64, lower: f64) -> ThresholdSignal {
    if prev < upper && cur > upper {
        ThresholdSignal::CrossAboveUpper
    } else if prev > upper && cur < upper {
        ThresholdSignal::CrossBelowUpper
    } else if prev < lower && cur > lower {
        ThresholdSignal::CrossAboveLower
    } else if prev > lower && cur < lower {
        ThresholdSignal::CrossBelowLower
    } else {
        ThresholdSignal::None
    }
}

pub fn band_position(adj_close: f64, upper: f64, lower: f64) -> BandSignal {
    if adj_close > upper {
        BandSignal::AboveUpper
    } else if adj_close < lower {
        BandSignal::BelowLower
    } else {
        BandSignal::Inside
    }
}

pub fn average_cross(prev_short: f64, prev_long: f64, short: f64, long: f64) -> CrossSignal {
    if short > long && prev_short < prev_long {
        CrossSignal::Bullish
    } else if short < long && prev_short > prev_long {
        CrossSignal::Bearish
    } else {
        CrossSignal::None
    }
}

/// Discrete signals of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalRow {
    pub rsi: RsiSignal,
    pub stochastic_d: StochasticSignal,
    pub bollinger: BandSignal,
    pub macd: CrossSignal,
}

impl Default for SignalRow {
    fn default() -> Self {
        Self {
            rsi: RsiSignal::DEFAULT,
            stochastic_d: StochasticSignal::DEFAULT,
            bollinger: BandSignal::DEFAULT,
            macd: CrossSignal::DEFAULT,
        }
    }
}

/// Discretize consecutive indicator rows. Output has one entry per input row.
pub fn discretize<'a, I>(rows: I) -> Vec<SignalRow>
where
    I: IntoIterator<Item = &'a IndicatorRow>,
{
    let mut signals = Vec::new();
    let mut prev: Option<&IndicatorRow> = None;

    for row in rows {
        let signal = match prev {
            None => SignalRow::default(),
            Some(p) => SignalRow {
                rsi: RsiSignal(threshold_cross(p.rsi, row.rsi, RSI_UPPER, RSI_LOWER)),
                stochastic_d: StochasticSignal(threshold_cross(
                    p.stochastic_d,
                    row.stochastic_d,
                    STOCHASTIC_UPPER,
                    STOCHASTIC_LOWER,
                )),
                bollinger: band_position(row.adj_close, row.bollinger_upper, row.bollinger_lower),
                macd: average_cross(p.macd_short, p.macd_long, row.macd_short, row.macd_long),
            },
        };
        signals.push(signal);
        prev = Some(row);
    }

    signals
}
