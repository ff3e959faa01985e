//! Daily price bars and the validated price series they form.

use crate::domain::error::SigtraderError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = (self.high - self.low).abs();
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn validate(&self, index: usize) -> Result<(), SigtraderError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("adj_close", self.adj_close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(SigtraderError::malformed(index, name, "is not finite"));
            }
            if value < 0.0 {
                return Err(SigtraderError::malformed(index, name, "is negative"));
            }
        }
        if self.close <= 0.0 {
            return Err(SigtraderError::malformed(index, "close", "must be positive"));
        }
        if self.adj_close <= 0.0 {
            return Err(SigtraderError::malformed(
                index,
                "adj_close",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Ordered daily bars for one instrument. Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(code: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, SigtraderError> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate(i)?;
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(SigtraderError::malformed(
                    i,
                    "date",
                    format!("{} is not after {}", bar.date, bars[i - 1].date),
                ));
            }
        }
        Ok(Self {
            code: code.into(),
            bars,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn adj_closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.adj_close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Bars dated within `[start, end]`, inclusive.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Result<Self, SigtraderError> {
        let bars = self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect();
        Self::new(self.code.clone(), bars)
    }
}
