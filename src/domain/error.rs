//! Domain error types.

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data unavailable for {code}: {reason}")]
    DataUnavailable { code: String, reason: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid period {name} = {value}: periods must be at least 1")]
    InvalidPeriod { name: String, value: usize },

    #[error("malformed row {index}: field {field} {reason}")]
    MalformedRow {
        index: usize,
        field: String,
        reason: String,
    },

    #[error("invalid train fraction {fraction}: {reason}")]
    InvalidFraction { fraction: f64, reason: String },

    #[error("length mismatch for {what}: expected {expected}, got {got}")]
    LengthMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("classifier error: {reason}")]
    Classifier { reason: String },

    #[error("undefined {metric}: {reason}")]
    UndefinedMetric { metric: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigtraderError {
    pub(crate) fn malformed(index: usize, field: &str, reason: impl Into<String>) -> Self {
        SigtraderError::MalformedRow {
            index,
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        let code: u8 = match err {
            SigtraderError::Io(_) => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. }
            | SigtraderError::InvalidPeriod { .. }
            | SigtraderError::InvalidFraction { .. } => 2,
            SigtraderError::DataUnavailable { .. } => 3,
            SigtraderError::Classifier { .. } | SigtraderError::LengthMismatch { .. } => 4,
            SigtraderError::InsufficientData { .. } | SigtraderError::MalformedRow { .. } => 5,
            SigtraderError::UndefinedMetric { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
