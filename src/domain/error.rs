//! Domain error types.

/// A parse error with position information for condition parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for stratsim.
#[derive(Debug, thiserror::Error)]
pub enum StratsimError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no candles for {symbol}")]
    NoData { symbol: String },

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

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid condition: {reason}")]
    RuleInvalid { reason: String },

    #[error("unknown indicator type '{name}'")]
    UnknownIndicator { name: String },

    #[error("unknown operator '{name}'")]
    UnknownOperator { name: String },

    /// A `[strategy]` condition line that failed to parse or resolve.
    #[error("[strategy] {key}: {source}")]
    InvalidCondition {
        key: String,
        line: String,
        source: Box<StratsimError>,
    },

    #[error("candle series is empty")]
    EmptyCandles,

    #[error("insufficient data: have {bars} candles, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("invalid risk config {field}: {reason}")]
    InvalidRiskConfig { field: &'static str, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StratsimError {
    /// True for errors that reject a run before any simulation starts.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            StratsimError::EmptyCandles
                | StratsimError::InsufficientData { .. }
                | StratsimError::InvalidRiskConfig { .. }
                | StratsimError::UnknownIndicator { .. }
                | StratsimError::UnknownOperator { .. }
                | StratsimError::RuleParse(_)
                | StratsimError::RuleInvalid { .. }
                | StratsimError::InvalidCondition { .. }
        )
    }

    /// Multi-line rendering for the terminal. Syntax errors inside a
    /// condition line get the line echoed with a caret under the column.
    pub fn display_with_context(&self) -> String {
        match self {
            StratsimError::InvalidCondition { key, line, source } => match source.as_ref() {
                StratsimError::RuleParse(pe) => format!(
                    "failed to parse [strategy] {}:\n{}",
                    key,
                    pe.display_with_context(line)
                ),
                other => format!("[strategy] {} = \"{}\": {}", key, line, other),
            },
            other => other.to_string(),
        }
    }
}

impl From<&StratsimError> for std::process::ExitCode {
    fn from(err: &StratsimError) -> Self {
        let code: u8 = match err {
            StratsimError::Io(_) => 1,
            StratsimError::ConfigParse { .. }
            | StratsimError::ConfigMissing { .. }
            | StratsimError::ConfigInvalid { .. } => 2,
            StratsimError::Data { .. } | StratsimError::NoData { .. } => 3,
            StratsimError::RuleParse(_)
            | StratsimError::RuleInvalid { .. }
            | StratsimError::UnknownIndicator { .. }
            | StratsimError::UnknownOperator { .. }
            | StratsimError::InvalidCondition { .. } => 4,
            StratsimError::EmptyCandles | StratsimError::InsufficientData { .. } => 5,
            StratsimError::InvalidRiskConfig { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
