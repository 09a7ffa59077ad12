// @file: kline_exporter/src/core/error.rs
// @description: Error taxonomy shared by parsing, fetching and export.
// @author: LAS.

use thiserror::Error;

//
// TYPE DEFINITIONS
//

pub type Result<T> = std::result::Result<T, KlineError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KlineError {
    /// Interval code without a recognised unit or a positive integer prefix.
    #[error("unparseable interval: {0:?}")]
    UnparseableInterval(String),

    /// Date expression the date parser could not resolve.
    #[error("unparseable date: {0:?}")]
    UnparseableDate(String),

    #[error("transport failure: {0}")]
    Transport(String),

    /// Endpoint answered with a throttling status (429 / 418).
    #[error("rate limited by endpoint (HTTP {status})")]
    RateLimited { status: u16 },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Interactive input could not be read.
    #[error("input error: {0}")]
    Input(String),
}

impl KlineError {
    // #1. Caller errors are raised before any network call is made
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            KlineError::UnparseableInterval(_) | KlineError::UnparseableDate(_)
        )
    }

    // #2. Only network-level conditions are worth another attempt
    pub fn is_retriable(&self) -> bool {
        matches!(self, KlineError::Transport(_) | KlineError::RateLimited { .. })
    }
}

impl From<std::io::Error> for KlineError {
    fn from(e: std::io::Error) -> Self {
        KlineError::Export(e.to_string())
    }
}

impl From<csv::Error> for KlineError {
    fn from(e: csv::Error) -> Self {
        KlineError::Export(e.to_string())
    }
}

impl From<config::ConfigError> for KlineError {
    fn from(e: config::ConfigError) -> Self {
        KlineError::Config(e.to_string())
    }
}
