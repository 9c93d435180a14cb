// src/errors.rs
use rust_decimal::Decimal;
use thiserror::Error;

/// An order that must not be submitted. Locally recoverable: the offending
/// order is dropped with a warning, the step carries on.
#[derive(Debug, Error, PartialEq)]
pub enum OrderValidationError {
    #[error("[{order}] is below minimum amount of {minimum}")]
    TooSmall { order: String, minimum: Decimal },

    #[error("[{order}] requires {required} {currency}, which exceeds held balance of {held}")]
    InsufficientBalance {
        order: String,
        required: Decimal,
        currency: String,
        held: Decimal,
    },
}

/// No direct market exists for a price lookup or between the two sides of a
/// trade intent (indirect routing is not supported). Raised per intent; the
/// batch reifier skips past it.
#[derive(Debug, Error, PartialEq)]
#[error("no market available: {0}")]
pub struct NoMarketAvailableError(pub String);

/// A market string that does not split into exactly two coin symbols.
#[derive(Debug, Error, PartialEq)]
#[error("unable to extract 2 currencies from market string {0}")]
pub struct BadMarketSymbol(pub String);

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange killed the order instead of filling it at our price.
    /// The only error the retry machine reacts to.
    #[error("unable to fill order completely")]
    CouldNotFill,

    /// Server-side failure (5xx). Transient; the live loop skips the step.
    #[error("exchange server error: {0}")]
    Server(String),

    /// Any other error the exchange reports. Terminal for the order.
    #[error("exchange error: {0}")]
    Api(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ExchangeError {
    /// Errors the live loop recovers from by waiting for the next step.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Server(_) | ExchangeError::Transport(_))
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("no chart data at or before {0}")]
    NoData(chrono::DateTime<chrono::Utc>),

    #[error("failed to read chart store: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse chart store: {0}")]
    Parse(#[from] serde_json::Error),
}
