use thiserror::Error;

/// Everything that can go wrong in a trading cycle
#[derive(Debug, Error)]
pub enum Error {
    /// Not enough trading days or bars to seed the EMA
    #[error("insufficient history: need {needed} closes, have {available}")]
    InsufficientHistory { needed: usize, available: usize },

    #[error("invalid quote for {symbol}: ask price {ask_price}")]
    InvalidQuote { symbol: String, ask_price: String },

    #[error("insufficient funds: {available} available for a notional buy")]
    InsufficientFunds { available: String },

    /// Brokerage returned a non-2xx response
    #[error("brokerage API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("secret retrieval failed: {0}")]
    Secrets(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error(transparent)]
    Config(#[from] ::config::ConfigError),
}
