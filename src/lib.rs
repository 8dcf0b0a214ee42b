// Core modules
pub mod api;
pub mod bot;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod notify;
pub mod schedule;
pub mod secrets;
pub mod strategy;

// Re-export commonly used types
pub use api::{Brokerage, MarketData};
pub use error::Error;
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, Error>;
