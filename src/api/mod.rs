pub mod alpaca;

pub use alpaca::AlpacaClient;

use crate::models::{AccountSnapshot, Bar, Holding, MarketClock, Order, Quote, TradingDay};
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Quotes, daily bars and the trading calendar
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn latest_quote(&self, symbol: &str) -> Result<Quote>;

    /// Daily bars from `start` up to now, oldest first
    async fn daily_bars(&self, symbol: &str, start: NaiveDate) -> Result<Vec<Bar>>;

    /// Trading days in `[start, end]`, oldest first
    async fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradingDay>>;
}

/// Account, positions and order management
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Non-marginable buying power
    async fn cash_available(&self) -> Result<Decimal>;

    async fn positions(&self) -> Result<Vec<Holding>>;

    /// Day market buy sized in dollars
    async fn submit_notional_buy(&self, symbol: &str, notional: Decimal) -> Result<Order>;

    /// Liquidate the whole position in `symbol`
    async fn close_position(&self, symbol: &str) -> Result<Order>;

    async fn order(&self, id: Uuid) -> Result<Order>;

    async fn clock(&self) -> Result<MarketClock>;

    /// Cash and positions read back to back
    async fn snapshot(&self) -> Result<AccountSnapshot> {
        let positions = self.positions().await?;
        let cash_available = self.cash_available().await?;
        Ok(AccountSnapshot {
            cash_available,
            positions,
        })
    }
}
