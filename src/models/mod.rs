use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Latest quote for the traded symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub ask_price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Daily bar - only the close matters for the EMA
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: Decimal,
}

/// One session of the trading calendar
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TradingDay {
    pub date: NaiveDate,
}

/// Quantity held in a single symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub quantity: Decimal,
}

/// Account state read once at the start of a cycle
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    /// Non-marginable buying power
    pub cash_available: Decimal,
    pub positions: Vec<Holding>,
}

impl AccountSnapshot {
    /// Flat means no open positions at all
    pub fn in_cash(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Trading signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order as reported by the brokerage
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub submitted_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub filled_avg_price: Option<Decimal>,
}

impl Order {
    /// Fill time and price, once both are reported
    pub fn fill(&self) -> Option<(DateTime<Utc>, Decimal)> {
        match (self.filled_at, self.filled_avg_price) {
            (Some(at), Some(price)) => Some((at, price)),
            _ => None,
        }
    }
}

/// Market clock
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MarketClock {
    pub timestamp: DateTime<Utc>,
    pub is_open: bool,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
}
