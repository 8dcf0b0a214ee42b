use crate::api::Brokerage;
use crate::models::{AccountSnapshot, Order, OrderSide, Signal};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::time::Duration;
use uuid::Uuid;

/// How long to wait for a fill before giving up for this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_attempts: 4, // immediate check + 3 more, ~90s total
        }
    }
}

impl PollPolicy {
    /// Wall-clock ceiling between the first and the last status check
    pub fn window(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Outcome of a submitted order
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub order_id: Uuid,
    pub side: OrderSide,
    pub submitted_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub filled_price: Option<Decimal>,
}

impl ExecutionReport {
    fn pending(order: &Order) -> Self {
        Self {
            order_id: order.id,
            side: order.side,
            submitted_at: order.submitted_at,
            filled_at: None,
            filled_price: None,
        }
    }

    /// False once polling gave up without seeing a fill
    pub fn is_filled(&self) -> bool {
        self.filled_at.is_some() && self.filled_price.is_some()
    }
}

/// Submits orders for a signal and waits for them to fill
pub struct Executor<'a> {
    broker: &'a dyn Brokerage,
    policy: PollPolicy,
}

impl<'a> Executor<'a> {
    pub fn new(broker: &'a dyn Brokerage, policy: PollPolicy) -> Self {
        Self { broker, policy }
    }

    /// Act on a signal; `Hold` never touches the brokerage
    pub async fn execute(
        &self,
        signal: Signal,
        symbol: &str,
        snapshot: &AccountSnapshot,
    ) -> Result<Option<ExecutionReport>> {
        match signal {
            Signal::Buy => self.buy_max(symbol, snapshot.cash_available).await.map(Some),
            Signal::Sell => self.sell_all(symbol).await.map(Some),
            Signal::Hold => Ok(None),
        }
    }

    /// Convert all available cash into `symbol`
    pub async fn buy_max(&self, symbol: &str, cash_available: Decimal) -> Result<ExecutionReport> {
        let notional = notional_amount(cash_available)?;
        tracing::info!(symbol, %notional, "Submitting notional market buy");

        let order = self.broker.submit_notional_buy(symbol, notional).await?;
        tracing::info!(
            order_id = %order.id,
            submitted_at = %order.submitted_at,
            "Buy order submitted"
        );

        self.await_fill(&order).await
    }

    /// Liquidate the whole position in `symbol`
    pub async fn sell_all(&self, symbol: &str) -> Result<ExecutionReport> {
        tracing::info!(symbol, "Closing position");

        let order = self.broker.close_position(symbol).await?;
        tracing::info!(
            order_id = %order.id,
            submitted_at = %order.submitted_at,
            "Sell order submitted"
        );

        self.await_fill(&order).await
    }

    /// Poll order status until filled or out of attempts
    ///
    /// The first check is immediate. Running out of attempts is not an error:
    /// the report simply carries no fill.
    pub async fn await_fill(&self, order: &Order) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::pending(order);

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                tracing::info!(
                    "Order not filled yet, sleeping for {}s...",
                    self.policy.interval.as_secs()
                );
                tokio::time::sleep(self.policy.interval).await;
            }

            tracing::debug!(order_id = %order.id, attempt, "Checking order status");
            let status = self.broker.order(order.id).await?;

            if let Some((filled_at, price)) = status.fill() {
                tracing::info!(order_id = %order.id, %price, %filled_at, "Order filled");
                report.filled_at = Some(filled_at);
                report.filled_price = Some(price);
                return Ok(report);
            }
        }

        tracing::warn!(
            order_id = %order.id,
            "Order not filled after {} checks ({}s)",
            self.policy.max_attempts,
            self.policy.window().as_secs()
        );

        Ok(report)
    }
}

/// Whole cents only; the brokerage rejects finer notionals
fn notional_amount(cash_available: Decimal) -> Result<Decimal> {
    let notional = cash_available.round_dp_with_strategy(2, RoundingStrategy::ToZero);
    if notional <= Decimal::ZERO {
        return Err(Error::InsufficientFunds {
            available: cash_available.to_string(),
        });
    }
    Ok(notional)
}
