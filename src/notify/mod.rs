// Status notifications
pub mod smtp;

pub use smtp::SmtpNotifier;

use crate::execution::ExecutionReport;
use crate::models::OrderSide;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

/// Everything that goes into the cycle's status email
#[derive(Debug, Clone)]
pub struct StatusReport<'a> {
    pub executed_at: DateTime<Utc>,
    pub symbol: &'a str,
    pub ema: Decimal,
    pub ema_period: usize,
    pub ask_price: Decimal,
    pub in_cash: bool,
    pub cash_available: Decimal,
    /// A buy was called for but there was nothing to spend
    pub buy_skipped: bool,
    pub execution: Option<&'a ExecutionReport>,
    pub poll_window: Duration,
}

impl StatusReport<'_> {
    pub fn subject(&self) -> String {
        format!(
            "Trading Algorithm update ({})",
            self.executed_at.format("%m/%d/%Y")
        )
    }

    pub fn body(&self) -> String {
        let header = format!(
            "({})\nProgram executed at: {} UTC\n\n",
            self.executed_at.format("%m/%d/%Y"),
            self.executed_at.format("%H:%M")
        );

        let detail = match self.execution {
            None if self.buy_skipped => self.unfunded(),
            None => {
                let position = if self.in_cash { "cash" } else { self.symbol };
                format!("No action taken. Remaining in {}.", position)
            }
            Some(report) if report.is_filled() => self.filled(report),
            Some(report) => self.unconfirmed(report),
        };

        header + &detail
    }

    fn comparison_line(&self) -> String {
        format!(
            "Ask price (at time of comparison to {}-day EMA: {}): {}",
            self.ema_period,
            self.ema.round_dp(4),
            self.ask_price
        )
    }

    fn filled(&self, report: &ExecutionReport) -> String {
        let verb = match report.side {
            OrderSide::Buy => "Purchased",
            OrderSide::Sell => "Sold",
        };
        let filled_at = report
            .filled_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        let filled_price = report
            .filled_price
            .map(|p| p.to_string())
            .unwrap_or_default();

        format!(
            "{} {}\n\nOrder submitted at {}, filled at {}\n{}\nFilled price: {}",
            verb,
            self.symbol,
            report.submitted_at.format("%H:%M:%S"),
            filled_at,
            self.comparison_line(),
            filled_price
        )
    }

    fn unfunded(&self) -> String {
        format!(
            "WARNING: Buy signal for {} but only ${} available. No order placed.\n\n{}",
            self.symbol,
            self.cash_available,
            self.comparison_line()
        )
    }

    fn unconfirmed(&self, report: &ExecutionReport) -> String {
        let verb = match report.side {
            OrderSide::Buy => "purchase",
            OrderSide::Sell => "sell",
        };

        format!(
            "WARNING: Attempted to {} {}\n\nOrder submitted at {}, but not filled after {} seconds. \
             Please check account to determine if order went thru.\n\n{}",
            verb,
            self.symbol,
            report.submitted_at.format("%H:%M:%S"),
            self.poll_window.as_secs(),
            self.comparison_line()
        )
    }
}
