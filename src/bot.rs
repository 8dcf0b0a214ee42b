use crate::api::{Brokerage, MarketData};
use crate::execution::{ExecutionReport, Executor, PollPolicy};
use crate::indicators::{ema_from_bars, required_closes, window_start};
use crate::models::{AccountSnapshot, Quote, Signal};
use crate::notify::{Notifier, StatusReport};
use crate::schedule::{Rescheduler, ScheduleRule};
use crate::strategy::decide;
use crate::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// What the bot trades and how long it waits for fills
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub symbol: String,
    pub ema_period: usize,
    pub poll_policy: PollPolicy,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "TQQQ".to_string(),
            ema_period: 50,
            poll_policy: PollPolicy::default(),
        }
    }
}

/// Result of one invocation
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub snapshot: AccountSnapshot,
    pub quote: Quote,
    pub ema: Decimal,
    pub signal: Signal,
    pub execution: Option<ExecutionReport>,
    /// Buy signal with no cash to invest; no order was placed
    pub buy_skipped: bool,
    pub notified: bool,
    pub schedule: ScheduleRule,
}

/// One trading cycle: read state, decide, trade, report, reschedule
pub struct Bot {
    broker: Arc<dyn Brokerage>,
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    rescheduler: Rescheduler,
    config: BotConfig,
}

impl Bot {
    pub fn new(
        broker: Arc<dyn Brokerage>,
        market: Arc<dyn MarketData>,
        notifier: Arc<dyn Notifier>,
        rescheduler: Rescheduler,
        config: BotConfig,
    ) -> Self {
        Self {
            broker,
            market,
            notifier,
            rescheduler,
            config,
        }
    }

    pub async fn run(&self) -> Result<CycleOutcome> {
        self.run_at(Utc::now()).await
    }

    /// Run a cycle as if it started at `now`
    ///
    /// Position, price and EMA are all read inside this call, so the
    /// decision never mixes data from different cycles.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        let symbol = self.config.symbol.as_str();

        let snapshot = self.broker.snapshot().await?;
        let in_cash = snapshot.in_cash();
        tracing::info!(in_cash, cash = %snapshot.cash_available, "Account state");

        let quote = self.market.latest_quote(symbol).await?;
        if quote.ask_price <= Decimal::ZERO {
            return Err(Error::InvalidQuote {
                symbol: symbol.to_string(),
                ask_price: quote.ask_price.to_string(),
            });
        }
        tracing::info!(symbol, ask = %quote.ask_price, "Current price");

        let ema = self.compute_ema(now.date_naive()).await?;
        tracing::info!(symbol, period = self.config.ema_period, %ema, "EMA computed");

        let signal = decide(ema, quote.ask_price, in_cash);
        tracing::info!(
            ?signal,
            %ema,
            price = %quote.ask_price,
            in_cash,
            "Decision"
        );

        let executor = Executor::new(self.broker.as_ref(), self.config.poll_policy);
        let mut buy_skipped = false;
        let execution = match executor.execute(signal, symbol, &snapshot).await {
            Ok(execution) => execution,
            // Reported and rescheduled like any other outcome
            Err(Error::InsufficientFunds { available }) => {
                tracing::warn!(symbol, %available, "Buy signal but no cash to invest, skipping order");
                buy_skipped = true;
                None
            }
            Err(e) => return Err(e),
        };

        let report = StatusReport {
            executed_at: now,
            symbol,
            ema,
            ema_period: self.config.ema_period,
            ask_price: quote.ask_price,
            in_cash,
            cash_available: snapshot.cash_available,
            buy_skipped,
            execution: execution.as_ref(),
            poll_window: self.config.poll_policy.window(),
        };
        let notified = self.notify(&report).await;

        let clock = self.broker.clock().await?;
        tracing::info!(
            is_open = clock.is_open,
            next_open = %clock.next_open,
            next_close = %clock.next_close,
            "Market clock"
        );
        let schedule = self.rescheduler.reschedule(clock.next_close).await?;

        Ok(CycleOutcome {
            snapshot,
            quote,
            ema,
            signal,
            execution,
            buy_skipped,
            notified,
            schedule,
        })
    }

    /// EMA over the trailing window of trading days ending `today`
    async fn compute_ema(&self, today: NaiveDate) -> Result<Decimal> {
        let needed = required_closes(self.config.ema_period);

        // Twice as many calendar days always covers `needed` trading days
        let lookback = Days::new(2 * needed as u64);
        let from = today.checked_sub_days(lookback).unwrap_or(NaiveDate::MIN);

        let calendar = self.market.trading_days(from, today).await?;
        let start = window_start(&calendar, needed)?;

        let bars = self.market.daily_bars(&self.config.symbol, start).await?;
        tracing::debug!(
            start = %start,
            bars = bars.len(),
            "Closing prices recorded: {:?}",
            bars.iter().map(|b| b.close).collect::<Vec<_>>()
        );

        ema_from_bars(&bars, self.config.ema_period)
    }

    /// Send the status email; failures are logged and swallowed
    async fn notify(&self, report: &StatusReport<'_>) -> bool {
        match self.notifier.send(&report.subject(), &report.body()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Status message failed: {}", e);
                false
            }
        }
    }
}
