use crate::models::{Bar, TradingDay};
use crate::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Calculate Simple Moving Average (SMA) over the last `period` values
pub fn calculate_sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: Decimal = prices.iter().rev().take(period).sum();
    Some(sum / Decimal::from(period))
}

/// Number of closes needed to seed a `period` EMA: the seed window,
/// the latest close, and one extra trading day of slack
pub fn required_closes(period: usize) -> usize {
    period + 2
}

/// Calculate the seeded Exponential Moving Average (EMA)
///
/// Re-derived from scratch every cycle: the seed is the SMA of the `period`
/// closes preceding the latest one, then a single EMA step is applied with
/// the latest close. Nothing is carried over between cycles.
pub fn seeded_ema(closes: &[Decimal], period: usize) -> Result<Decimal> {
    let needed = required_closes(period);
    if closes.len() < needed {
        return Err(Error::InsufficientHistory {
            needed,
            available: closes.len(),
        });
    }

    let (latest, previous) = closes
        .split_last()
        .ok_or(Error::InsufficientHistory { needed, available: 0 })?;
    let seed = calculate_sma(previous, period).ok_or(Error::InsufficientHistory {
        needed,
        available: closes.len(),
    })?;

    let multiplier = Decimal::TWO / Decimal::from(period + 1);
    Ok((latest - seed) * multiplier + seed)
}

/// EMA over daily bars, oldest first
pub fn ema_from_bars(bars: &[Bar], period: usize) -> Result<Decimal> {
    let closes: Vec<Decimal> = bars.iter().map(|bar| bar.close).collect();
    seeded_ema(&closes, period)
}

/// First date of the trailing window of `days` trading days
///
/// Walks back over the trading calendar rather than calendar days so
/// weekends and holidays never shrink the window.
pub fn window_start(calendar: &[TradingDay], days: usize) -> Result<NaiveDate> {
    if days == 0 || calendar.len() < days {
        return Err(Error::InsufficientHistory {
            needed: days,
            available: calendar.len(),
        });
    }

    Ok(calendar[calendar.len() - days].date)
}
