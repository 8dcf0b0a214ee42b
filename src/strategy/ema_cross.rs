use crate::models::Signal;
use rust_decimal::Decimal;

/// Decide what to do given the EMA, the current ask and the position state
///
/// - Sell when price has dropped below the EMA and we hold the stock
/// - Buy when price is above the EMA and we are flat
/// - Otherwise hold (equal prices, or already on the right side)
pub fn decide(ema: Decimal, current_price: Decimal, in_cash: bool) -> Signal {
    if ema > current_price && !in_cash {
        Signal::Sell
    } else if ema < current_price && in_cash {
        Signal::Buy
    } else {
        Signal::Hold
    }
}
