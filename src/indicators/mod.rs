// Technical indicators module
pub mod moving_average;

pub use moving_average::{
    calculate_sma, ema_from_bars, required_closes, seeded_ema, window_start,
};
