// Trading strategy module
pub mod ema_cross;

pub use ema_cross::decide;
