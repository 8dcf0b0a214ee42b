// Order execution module
pub mod executor;

pub use executor::{ExecutionReport, Executor, PollPolicy};
