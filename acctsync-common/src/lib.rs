//! Ambient utilities shared across acctsync crates: logging setup and the
//! bounded retry helper used for provider throttling backoff.

mod logging;
mod retry;

pub use logging::init_logging;
pub use retry::{retry_with_backoff, RetryError};
