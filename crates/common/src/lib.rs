pub mod config;
pub mod logging;
pub mod retry;

pub use config::Environment;
pub use logging::{TelemetryGuard, setup_logging};
pub use retry::{retry_with_backoff, wait_for_resource};
