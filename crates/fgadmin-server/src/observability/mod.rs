//! Observability setup for the fgadmin services.
//!
//! Only structured logging is provided; spans come from `#[instrument]` on
//! the service operations.

mod logging;

pub use logging::{env_filter, init_logging};
