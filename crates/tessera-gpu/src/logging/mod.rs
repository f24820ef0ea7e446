//! Logging utilities.
//!
//! The device layer only speaks the `log` facade. This module offers a
//! one-call `env_logger` setup for binaries and tests that want to see the
//! device's diagnostics (shader logs, leak reports, debug groups).

mod init;

pub use init::{init_logging, LoggingConfig};
