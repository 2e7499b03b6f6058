//! Logging utilities.
//!
//! Library code only uses the `log` facade. Binaries call [`init_logging`]
//! once, usually from the `[logging]` config section.

mod init;

pub use init::{init_logging, LoggingConfig};