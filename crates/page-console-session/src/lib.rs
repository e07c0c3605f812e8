//! Console session orchestration.
//!
//! - `ConsoleSession` - evaluation, logging and peer notification
//! - `ConsoleHandle` - async command front end running the session on its
//!   own blocking task
//! - `ConsoleConfig` - TOML-backed settings

pub mod config;
pub mod console;
pub mod handle;

pub use config::{ConfigError, ConsoleConfig};
pub use console::ConsoleSession;
pub use handle::{ConsoleHandle, HandleError};
