//! Core abstractions for the page console.
//!
//! This crate provides the fundamental building blocks:
//! - `MessageLog` - Append-only, index-addressable console history
//! - `Entry` - Typed log entry
//! - `ExecutionContext` / `ScopeGuard` - Console global scope and the guard
//!   that swaps it into a page realm
//! - `Printer` and markup rendering
//! - `get_messages` - Index-based pulls for the remote peer
//! - Interpreter and peer traits

pub mod context;
pub mod entry;
pub mod markup;
pub mod message_log;
pub mod printer;
pub mod realm;
pub mod switcher;
pub mod sync;
pub mod traits;
pub mod value;

pub use context::ExecutionContext;
pub use entry::{Entry, EntryKind};
pub use message_log::MessageLog;
pub use printer::{DebugOutput, LogLevel, Printer, PrinterArguments, TracingDebugOutput};
pub use realm::{Environment, GlobalScope, Realm};
pub use switcher::ScopeGuard;
pub use sync::{MessageBatch, SyncError, get_messages};
pub use traits::{ConsoleClient, ConsolePeer, Diagnostic, Interpreter, SourceLocation};
pub use value::{Object, ObjectRef, Value};
