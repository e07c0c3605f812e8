//! Seams to the script engine and to the remote peer.

use std::{fmt, sync::Arc};

use crate::{
    printer::{LogLevel, PrinterArguments},
    realm::Realm,
    sync::MessageBatch,
    value::Value,
};

/// 1-based position in script source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

/// A parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(
                f,
                "{} (line: {}, column: {})",
                self.message, location.line, location.column
            ),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

impl Diagnostic {
    /// The offending source line with a caret under the failing column, or an
    /// empty string when there is no usable location.
    #[must_use]
    pub fn source_location_hint(&self, source: &str) -> String {
        let Some(location) = self.location else {
            return String::new();
        };
        // An error at end of input can sit on a trailing empty line.
        let line = source
            .split('\n')
            .nth(location.line.saturating_sub(1))
            .map_or("", |line| line.strip_suffix('\r').unwrap_or(line));

        let padding: String = line
            .chars()
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .chain(std::iter::repeat(' '))
            .take(location.column.saturating_sub(1))
            .collect();
        format!("{line}\n{padding}^")
    }
}

/// Receiver of console API calls made by running script.
pub trait ConsoleClient {
    fn printer(&mut self, level: LogLevel, arguments: PrinterArguments);
    fn clear(&mut self);
    fn end_group(&mut self);
}

/// The script engine the console drives.
pub trait Interpreter: Send {
    /// A parsed, ready-to-run script.
    type Script;

    /// The realm scripts run against. Its active scope is what the console
    /// swaps.
    fn realm(&self) -> &Arc<Realm>;

    /// Parse `source` as a standalone script.
    ///
    /// # Errors
    /// Returns the first syntax error found.
    fn parse(&self, source: &str) -> Result<Self::Script, Diagnostic>;

    /// Run a parsed script against the realm's active scope.
    ///
    /// # Errors
    /// Returns the thrown value when the script throws.
    fn run(&mut self, script: &Self::Script, console: &mut dyn ConsoleClient) -> Result<Value, Value>;
}

/// The remote front end, as seen from the session.
pub trait ConsolePeer: Send + Sync {
    /// A new entry exists at `index`.
    fn did_output_message(&self, index: usize);

    /// Reply to a pull.
    fn did_get_messages(&self, batch: MessageBatch);

    /// The peer broke the sync protocol.
    fn did_misbehave(&self, reason: &str);
}
