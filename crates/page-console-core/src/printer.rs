//! Console printer: turns console API calls into log entries.

use std::{fmt, sync::Arc};

use crate::{entry::Entry, markup::escape_html_entities, value::Value};

/// Console log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Assert,
    Count,
    CountReset,
    Debug,
    Dir,
    Error,
    Group,
    GroupCollapsed,
    Info,
    Log,
    TimeEnd,
    TimeLog,
    Trace,
    Warn,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assert => "assert",
            Self::Count => "count",
            Self::CountReset => "countReset",
            Self::Debug => "debug",
            Self::Dir => "dir",
            Self::Error => "error",
            Self::Group => "group",
            Self::GroupCollapsed => "groupCollapsed",
            Self::Info => "info",
            Self::Log => "log",
            Self::TimeEnd => "timeEnd",
            Self::TimeLog => "timeLog",
            Self::Trace => "trace",
            Self::Warn => "warn",
        }
    }

    const fn span_open(self) -> &'static str {
        match self {
            Self::Debug => "<span class=\"debug\">(d) ",
            Self::Error => "<span class=\"error\">(e) ",
            Self::Info => "<span class=\"info\">(i) ",
            Self::Log => "<span class=\"log\"> ",
            Self::Warn | Self::CountReset => "<span class=\"warn\">(w) ",
            _ => "<span>",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `console.trace()` call: optional label plus call-stack frames, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    pub label: String,
    pub stack: Vec<String>,
}

/// A `console.group()` / `console.groupCollapsed()` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub label: String,
}

/// Arguments handed to the printer.
#[derive(Debug, Clone)]
pub enum PrinterArguments {
    Trace(Trace),
    Group(Group),
    Values(Vec<Value>),
}

/// Side channel that receives the plain text of every generic-level message.
pub trait DebugOutput: Send + Sync {
    fn output_debug_message(&self, level: LogLevel, message: &str);
}

/// Emits console messages as `tracing` events under `page_console::debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDebugOutput;

impl DebugOutput for TracingDebugOutput {
    fn output_debug_message(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error | LogLevel::Assert => {
                tracing::error!(target: "page_console::debug", console_level = %level, "{message}");
            }
            LogLevel::Warn | LogLevel::CountReset => {
                tracing::warn!(target: "page_console::debug", console_level = %level, "{message}");
            }
            LogLevel::Debug => {
                tracing::debug!(target: "page_console::debug", console_level = %level, "{message}");
            }
            LogLevel::Trace => {
                tracing::trace!(target: "page_console::debug", console_level = %level, "{message}");
            }
            _ => tracing::info!(target: "page_console::debug", console_level = %level, "{message}"),
        }
    }
}

/// Formats console API calls into log entries.
#[derive(Clone, Default)]
pub struct Printer {
    debug_output: Option<Arc<dyn DebugOutput>>,
}

impl fmt::Debug for Printer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer")
            .field("debug_output", &self.debug_output.is_some())
            .finish()
    }
}

impl Printer {
    /// Printer forwarding generic messages to `debug_output`.
    #[must_use]
    pub fn new(debug_output: Arc<dyn DebugOutput>) -> Self {
        Self {
            debug_output: Some(debug_output),
        }
    }

    /// Printer without a debug side channel.
    #[must_use]
    pub fn silent() -> Self {
        Self { debug_output: None }
    }

    /// Format one console call.
    ///
    /// The level picks the shape of the entry: `Trace` renders trace markup,
    /// `Group`/`GroupCollapsed` open a group, and every other level produces a
    /// level-styled line. Arguments that do not match the level are reduced to
    /// their text.
    #[must_use]
    pub fn print(&self, level: LogLevel, arguments: PrinterArguments) -> Entry {
        match (level, arguments) {
            (LogLevel::Trace, PrinterArguments::Trace(trace)) => Entry::html(trace_html(&trace)),
            (LogLevel::Trace, PrinterArguments::Values(values)) => {
                let trace = Trace {
                    label: join_values(&values),
                    stack: Vec::new(),
                };
                Entry::html(trace_html(&trace))
            }
            (LogLevel::Group | LogLevel::GroupCollapsed, arguments) => {
                let label = match arguments {
                    PrinterArguments::Group(group) => group.label,
                    PrinterArguments::Trace(trace) => trace.label,
                    PrinterArguments::Values(values) => join_values(&values),
                };
                Entry::begin_group(label, level == LogLevel::Group)
            }
            (_, PrinterArguments::Values(values)) => self.line(level, &join_values(&values)),
            (
                _,
                PrinterArguments::Trace(Trace { label, .. })
                | PrinterArguments::Group(Group { label }),
            ) => self.line(level, &label),
        }
    }

    fn line(&self, level: LogLevel, output: &str) -> Entry {
        if let Some(debug_output) = &self.debug_output {
            debug_output.output_debug_message(level, output);
        }
        Entry::html(format!(
            "{}{}</span>",
            level.span_open(),
            escape_html_entities(output)
        ))
    }

    /// Close the innermost group. Legal with no group open.
    #[must_use]
    pub const fn end_group(&self) -> Entry {
        Entry::end_group()
    }
}

/// Join console arguments with single spaces.
#[must_use]
pub fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_display_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn trace_html(trace: &Trace) -> String {
    let mut html = String::new();
    if !trace.label.is_empty() {
        html.push_str("<span class='title'>");
        html.push_str(&escape_html_entities(&trace.label));
        html.push_str("</span><br>");
    }

    html.push_str("<span class='trace'>");
    for function_name in &trace.stack {
        html.push_str("-> ");
        html.push_str(&escape_html_entities(function_name));
        html.push_str("<br>");
    }
    html.push_str("</span>");
    html
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::entry::EntryKind;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(LogLevel, String)>>);

    impl DebugOutput for Recorder {
        fn output_debug_message(&self, level: LogLevel, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn test_generic_levels_are_joined_escaped_and_styled() {
        let recorder = Arc::new(Recorder::default());
        let printer = Printer::new(recorder.clone());

        let entry = printer.print(
            LogLevel::Warn,
            PrinterArguments::Values(vec![Value::from("a<b"), Value::from(3.0)]),
        );

        assert_eq!(entry.kind(), EntryKind::Html);
        assert_eq!(entry.payload(), "<span class=\"warn\">(w) a&lt;b 3</span>");
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![(LogLevel::Warn, "a<b 3".to_string())]
        );
    }

    #[test]
    fn test_level_prefixes() {
        let printer = Printer::silent();
        let line = |level| {
            printer
                .print(level, PrinterArguments::Values(vec![Value::from("x")]))
                .payload()
                .to_string()
        };

        assert_eq!(line(LogLevel::Debug), "<span class=\"debug\">(d) x</span>");
        assert_eq!(line(LogLevel::Error), "<span class=\"error\">(e) x</span>");
        assert_eq!(line(LogLevel::Info), "<span class=\"info\">(i) x</span>");
        assert_eq!(line(LogLevel::Log), "<span class=\"log\"> x</span>");
        assert_eq!(line(LogLevel::CountReset), "<span class=\"warn\">(w) x</span>");
        assert_eq!(line(LogLevel::Count), "<span>x</span>");
    }

    #[test]
    fn test_trace_markup() {
        let printer = Printer::silent();
        let entry = printer.print(
            LogLevel::Trace,
            PrinterArguments::Trace(Trace {
                label: "here".into(),
                stack: vec!["inner".into(), "<outer>".into()],
            }),
        );

        assert_eq!(
            entry.payload(),
            "<span class='title'>here</span><br><span class='trace'>-> inner<br>-> &lt;outer&gt;<br></span>"
        );
    }

    #[test]
    fn test_trace_without_label_has_no_title() {
        let entry = Printer::silent().print(
            LogLevel::Trace,
            PrinterArguments::Trace(Trace::default()),
        );
        assert_eq!(entry.payload(), "<span class='trace'></span>");
    }

    #[test]
    fn test_groups() {
        let printer = Printer::silent();
        let open = printer.print(
            LogLevel::Group,
            PrinterArguments::Group(Group { label: "g".into() }),
        );
        let collapsed = printer.print(
            LogLevel::GroupCollapsed,
            PrinterArguments::Group(Group { label: "c".into() }),
        );

        let from_values = printer.print(
            LogLevel::GroupCollapsed,
            PrinterArguments::Values(vec![Value::from("v"), Value::from(1.0)]),
        );

        assert_eq!(open.kind(), EntryKind::BeginGroup { expanded: true });
        assert_eq!(from_values.kind(), EntryKind::BeginGroup { expanded: false });
        assert_eq!(from_values.payload(), "v 1");
        assert_eq!(collapsed.kind(), EntryKind::BeginGroup { expanded: false });
        assert_eq!(printer.end_group().kind(), EntryKind::EndGroup);
    }

    #[test]
    fn test_level_decides_shape() {
        let recorder = Arc::new(Recorder::default());
        let printer = Printer::new(recorder.clone());

        let trace = printer.print(
            LogLevel::Trace,
            PrinterArguments::Values(vec![Value::from("t")]),
        );
        assert_eq!(
            trace.payload(),
            "<span class='title'>t</span><br><span class='trace'></span>"
        );

        let line = printer.print(
            LogLevel::Log,
            PrinterArguments::Group(Group { label: "g".into() }),
        );
        assert_eq!(line.kind(), EntryKind::Html);
        assert_eq!(line.payload(), "<span class=\"log\"> g</span>");
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![(LogLevel::Log, "g".to_string())]
        );
    }
}
