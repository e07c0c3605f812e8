//! Native functions installed on the page global.

use std::{any::Any, sync::Arc};

use page_console_core::{
    LogLevel, Object, ObjectRef, Value,
    value::{Callable, number_to_string},
};

use crate::ast::FunctionDecl;
use crate::interpreter::Scope;

/// Console API methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMethod {
    Log,
    Info,
    Warn,
    Error,
    Debug,
    Trace,
    Group,
    GroupCollapsed,
    GroupEnd,
    Clear,
    Count,
    CountReset,
    Assert,
}

impl ConsoleMethod {
    pub const ALL: [Self; 13] = [
        Self::Log,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Debug,
        Self::Trace,
        Self::Group,
        Self::GroupCollapsed,
        Self::GroupEnd,
        Self::Clear,
        Self::Count,
        Self::CountReset,
        Self::Assert,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Group => "group",
            Self::GroupCollapsed => "groupCollapsed",
            Self::GroupEnd => "groupEnd",
            Self::Clear => "clear",
            Self::Count => "count",
            Self::CountReset => "countReset",
            Self::Assert => "assert",
        }
    }

    /// Level for the value-printing methods.
    #[must_use]
    pub const fn level(self) -> LogLevel {
        match self {
            Self::Info => LogLevel::Info,
            Self::Warn => LogLevel::Warn,
            Self::Error => LogLevel::Error,
            Self::Debug => LogLevel::Debug,
            Self::Trace => LogLevel::Trace,
            Self::Group => LogLevel::Group,
            Self::GroupCollapsed => LogLevel::GroupCollapsed,
            Self::Count => LogLevel::Count,
            Self::CountReset => LogLevel::CountReset,
            Self::Assert => LogLevel::Assert,
            Self::Log | Self::GroupEnd | Self::Clear => LogLevel::Log,
        }
    }
}

/// Error constructors exposed as globals.
pub const ERROR_CONSTRUCTORS: [&str; 5] = [
    "Error",
    "TypeError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
];

/// A function implemented by the interpreter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Console(ConsoleMethod),
    ErrorConstructor(&'static str),
}

impl Callable for Builtin {
    fn name(&self) -> &str {
        match self {
            Self::Console(method) => method.name(),
            Self::ErrorConstructor(name) => name,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A function defined by script source, with the scope it closed over.
#[derive(Debug)]
pub struct ScriptFunction {
    pub(crate) decl: Arc<FunctionDecl>,
    pub(crate) closure: Scope,
}

impl Callable for ScriptFunction {
    fn name(&self) -> &str {
        if self.decl.name.is_empty() {
            "anonymous"
        } else {
            &self.decl.name
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn function_object(builtin: Builtin) -> Value {
    Value::Object(ObjectRef::new(Object::function(Arc::new(builtin))))
}

/// Build a fresh page global object: the `console` namespace, the error
/// constructors and the usual value globals.
#[must_use]
pub fn page_global() -> ObjectRef {
    let console = ConsoleMethod::ALL
        .into_iter()
        .fold(Object::ordinary(), |object, method| {
            object.with_property(method.name(), function_object(Builtin::Console(method)))
        });

    let mut window = Object::ordinary()
        .with_property("console", Value::Object(ObjectRef::new(console)))
        .with_property("undefined", Value::Undefined)
        .with_property("NaN", Value::Number(f64::NAN))
        .with_property("Infinity", Value::Number(f64::INFINITY));
    for name in ERROR_CONSTRUCTORS {
        window.define(name, function_object(Builtin::ErrorConstructor(name)));
    }

    let window = ObjectRef::new(window);
    window.set("window", Value::Object(window.clone()));
    window.set("globalThis", Value::Object(window.clone()));
    window
}

/// Text for `console.count(label)`.
#[must_use]
pub fn count_message(label: &str, count: u32) -> String {
    format!("{label}: {}", number_to_string(f64::from(count)))
}

/// Text for `console.assert(false, ...rest)`.
#[must_use]
pub fn assertion_message(rest: &[Value]) -> String {
    if rest.is_empty() {
        "Assertion failed".to_string()
    } else {
        format!(
            "Assertion failed: {}",
            page_console_core::printer::join_values(rest)
        )
    }
}
