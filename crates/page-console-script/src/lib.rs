//! Reference script engine for the page console.
//!
//! A small JavaScript-flavoured language: a `logos` lexer, a recursive-descent
//! parser with positioned diagnostics, and a tree-walking evaluator that runs
//! against a [`page_console_core::Realm`].

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;

pub use error::ParseError;
pub use interpreter::ScriptInterpreter;
pub use parser::parse;
