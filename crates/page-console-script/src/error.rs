//! Parser error types

use page_console_core::{Diagnostic, SourceLocation};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected token {found}. Expected {expected}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input. Expected {expected}")]
    UnexpectedEof { position: usize, expected: String },

    #[error("Unexpected character '{found}'")]
    UnexpectedCharacter { position: usize, found: String },

    #[error("Invalid assignment target")]
    InvalidAssignmentTarget { position: usize },

    #[error("Missing initializer in const declaration")]
    MissingInitializer { position: usize },

    #[error("Maximum nesting depth of {max_depth} exceeded")]
    MaxDepthExceeded { position: usize, max_depth: usize },
}

impl ParseError {
    /// Byte offset the error points at.
    #[must_use]
    pub const fn position(&self) -> usize {
        match self {
            Self::UnexpectedToken { position, .. }
            | Self::UnexpectedEof { position, .. }
            | Self::UnexpectedCharacter { position, .. }
            | Self::InvalidAssignmentTarget { position }
            | Self::MissingInitializer { position }
            | Self::MaxDepthExceeded { position, .. } => *position,
        }
    }

    /// Convert into a positioned diagnostic against `source`.
    #[must_use]
    pub fn to_diagnostic(&self, source: &str) -> Diagnostic {
        Diagnostic {
            message: self.to_string(),
            location: Some(locate(source, self.position())),
        }
    }
}

/// 1-based line and column of a byte offset.
#[must_use]
pub fn locate(source: &str, position: usize) -> SourceLocation {
    let position = position.min(source.len());
    let before = source.get(..position).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    SourceLocation { line, column }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        assert_eq!(locate("(", 1), SourceLocation { line: 1, column: 2 });
        assert_eq!(locate("a\nbc", 3), SourceLocation { line: 2, column: 2 });
        assert_eq!(locate("", 10), SourceLocation { line: 1, column: 1 });
    }

    #[test]
    fn test_diagnostic_message() {
        let err = ParseError::UnexpectedEof {
            position: 1,
            expected: "expression".into(),
        };
        let diagnostic = err.to_diagnostic("(");
        assert_eq!(diagnostic.message, "Unexpected end of input. Expected expression");
        assert_eq!(diagnostic.location, Some(SourceLocation { line: 1, column: 2 }));
    }
}
