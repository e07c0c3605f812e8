//! Typed console log entries.

use serde::{Deserialize, Serialize};

/// Kind of a logged entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    /// Rendered markup.
    Html,
    /// The peer should visually reset its output.
    Clear,
    /// Opens a group; the payload is its label.
    BeginGroup { expanded: bool },
    /// Closes the innermost open group, if any.
    EndGroup,
}

impl EntryKind {
    /// Wire label for this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Clear => "clear",
            Self::BeginGroup { expanded: true } => "group",
            Self::BeginGroup { expanded: false } => "groupCollapsed",
            Self::EndGroup => "groupEnd",
        }
    }
}

/// One immutable unit in the console's output log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    kind: EntryKind,
    payload: String,
}

impl Entry {
    #[must_use]
    pub fn html(markup: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Html,
            payload: markup.into(),
        }
    }

    #[must_use]
    pub const fn clear() -> Self {
        Self {
            kind: EntryKind::Clear,
            payload: String::new(),
        }
    }

    #[must_use]
    pub fn begin_group(label: impl Into<String>, expanded: bool) -> Self {
        Self {
            kind: EntryKind::BeginGroup { expanded },
            payload: label.into(),
        }
    }

    #[must_use]
    pub const fn end_group() -> Self {
        Self {
            kind: EntryKind::EndGroup,
            payload: String::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Approximate size in bytes, for logging.
    #[must_use]
    pub fn approx_bytes(&self) -> usize {
        const OVERHEAD: usize = 8;
        self.payload.len() + OVERHEAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(Entry::html("<b>x</b>").kind().label(), "html");
        assert_eq!(Entry::clear().kind().label(), "clear");
        assert_eq!(Entry::begin_group("g", true).kind().label(), "group");
        assert_eq!(Entry::begin_group("g", false).kind().label(), "groupCollapsed");
        assert_eq!(Entry::end_group().kind().label(), "groupEnd");
    }

    #[test]
    fn test_payloads() {
        assert_eq!(Entry::begin_group("label", false).payload(), "label");
        assert!(Entry::clear().payload().is_empty());
        assert!(Entry::end_group().payload().is_empty());
    }
}
