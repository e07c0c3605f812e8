//! Markup rendering of values and errors for the console output.

use std::fmt::Write as _;

use crate::value::{ObjectKind, ObjectRef, Value};

/// Escape text for inclusion in HTML.
#[must_use]
pub fn escape_html_entities(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render any value as styled markup.
#[must_use]
pub fn html_from_value(value: &Value) -> String {
    let mut out = String::new();
    MarkupGenerator::default().value(&mut out, value);
    out
}

/// Render a thrown object as error markup: name, message, then stack frames.
///
/// Objects that are neither error objects nor carry a `name` or `message`
/// fall back to [`html_from_value`].
#[must_use]
pub fn html_from_error(error: &ObjectRef) -> String {
    let name = error.get("name");
    let message = error.get("message");
    if !error.is_error() && name.is_nullish() && message.is_nullish() {
        return html_from_value(&Value::Object(error.clone()));
    }

    let name = if name.is_nullish() {
        "Error".to_string()
    } else {
        name.to_display_string()
    };
    let mut out = format!(
        "<span class=\"js-error-name\">{}</span>",
        escape_html_entities(&name)
    );
    if !message.is_nullish() {
        let _ = write!(
            out,
            ": <span class=\"js-error-message\">{}</span>",
            escape_html_entities(&message.to_display_string())
        );
    }

    if let Value::String(stack) = error.get("stack") {
        for frame in stack.lines().filter(|line| !line.trim().is_empty()) {
            let _ = write!(
                out,
                "<br>&nbsp;&nbsp;<span class=\"js-error-frame\">{}</span>",
                escape_html_entities(frame.trim())
            );
        }
    }
    out
}

#[derive(Default)]
struct MarkupGenerator {
    seen: Vec<usize>,
}

impl MarkupGenerator {
    fn value(&mut self, out: &mut String, value: &Value) {
        match value {
            Value::Undefined => out.push_str("<span class=\"js-undefined\">undefined</span>"),
            Value::Null => out.push_str("<span class=\"js-null\">null</span>"),
            Value::Boolean(b) => {
                let _ = write!(out, "<span class=\"js-boolean\">{b}</span>");
            }
            Value::Number(_) => {
                let _ = write!(
                    out,
                    "<span class=\"js-number\">{}</span>",
                    value.to_display_string()
                );
            }
            Value::String(s) => {
                let _ = write!(
                    out,
                    "<span class=\"js-string\">&quot;{}&quot;</span>",
                    escape_html_entities(s)
                );
            }
            Value::Object(object) => self.object(out, object),
        }
    }

    fn object(&mut self, out: &mut String, object: &ObjectRef) {
        if self.seen.contains(&object.id()) {
            out.push_str("<span class=\"js-circular\">[Circular]</span>");
            return;
        }

        match object.kind() {
            ObjectKind::Function(callable) => {
                let _ = write!(
                    out,
                    "<span class=\"js-function\">[Function {}]</span>",
                    escape_html_entities(callable.name())
                );
            }
            ObjectKind::Error => out.push_str(&html_from_error(object)),
            ObjectKind::Array => {
                self.seen.push(object.id());
                let elements = object.elements();
                out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    out.push_str(if i == 0 { " " } else { ", " });
                    self.value(out, element);
                }
                out.push_str(if elements.is_empty() { "]" } else { " ]" });
                self.seen.pop();
            }
            ObjectKind::Ordinary | ObjectKind::Forwarding(_) => {
                self.seen.push(object.id());
                let entries = object.entries();
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    out.push_str(if i == 0 { " " } else { ", " });
                    let _ = write!(
                        out,
                        "<span class=\"js-property\">{}</span>: ",
                        escape_html_entities(key)
                    );
                    self.value(out, value);
                }
                out.push_str(if entries.is_empty() { "}" } else { " }" });
                self.seen.pop();
            }
        }
    }
}
