//! Validation error bodies
//!
//! A 400 response carries either a map of field name to messages or a flat
//! list of messages. Both are turned into one inline message for the form.

use serde_json::Value;

use crate::render::escape_html;

/// Messages extracted from a 400 response body
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrors {
    /// Field name and the first message reported for it
    Fields(Vec<(String, String)>),
    /// Messages not tied to a field
    List(Vec<String>),
}

impl ValidationErrors {
    /// Parse a 400 body. Returns `None` when the body is neither an object
    /// nor an array.
    pub fn from_body(body: &Value) -> Option<Self> {
        match body {
            Value::Array(items) => Some(ValidationErrors::List(
                items.iter().map(message_text).collect(),
            )),
            Value::Object(map) => Some(ValidationErrors::Fields(
                map.iter()
                    .map(|(field, messages)| {
                        let first = match messages {
                            Value::Array(list) => list.first().map(message_text).unwrap_or_default(),
                            other => message_text(other),
                        };
                        (field.clone(), first)
                    })
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Inline HTML for the message list
    pub fn to_html(&self) -> String {
        match self {
            ValidationErrors::List(messages) => messages
                .iter()
                .map(|m| escape_html(m))
                .collect::<Vec<_>>()
                .join("; "),
            ValidationErrors::Fields(fields) => fields
                .iter()
                .map(|(field, message)| {
                    format!("<li>{} - {}</li>", escape_html(field), escape_html(message))
                })
                .collect(),
        }
    }

    /// Complete content for a validation slot
    pub fn to_notice(&self) -> String {
        format!("<small>Validation Error(s): {}</small>", self.to_html())
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
