//! View-model types and decoration helpers
//!
//! Records come from the API as loose JSON objects and are handed to the
//! template renderer after a few UI-only fields are added. Nothing here
//! outlives a single render.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::config::Choice;

/// Paginated list envelope returned by list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paginated {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub results: Vec<Value>,
}

/// The signed-in user's profile
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserProfile {
    /// Short label shown in the page header
    pub fn display_name(&self) -> String {
        let short: String = self.email.chars().take(12).collect();
        format!("{}...", short)
    }
}

/// One entry of a rendered `<select>`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Build select options from a choice list, marking `selected` and
/// leaving out any value listed in `exclude`.
pub fn select_options(choices: &[Choice], selected: Option<&str>, exclude: &[&str]) -> Vec<SelectOption> {
    choices
        .iter()
        .filter(|choice| !exclude.contains(&choice.value.as_str()))
        .map(|choice| SelectOption {
            value: choice.value.clone(),
            label: choice.label.clone(),
            selected: selected == Some(choice.value.as_str()),
        })
        .collect()
}

/// Numeric id of a record; accepts ids serialized as numbers or strings.
pub fn record_id(record: &Value) -> Option<i64> {
    as_id(record.get("id")?)
}

/// Interpret a JSON value as an integer id.
pub fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Id of a nested object, e.g. `scopeCode.id` on a scope request.
pub fn nested_id(record: &Value, field: &str) -> Option<i64> {
    record_id(record.get(field)?)
}

/// Set `selected` on every record whose id equals `selected_id`.
pub fn mark_selected(records: &mut [Value], selected_id: Option<i64>) {
    for record in records.iter_mut() {
        let selected = selected_id.is_some() && record_id(record) == selected_id;
        if let Value::Object(map) = record {
            map.insert("selected".to_string(), Value::Bool(selected));
        }
    }
}

/// Drop records whose id is already linked to the parent.
pub fn exclude_linked(records: Vec<Value>, linked: &HashSet<i64>) -> Vec<Value> {
    records
        .into_iter()
        .filter(|record| match record_id(record) {
            Some(id) => !linked.contains(&id),
            None => true,
        })
        .collect()
}

/// Read a JSON array, treating anything else as empty.
pub fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}
