//! Query parameters
//!
//! The query string is both navigation state and the CRUD-mode switch.
//! Parameters are kept in a sorted map, so equality ignores order.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Modal mode selected by a query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudMode {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudMode {
    pub const ALL: [CrudMode; 4] = [
        CrudMode::Create,
        CrudMode::Read,
        CrudMode::Update,
        CrudMode::Delete,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CrudMode::Create => "create",
            CrudMode::Read => "read",
            CrudMode::Update => "update",
            CrudMode::Delete => "delete",
        }
    }
}

/// String-to-string parameters taken from, or written to, the URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Raw value; empty strings count as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Value parsed as an integer id
    pub fn get_id(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of these parameters
    pub fn merged(mut self, other: QueryParams) -> Self {
        self.0.extend(other.0);
        self
    }

    /// The CRUD mode requested, checked in create/read/update/delete order
    pub fn crud_mode(&self) -> Option<CrudMode> {
        CrudMode::ALL.into_iter().find(|mode| self.contains(mode.key()))
    }

    /// The same parameters with every CRUD-mode key removed
    pub fn without_crud(mut self) -> Self {
        for mode in CrudMode::ALL {
            self.0.remove(mode.key());
        }
        self
    }

    /// Parse a query string, with or without the leading '?'
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.0.insert(decode_component(key), decode_component(value));
        }
        params
    }

    /// Percent-encoded query string without the leading '?'
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parameters as a JSON object of strings
    pub fn to_json(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_encode_round_trip() {
        let params = QueryParams::new()
            .with("organizationId", 7)
            .with("organizationName", "Acme & Sons")
            .with("create", true);
        let parsed = QueryParams::parse(&params.encode());
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_parse_form_encoding() {
        let params = QueryParams::parse("?organizationName=Big+Clinic&flag");
        assert_eq!(params.get("organizationName"), Some("Big Clinic"));
        assert_eq!(params.get("flag"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: QueryParams = [("studyId", "44"), ("organizationId", "2")].into_iter().collect();
        let b: QueryParams = [("organizationId", "2"), ("studyId", "44")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_crud_mode() {
        assert_eq!(QueryParams::new().crud_mode(), None);
        let params = QueryParams::new().with("update", true).with("id", 3);
        assert_eq!(params.crud_mode(), Some(CrudMode::Update));

        let cleared = params.without_crud();
        assert_eq!(cleared.crud_mode(), None);
        assert_eq!(cleared.get_id("id"), Some(3));
    }

    #[test]
    fn test_empty_value_is_absent() {
        let params = QueryParams::parse("create=&read=true");
        assert_eq!(params.crud_mode(), Some(CrudMode::Read));
        assert!(!params.contains("create"));
    }

    #[test]
    fn test_merged_overrides() {
        let current = QueryParams::new().with("organizationId", 7).with("studyId", 1);
        let merged = current.merged(QueryParams::new().with("studyId", 2));
        assert_eq!(merged.get_id("organizationId"), Some(7));
        assert_eq!(merged.get_id("studyId"), Some(2));
    }

    #[test]
    fn test_get_id_rejects_garbage() {
        let params = QueryParams::new().with("id", "abc");
        assert_eq!(params.get_id("id"), None);
    }
}
