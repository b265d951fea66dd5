//! Locations and browser history
//!
//! A location is `/<route-prefix>/<routeKey>?<queryParams>`; the view for a
//! location is rebuilt from the URL alone.

use std::sync::{Mutex, MutexGuard};

use super::params::QueryParams;

/// Route key and parameters read from a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub route_key: String,
    pub params: QueryParams,
}

impl Location {
    /// Parse a path-and-query under `prefix`
    pub fn parse(url: &str, prefix: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let route_key = path
            .strip_prefix(prefix)
            .unwrap_or(path)
            .trim_end_matches('/')
            .to_string();
        Self {
            route_key,
            params: QueryParams::parse(query),
        }
    }

    /// Format a path-and-query under `prefix`
    pub fn format(route_key: &str, params: &QueryParams, prefix: &str) -> String {
        if params.is_empty() {
            format!("{}{}", prefix, route_key)
        } else {
            format!("{}{}?{}", prefix, route_key, params.encode())
        }
    }
}

/// Session history of the page
pub trait History: Send + Sync {
    /// Path and query of the current entry
    fn current(&self) -> String;

    /// Add an entry and make it current
    fn push(&self, url: &str);
}

#[derive(Debug)]
struct Entries {
    urls: Vec<String>,
    index: usize,
}

/// History kept in memory, with back/forward
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Mutex<Entries>,
}

impl MemoryHistory {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: Mutex::new(Entries {
                urls: vec![initial.to_string()],
                index: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of entries, including the initial one
    pub fn len(&self) -> usize {
        self.lock().urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().urls.is_empty()
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().urls.clone()
    }

    /// Step back one entry. Returns false at the start of history.
    pub fn back(&self) -> bool {
        let mut entries = self.lock();
        if entries.index == 0 {
            return false;
        }
        entries.index -= 1;
        true
    }

    /// Step forward one entry. Returns false at the end of history.
    pub fn forward(&self) -> bool {
        let mut entries = self.lock();
        if entries.index + 1 >= entries.urls.len() {
            return false;
        }
        entries.index += 1;
        true
    }
}

impl History for MemoryHistory {
    fn current(&self) -> String {
        let entries = self.lock();
        entries.urls.get(entries.index).cloned().unwrap_or_default()
    }

    fn push(&self, url: &str) {
        let mut entries = self.lock();
        let keep = entries.index + 1;
        entries.urls.truncate(keep);
        entries.urls.push(url.to_string());
        entries.index = keep;
    }
}
