//! Page surface
//!
//! Everything the portal does to the document goes through [`Page`]: swapping
//! the main content, opening the CRUD modal, showing banners and inline
//! validation, and reading form input back. [`HeadlessPage`] keeps the
//! document in memory and backs the CLI and the tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Text of the generic error banner
pub const ERROR_BANNER_MESSAGE: &str =
    "An error has occurred. Please click your browser Refresh button and try again.";

/// The document the portal renders into
pub trait Page: Send + Sync {
    /// Replace the current body (navigation + main content) with `html`
    fn replace_body(&self, html: &str);

    /// Open the CRUD modal belonging to `route_key`
    fn open_modal(&self, route_key: &str);

    /// Close the CRUD modal if it is open
    fn close_modal(&self);

    /// Whether the CRUD modal is currently shown
    fn modal_open(&self) -> bool;

    /// Show the generic error banner with a detail line
    fn show_error(&self, detail: &str);

    /// Show validation messages in every validation slot
    fn show_validation(&self, html: &str);

    /// Hide all validation slots
    fn clear_validation(&self);

    /// Show a blocking alert
    fn alert(&self, message: &str);

    /// Current value of the form field with the given id
    fn field_value(&self, id: &str) -> Option<String>;

    /// Set the value of a form field
    fn set_field_value(&self, id: &str, value: &str);

    /// Enable or disable a control
    fn set_enabled(&self, id: &str, enabled: bool);

    /// Values of all checked checkboxes matching `selector`
    fn checked_values(&self, selector: &str) -> Vec<String>;

    /// Show the signed-in user's name in the header
    fn set_profile_name(&self, name: &str);

    /// Leave the application for an external URL
    fn leave(&self, url: &str);
}

#[derive(Debug, Default)]
struct PageState {
    body: Option<String>,
    modal: Option<String>,
    error_banner: Option<String>,
    validation: Option<String>,
    alerts: Vec<String>,
    fields: HashMap<String, String>,
    disabled: HashMap<String, bool>,
    checked: HashMap<String, Vec<String>>,
    profile_name: Option<String>,
    left_for: Option<String>,
}

/// In-memory document
#[derive(Debug, Default)]
pub struct HeadlessPage {
    state: Mutex<PageState>,
}

impl HeadlessPage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fill in a form field, as a user typing into it would
    pub fn type_into(&self, id: &str, value: &str) {
        self.lock().fields.insert(id.to_string(), value.to_string());
    }

    /// Check the given checkbox values for `selector`
    pub fn check(&self, selector: &str, values: &[&str]) {
        self.lock().checked.insert(
            selector.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
    }

    pub fn body(&self) -> Option<String> {
        self.lock().body.clone()
    }

    pub fn modal(&self) -> Option<String> {
        self.lock().modal.clone()
    }

    pub fn error_banner(&self) -> Option<String> {
        self.lock().error_banner.clone()
    }

    pub fn validation(&self) -> Option<String> {
        self.lock().validation.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    pub fn profile_name(&self) -> Option<String> {
        self.lock().profile_name.clone()
    }

    pub fn left_for(&self) -> Option<String> {
        self.lock().left_for.clone()
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        !self.lock().disabled.get(id).copied().unwrap_or(false)
    }
}

impl Page for HeadlessPage {
    fn replace_body(&self, html: &str) {
        self.lock().body = Some(html.to_string());
    }

    fn open_modal(&self, route_key: &str) {
        self.lock().modal = Some(route_key.to_string());
    }

    fn close_modal(&self) {
        self.lock().modal = None;
    }

    fn modal_open(&self) -> bool {
        self.lock().modal.is_some()
    }

    fn show_error(&self, detail: &str) {
        self.lock().error_banner = Some(format!(
            "{}<br/><small>Detail: {}</small>",
            ERROR_BANNER_MESSAGE, detail
        ));
    }

    fn show_validation(&self, html: &str) {
        self.lock().validation = Some(html.to_string());
    }

    fn clear_validation(&self) {
        self.lock().validation = None;
    }

    fn alert(&self, message: &str) {
        tracing::warn!(message, "alert");
        self.lock().alerts.push(message.to_string());
    }

    fn field_value(&self, id: &str) -> Option<String> {
        self.lock().fields.get(id).cloned()
    }

    fn set_field_value(&self, id: &str, value: &str) {
        self.type_into(id, value);
    }

    fn set_enabled(&self, id: &str, enabled: bool) {
        self.lock().disabled.insert(id.to_string(), !enabled);
    }

    fn checked_values(&self, selector: &str) -> Vec<String> {
        self.lock().checked.get(selector).cloned().unwrap_or_default()
    }

    fn set_profile_name(&self, name: &str) {
        self.lock().profile_name = Some(name.to_string());
    }

    fn leave(&self, url: &str) {
        self.lock().left_for = Some(url.to_string());
    }
}
