//! Template rendering
//!
//! Views hand a template name and a JSON view-model to a
//! [`TemplateRenderer`] and get an HTML fragment back. The real templates
//! live with the page; [`JsonRenderer`] is a stand-in that dumps the
//! view-model so headless runs stay readable.

use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::error::{PortalError, PortalResult};

/// Template holding the navigation and the main content slot
pub const BODY_TEMPLATE: &str = "body";

/// Partial rendering one organization and its children
pub const ORGANIZATION_TREE_PARTIAL: &str = "recursiveOrganizationTree";

/// Partial rendering the create/read/update/delete buttons of a row
pub const CRUD_BUTTON_PARTIAL: &str = "crudButton";

/// Compiles named templates against view-models
pub trait TemplateRenderer: Send + Sync {
    /// Render `template` with `data` into an HTML fragment
    fn render(&self, template: &str, data: &Value) -> PortalResult<String>;

    /// Make the template `name` available as a partial to other templates
    fn register_partial(&self, name: &str);
}

/// Renders every template as a dump of its view-model
#[derive(Debug, Default)]
pub struct JsonRenderer {
    partials: Mutex<BTreeSet<String>>,
}

impl JsonRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all registered partials
    pub fn partials(&self) -> Vec<String> {
        self.partials
            .lock()
            .map(|p| p.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn render_body(data: &Value) -> String {
        let mut html = String::from("<nav><ul>");
        if let Some(items) = data.get("navItems").and_then(Value::as_array) {
            for item in items {
                let key = item.get("key").and_then(Value::as_str).unwrap_or_default();
                let label = item.get("label").and_then(Value::as_str).unwrap_or_default();
                let active = item.get("active").and_then(Value::as_bool).unwrap_or(false);
                html.push_str(&format!(
                    "<li class=\"nav-item{}\" data-route=\"{}\">{}</li>",
                    if active { " active" } else { "" },
                    escape_html(key),
                    escape_html(label)
                ));
            }
        }
        html.push_str("</ul></nav>");
        html.push_str(&format!(
            "<main id=\"mainContent\">{}</main>",
            data.get("mainContent").and_then(Value::as_str).unwrap_or_default()
        ));
        html
    }
}

impl TemplateRenderer for JsonRenderer {
    fn render(&self, template: &str, data: &Value) -> PortalResult<String> {
        if template == BODY_TEMPLATE {
            return Ok(Self::render_body(data));
        }
        let pretty = serde_json::to_string_pretty(data).map_err(|e| PortalError::Template {
            name: template.to_string(),
            message: e.to_string(),
        })?;
        Ok(format!(
            "<section data-template=\"{}\"><pre>{}</pre></section>",
            escape_html(template),
            escape_html(&pretty)
        ))
    }

    fn register_partial(&self, name: &str) {
        if let Ok(mut partials) = self.partials.lock() {
            partials.insert(name.to_string());
        }
    }
}

/// Escape text for inclusion in HTML content or quoted attribute values
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}
