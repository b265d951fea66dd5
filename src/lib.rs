//! # Portal
//!
//! Client for a healthcare-data portal: navigation, list views and CRUD
//! forms for organizations, patients, studies, observations and data
//! sources, all backed by a REST API.
//!
//! ## Modules
//!
//! - [`router`]: Locations, history and the [`Portal`] navigator
//! - [`controllers`]: One controller per route plus the mutation actions
//! - [`api`]: REST client with response classification
//! - [`session`]: Session manager seam and profile check
//! - [`page`] / [`render`]: The document and template seams
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use portal::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let page = Arc::new(HeadlessPage::new());
//!
//!     let mut portal = Portal::new(
//!         &config,
//!         Arc::new(ReqwestTransport::new()?),
//!         Arc::new(StaticSession::from_config(&config.session)),
//!         Arc::new(JsonRenderer::new()),
//!         page.clone(),
//!         Arc::new(MemoryHistory::new("/portal/patients")),
//!     );
//!
//!     // Redirects to the user's first organization
//!     portal.start().await?;
//!     println!("{}", page.body().unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod controllers;
pub mod error;
pub mod model;
pub mod page;
pub mod render;
pub mod router;
pub mod session;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiOutcome, HttpTransport, ReqwestTransport, TransportError, ValidationErrors};

pub use config::{generate_default_config, Config, ConfigError, LoggingConfig};

pub use controllers::{Action, Controller, Next, View};

pub use error::{Failure, PortalError, PortalResult};

pub use page::{HeadlessPage, Page};

pub use render::{JsonRenderer, TemplateRenderer};

pub use router::{
    AppState, CrudMode, History, Location, MemoryHistory, Portal, QueryParams, Route,
    RouteDescriptor, Store,
};

pub use session::{SessionManager, SessionUser, StaticSession};
