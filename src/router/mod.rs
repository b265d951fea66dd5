//! Client-side routing
//!
//! Maps locations to routes, runs the matching controller, swaps the
//! rendered content into the page, and keeps browser history in step so
//! back/forward rebuilds the same view from the URL alone.

pub mod history;
pub mod params;
pub mod portal;
pub mod route;
pub mod state;

pub use history::{History, Location, MemoryHistory};
pub use params::{CrudMode, QueryParams};
pub use portal::Portal;
pub use route::{mark_active, registry, Route, RouteDescriptor};
pub use state::{AppState, Store};
