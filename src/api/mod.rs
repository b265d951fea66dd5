//! Portal REST API access
//!
//! Every resource operation maps to
//! `METHOD /api/v1/<resource>[/<id>][/<subresource>]` with a bearer token,
//! a JSON body for non-GET calls and a query string for GET calls.

pub mod client;
pub mod transport;
pub mod validation;

pub use client::{query_string, ApiClient, ApiOutcome, ApiResponse};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use validation::ValidationErrors;
