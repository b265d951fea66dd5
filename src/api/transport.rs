//! HTTP transport
//!
//! The API client builds requests and classifies responses; a
//! [`HttpTransport`] only moves bytes. [`ReqwestTransport`] is the real one.

use async_trait::async_trait;
use reqwest::{Client, Method};
use thiserror::Error;

use crate::error::{PortalError, PortalResult};

/// An outbound request, fully built
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Value of the first header named `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as received, before classification
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

/// Transport-level failures
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(String),
}

/// Sends a request and returns whatever came back
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport. No timeout is set; the client's defaults apply.
    pub fn new() -> PortalResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| PortalError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Unavailable
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Router,
    };

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route(
                "/api/v1/echo",
                post(|headers: HeaderMap, body: String| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("none")
                        .to_string();
                    format!("{}|{}", auth, body)
                }),
            )
            .route(
                "/api/v1/missing",
                get(|| async { (StatusCode::NOT_FOUND, "gone") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_sends_headers_and_body() {
        let base = spawn_backend().await;
        let transport = ReqwestTransport::new().unwrap();

        let response = transport
            .send(HttpRequest {
                method: Method::POST,
                url: format!("{}/api/v1/echo", base),
                headers: vec![("Authorization".to_string(), "Bearer abc".to_string())],
                body: Some("{\"name\":\"Acme\"}".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "Bearer abc|{\"name\":\"Acme\"}");
    }

    #[tokio::test]
    async fn test_reports_status_text() {
        let base = spawn_backend().await;
        let transport = ReqwestTransport::new().unwrap();

        let response = transport
            .send(HttpRequest {
                method: Method::GET,
                url: format!("{}/api/v1/missing", base),
                headers: Vec::new(),
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new().unwrap();
        let result = transport
            .send(HttpRequest {
                method: Method::GET,
                url: format!("http://{}/api/v1/organizations", addr),
                headers: Vec::new(),
                body: None,
            })
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_header_lookup() {
        let request = HttpRequest {
            method: Method::GET,
            url: "http://x".to_string(),
            headers: vec![("Cache-Control".to_string(), "no-cache".to_string())],
            body: None,
        };
        assert_eq!(request.header("cache-control"), Some("no-cache"));
        assert_eq!(request.header("Authorization"), None);
    }
}
