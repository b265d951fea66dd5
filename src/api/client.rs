//! Portal REST API client
//!
//! Every backend call goes through [`ApiClient::request`]. It attaches the
//! bearer credential, encodes parameters, and classifies the response.
//! Failures are surfaced to the page here and nowhere else; callers only
//! learn that the request did not complete.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use super::validation::ValidationErrors;
use crate::config::ApiConfig;
use crate::error::{Failure, PortalError, PortalResult};
use crate::page::Page;
use crate::session::{SessionManager, SessionUser};

/// Classified result of a single API call
#[derive(Debug)]
pub enum ApiOutcome<T> {
    /// 2xx response
    Success(T),
    /// 400 response, messages already shown next to the form
    ValidationError(ValidationErrors),
    /// 401 response, sign-in redirect already triggered
    AuthRequired,
    /// Anything else, banner already shown
    Failed(String),
}

impl<T> ApiOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    /// Convert into a result; every non-success becomes `Incomplete`.
    pub fn into_result(self) -> PortalResult<T> {
        match self {
            ApiOutcome::Success(value) => Ok(value),
            ApiOutcome::ValidationError(_) => Err(PortalError::Incomplete(Failure::Validation)),
            ApiOutcome::AuthRequired => Err(PortalError::Incomplete(Failure::AuthRequired)),
            ApiOutcome::Failed(_) => Err(PortalError::Incomplete(Failure::RequestFailed)),
        }
    }
}

/// A successful response body
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    body: String,
}

impl ApiResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.trim().is_empty() {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_str(&self.body)
        }
    }
}

/// Client for the portal REST API
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionManager>,
    page: Arc<dyn Page>,
    origin: String,
    endpoint: String,
}

impl ApiClient {
    pub fn new(
        config: &ApiConfig,
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionManager>,
        page: Arc<dyn Page>,
    ) -> Self {
        Self {
            transport,
            session,
            page,
            origin: config.base_url.trim_end_matches('/').to_string(),
            endpoint: config.endpoint(),
        }
    }

    pub fn session(&self) -> &dyn SessionManager {
        self.session.as_ref()
    }

    /// Absolute URL for `url`; site-relative paths resolve against the
    /// backend origin.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.origin, url.trim_start_matches('/'))
        }
    }

    /// Send a prebuilt request as is. The status is not classified; only a
    /// transport failure is surfaced.
    pub async fn exchange(&self, request: HttpRequest) -> PortalResult<HttpResponse> {
        let request_id = Uuid::new_v4();
        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            url = %request.url,
            "Raw request"
        );

        match self.transport.send(request).await {
            Ok(response) => {
                tracing::debug!(request_id = %request_id, status = response.status, "Raw response");
                Ok(response)
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Raw request failed");
                self.page.show_error(&e.to_string());
                Err(PortalError::Incomplete(Failure::RequestFailed))
            }
        }
    }

    /// URL prefix resource paths are appended to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the outbound request for `method resource_path`.
    pub fn build_request(
        &self,
        method: Method,
        resource_path: &str,
        params: Option<&Value>,
        user: Option<&SessionUser>,
    ) -> HttpRequest {
        let mut url = format!("{}{}", self.endpoint, resource_path.trim_start_matches('/'));
        let mut headers = vec![("Cache-Control".to_string(), "no-cache".to_string())];
        let mut body = None;

        if let Some(user) = user {
            headers.push((
                "Authorization".to_string(),
                format!("Bearer {}", user.access_token),
            ));
        }

        if let Some(params) = params {
            if method == Method::GET {
                let query = query_string(params);
                if !query.is_empty() {
                    url = format!("{}?{}", url, query);
                }
            } else {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                body = Some(params.to_string());
            }
        }

        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    /// Send one request and classify the response. Never retried.
    pub async fn request(
        &self,
        method: Method,
        resource_path: &str,
        params: Option<Value>,
    ) -> ApiOutcome<ApiResponse> {
        let request_id = Uuid::new_v4();
        let user = self.session.get_user().await;
        let request = self.build_request(method.clone(), resource_path, params.as_ref(), user.as_ref());

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = resource_path,
            params = ?params,
            "API request"
        );

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "API request failed");
                self.page.show_error(&e.to_string());
                return ApiOutcome::Failed(e.to_string());
            }
        };

        tracing::debug!(
            request_id = %request_id,
            status = response.status,
            status_text = %response.status_text,
            "API response"
        );

        self.classify(response).await
    }

    async fn classify(&self, response: HttpResponse) -> ApiOutcome<ApiResponse> {
        match response.status {
            401 => {
                self.session.signin_redirect().await;
                ApiOutcome::AuthRequired
            }
            400 => {
                let parsed = serde_json::from_str::<Value>(&response.body)
                    .ok()
                    .and_then(|body| ValidationErrors::from_body(&body));
                match parsed {
                    Some(errors) => {
                        tracing::warn!(errors = ?errors, "Validation error");
                        self.page.show_validation(&errors.to_notice());
                        ApiOutcome::ValidationError(errors)
                    }
                    None => {
                        tracing::warn!(body = %response.body, "Unreadable validation error body");
                        self.page.show_error(&response.status_text);
                        ApiOutcome::Failed(response.status_text)
                    }
                }
            }
            status if status > 299 => {
                tracing::warn!(status, status_text = %response.status_text, "API error response");
                self.page.show_error(&response.status_text);
                ApiOutcome::Failed(response.status_text)
            }
            status => ApiOutcome::Success(ApiResponse {
                status,
                body: response.body,
            }),
        }
    }

    /// Send a request and decode a successful body as `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        resource_path: &str,
        params: Option<Value>,
    ) -> ApiOutcome<T> {
        match self.request(method, resource_path, params).await {
            ApiOutcome::Success(response) => match response.json::<T>() {
                Ok(value) => ApiOutcome::Success(value),
                Err(e) => {
                    tracing::error!(path = resource_path, error = %e, "Undecodable API response");
                    self.page.show_error(&format!("Parse error: {}", e));
                    ApiOutcome::Failed(e.to_string())
                }
            },
            ApiOutcome::ValidationError(errors) => ApiOutcome::ValidationError(errors),
            ApiOutcome::AuthRequired => ApiOutcome::AuthRequired,
            ApiOutcome::Failed(detail) => ApiOutcome::Failed(detail),
        }
    }

    /// `GET` a resource and decode it
    pub async fn get<T: DeserializeOwned>(
        &self,
        resource_path: &str,
        params: Option<Value>,
    ) -> PortalResult<T> {
        self.request_json(Method::GET, resource_path, params)
            .await
            .into_result()
    }

    /// Send a mutation; only success matters to the caller
    pub async fn send(
        &self,
        method: Method,
        resource_path: &str,
        params: Option<Value>,
    ) -> PortalResult<ApiResponse> {
        self.request(method, resource_path, params).await.into_result()
    }
}

/// Flatten a JSON object into a percent-encoded query string.
///
/// Null members are skipped; arrays are joined with commas.
pub fn query_string(params: &Value) -> String {
    let Value::Object(map) = params else {
        return String::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                other => other.to_string(),
            };
            Some(format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&text)
            ))
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use serde_json::json;

    #[test]
    fn test_query_string() {
        assert_eq!(
            query_string(&json!({"organizationId": 7, "studyId": "4", "email": "a b@c.d"})),
            "email=a%20b%40c.d&organizationId=7&studyId=4"
        );
        assert_eq!(query_string(&json!({"x": null})), "");
        assert_eq!(query_string(&json!([1, 2])), "");
    }

    #[tokio::test]
    async fn test_get_params_in_query_string() {
        let h = Harness::new();
        h.transport.on("GET", "studies?organizationId=7", 200, json!({"results": []}));

        let outcome = h
            .api()
            .request(Method::GET, "studies", Some(json!({"organizationId": 7})))
            .await;
        assert!(outcome.is_success());

        let request = h.transport.last_request().unwrap();
        assert_eq!(request.url, "http://backend/api/v1/studies?organizationId=7");
        assert!(request.body.is_none());
        assert_eq!(request.header("Authorization"), Some("Bearer test-token"));
        assert_eq!(request.header("Cache-Control"), Some("no-cache"));
    }

    #[tokio::test]
    async fn test_mutation_params_in_json_body() {
        let h = Harness::new();
        h.transport.on("POST", "organizations", 201, json!({"id": 1}));

        let outcome = h
            .api()
            .request(
                Method::POST,
                "organizations",
                Some(json!({"name": "Acme", "type": "site", "partOf": 12})),
            )
            .await;
        assert!(outcome.is_success());

        let request = h.transport.last_request().unwrap();
        assert_eq!(request.url, "http://backend/api/v1/organizations");
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Acme", "type": "site", "partOf": 12}));
    }

    #[tokio::test]
    async fn test_no_bearer_without_session() {
        let h = Harness::signed_out();
        h.transport.on("GET", "organizations", 200, json!({"results": []}));

        let _ = h.api().request(Method::GET, "organizations", None).await;
        let request = h.transport.last_request().unwrap();
        assert_eq!(request.header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_unauthorized_redirects_silently() {
        let h = Harness::new();
        h.transport.on("GET", "users/profile", 401, json!({"detail": "expired"}));

        let outcome = h.api().request(Method::GET, "users/profile", None).await;
        assert!(matches!(outcome, ApiOutcome::AuthRequired));
        assert_eq!(h.session.signin_requests(), 1);
        assert!(h.page.error_banner().is_none());
        assert!(h.page.validation().is_none());
    }

    #[tokio::test]
    async fn test_validation_error_inline() {
        let h = Harness::new();
        h.transport.on("POST", "organizations", 400, json!({"name": ["Name is required"]}));

        let outcome = h
            .api()
            .request(Method::POST, "organizations", Some(json!({"name": null})))
            .await;
        assert!(matches!(outcome, ApiOutcome::ValidationError(_)));
        assert!(h.page.validation().unwrap().contains("name - Name is required"));
        assert!(h.page.error_banner().is_none());
    }

    #[tokio::test]
    async fn test_list_validation_error() {
        let h = Harness::new();
        h.transport.on("POST", "studies", 400, json!(["General error"]));

        let _ = h.api().request(Method::POST, "studies", Some(json!({}))).await;
        let notice = h.page.validation().unwrap();
        assert!(notice.contains("General error"));
        assert!(!notice.contains(" - "));
    }

    #[tokio::test]
    async fn test_server_error_banner() {
        let h = Harness::new();
        h.transport.on("DELETE", "patients/3", 500, json!({}));

        let result = h.api().send(Method::DELETE, "patients/3", None).await;
        assert!(matches!(
            result,
            Err(PortalError::Incomplete(Failure::RequestFailed))
        ));
        assert!(h
            .page
            .error_banner()
            .unwrap()
            .contains("Detail: Internal Server Error"));
    }

    #[tokio::test]
    async fn test_transport_error_banner() {
        let h = Harness::new();
        h.transport.fail_with("GET", "data_sources");

        let outcome = h.api().request(Method::GET, "data_sources", None).await;
        assert!(matches!(outcome, ApiOutcome::Failed(_)));
        assert!(h.page.error_banner().unwrap().contains("Backend unavailable"));
        assert_eq!(h.transport.requests().len(), 1);
    }

    #[test]
    fn test_resolve_url() {
        let h = Harness::new();
        let api = h.api();
        assert_eq!(api.resolve_url("/o/token/"), "http://backend/o/token/");
        assert_eq!(api.resolve_url("api/v1/consents"), "http://backend/api/v1/consents");
        assert_eq!(api.resolve_url("https://other.example/x"), "https://other.example/x");
    }

    #[tokio::test]
    async fn test_exchange_passes_status_through() {
        let h = Harness::new();
        h.transport.on("GET", "http://backend/o/status", 503, json!({"detail": "down"}));

        let response = h
            .api()
            .exchange(HttpRequest {
                method: Method::GET,
                url: "http://backend/o/status".into(),
                headers: Vec::new(),
                body: None,
            })
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert!(h.page.error_banner().is_none());
        assert_eq!(h.session.signin_requests(), 0);
    }

    #[tokio::test]
    async fn test_exchange_transport_failure() {
        let h = Harness::new();
        h.transport.fail_with("GET", "http://backend/o/status");

        let result = h
            .api()
            .exchange(HttpRequest {
                method: Method::GET,
                url: "http://backend/o/status".into(),
                headers: Vec::new(),
                body: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(PortalError::Incomplete(Failure::RequestFailed))
        ));
        assert!(h.page.error_banner().unwrap().contains("Backend unavailable"));
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let h = Harness::new();
        h.transport.on_text("GET", "users/organizations", 200, "<html>");

        let result = h.api().get::<Vec<Value>>("users/organizations", None).await;
        assert!(matches!(
            result,
            Err(PortalError::Incomplete(Failure::RequestFailed))
        ));
        assert!(h.page.error_banner().unwrap().contains("Parse error"));
    }

    #[test]
    fn test_outcome_into_result() {
        let ok: ApiOutcome<u8> = ApiOutcome::Success(1);
        assert_eq!(ok.into_result().unwrap(), 1);

        let auth: ApiOutcome<u8> = ApiOutcome::AuthRequired;
        assert!(matches!(
            auth.into_result(),
            Err(PortalError::Incomplete(Failure::AuthRequired))
        ));
    }
}
