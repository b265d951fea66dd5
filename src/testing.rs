//! Test doubles shared by the unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::api::{ApiClient, HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::config::Config;
use crate::controllers::ViewContext;
use crate::error::PortalResult;
use crate::page::HeadlessPage;
use crate::render::{JsonRenderer, TemplateRenderer};
use crate::router::{MemoryHistory, Portal, Store};
use crate::session::{SessionUser, StaticSession};

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_SUBJECT: &str = "10001";

#[derive(Debug, Clone)]
enum Scripted {
    Respond { status: u16, body: String },
    Fail,
}

/// Transport answering from a table of `(method, path)` responses.
/// Unscripted requests get a 404.
pub struct ScriptedTransport {
    endpoint: String,
    responses: Mutex<HashMap<(String, String), Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer `method path` (path relative to the API endpoint, with any
    /// query string) with `status` and a JSON body
    pub fn on(&self, method: &str, path: &str, status: u16, body: Value) {
        self.on_text(method, path, status, &body.to_string());
    }

    pub fn on_text(&self, method: &str, path: &str, status: u16, body: &str) {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            Scripted::Respond {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Fail `method path` at the transport level
    pub fn fail_with(&self, method: &str, path: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), Scripted::Fail);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn relative<'a>(&self, url: &'a str) -> &'a str {
        url.strip_prefix(self.endpoint.as_str()).unwrap_or(url)
    }

    /// Every request so far as `"METHOD path"`
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, self.relative(&r.url)))
            .collect()
    }

    /// JSON body of the last `method path` request
    pub fn body_of(&self, method: &str, path: &str) -> Option<Value> {
        self.requests()
            .iter()
            .rev()
            .find(|r| r.method.as_str() == method && self.relative(&r.url) == path)
            .and_then(|r| r.body.as_deref().map(|b| serde_json::from_str(b).unwrap()))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = (
            request.method.as_str().to_string(),
            self.relative(&request.url).to_string(),
        );
        self.requests.lock().unwrap().push(request);

        let scripted = self.responses.lock().unwrap().get(&key).cloned();
        match scripted {
            Some(Scripted::Fail) => Err(TransportError::Unavailable),
            Some(Scripted::Respond { status, body }) => Ok(HttpResponse {
                status,
                status_text: reason(status),
                body,
            }),
            None => Ok(HttpResponse {
                status: 404,
                status_text: reason(404),
                body: "{}".to_string(),
            }),
        }
    }
}

fn reason(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string()
}

/// Renderer that remembers every view-model it was given
#[derive(Default)]
pub struct RecordingRenderer {
    inner: JsonRenderer,
    rendered: Mutex<Vec<(String, Value)>>,
}

impl TemplateRenderer for RecordingRenderer {
    fn render(&self, template: &str, data: &Value) -> PortalResult<String> {
        self.rendered
            .lock()
            .unwrap()
            .push((template.to_string(), data.clone()));
        self.inner.render(template, data)
    }

    fn register_partial(&self, name: &str) {
        self.inner.register_partial(name);
    }
}

/// Every collaborator of the portal, in memory
pub struct Harness {
    pub config: Config,
    pub transport: Arc<ScriptedTransport>,
    pub session: Arc<StaticSession>,
    pub page: Arc<HeadlessPage>,
    pub history: Arc<MemoryHistory>,
    pub renderer: Arc<RecordingRenderer>,
}

impl Harness {
    /// Signed in, at `/portal/organizations`
    pub fn new() -> Self {
        Self::at("/portal/organizations")
    }

    pub fn at(url: &str) -> Self {
        Self::build(
            url,
            Some(SessionUser {
                access_token: TEST_TOKEN.to_string(),
                subject: TEST_SUBJECT.to_string(),
            }),
        )
    }

    pub fn signed_out() -> Self {
        Self::build("/portal/organizations", None)
    }

    fn build(url: &str, user: Option<SessionUser>) -> Self {
        let mut config = Config::default();
        config.api.base_url = "http://backend".to_string();

        let transport = Arc::new(ScriptedTransport::new(&config.api.endpoint()));
        transport.on(
            "GET",
            "users/profile",
            200,
            json!({"id": 10001, "email": "doctor@example.org", "firstName": "Ada", "lastName": "Lee"}),
        );

        Self {
            config,
            transport,
            session: Arc::new(StaticSession::new(user)),
            page: Arc::new(HeadlessPage::new()),
            history: Arc::new(MemoryHistory::new(url)),
            renderer: Arc::new(RecordingRenderer::default()),
        }
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(
            &self.config.api,
            self.transport.clone(),
            self.session.clone(),
            self.page.clone(),
        )
    }

    pub fn context<'a>(&'a self, api: &'a ApiClient, store: &'a mut Store) -> ViewContext<'a> {
        ViewContext {
            api,
            renderer: self.renderer.as_ref(),
            page: self.page.as_ref(),
            constants: &self.config.constants,
            store,
        }
    }

    pub fn portal(&self) -> Portal {
        Portal::new(
            &self.config,
            self.transport.clone(),
            self.session.clone(),
            self.renderer.clone(),
            self.page.clone(),
            self.history.clone(),
        )
    }

    /// View-model of the last render of `template`
    pub fn rendered(&self, template: &str) -> Value {
        self.renderer
            .rendered
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(name, _)| name == template)
            .map(|(_, data)| data.clone())
            .unwrap_or_else(|| panic!("template '{}' was never rendered", template))
    }

    /// Names of every template rendered so far, in order
    pub fn rendered_templates(&self) -> Vec<String> {
        self.renderer
            .rendered
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn renderer_partials(&self) -> Vec<String> {
        self.renderer.inner.partials()
    }
}
