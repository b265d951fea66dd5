//! Debug view
//!
//! Developer tools for exercising the backend as a patient would: trade an
//! OAuth code for a patient token, then call the profile, consent and
//! observation endpoints with it. Every tool writes the JSON it got back
//! into its output field and leaves the page where it is.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use super::{render, view_model, Controller, Next, View, ViewContext};
use crate::api::{HttpRequest, HttpResponse};
use crate::error::{PortalError, PortalResult};
use crate::router::{QueryParams, Route};

/// Placeholder in the debug form defaults, replaced by the site URL
pub const SITE_URL_PLACEHOLDER: &str = "SITE_URL";

/// Token endpoint of the authorization server, relative to the site
pub const TOKEN_PATH: &str = "/o/token/";

/// Fields whose defaults carry [`SITE_URL_PLACEHOLDER`]
const SITE_URL_FIELDS: [&str; 2] = ["debugOAuthPayload", "debugPatientConsentsUrl"];

pub struct DebugController;

#[async_trait]
impl Controller for DebugController {
    async fn render(&self, cx: &mut ViewContext<'_>, params: &QueryParams) -> PortalResult<View> {
        for id in SITE_URL_FIELDS {
            if let Some(value) = cx.page.field_value(id) {
                cx.page.set_field_value(id, &with_site_url(cx, &value));
            }
        }

        let mut data = view_model(params);
        data.insert("siteUrl".into(), json!(cx.constants.site_url));
        data.insert("patientToken".into(), json!(cx.store.patient_token()));
        render(cx, Route::Debug.template(), data)
    }
}

fn with_site_url(cx: &ViewContext<'_>, value: &str) -> String {
    value.replace(SITE_URL_PLACEHOLDER, &cx.constants.site_url)
}

/// Form value with the site URL filled in
fn site_field(cx: &ViewContext<'_>, id: &str) -> PortalResult<String> {
    let value = cx.form_text(id)?.unwrap_or_default();
    Ok(with_site_url(cx, &value))
}

/// Alert the user about unusable input and stop
fn invalid(cx: &ViewContext<'_>, message: String) -> PortalError {
    cx.page.alert(&message);
    PortalError::InvalidInput(message)
}

/// Response body as shown in an output field: pretty JSON, or the raw text
/// when the body is not JSON
fn pretty_body(response: &HttpResponse) -> String {
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| serde_json::to_string_pretty(&body).ok())
        .unwrap_or_else(|| response.body.clone())
}

fn debug_request(method: Method, url: String, token: Option<&str>) -> HttpRequest {
    let mut headers = vec![("Cache-Control".to_string(), "no-cache".to_string())];
    if let Some(token) = token {
        headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
    }
    HttpRequest {
        method,
        url,
        headers,
        body: None,
    }
}

fn session_output(text: &str) -> String {
    format!("userManager: {}", text)
}

pub(crate) async fn get_user(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    let user = cx.api.session().get_user().await;
    let text = serde_json::to_string_pretty(&user)
        .map_err(|e| PortalError::Serialization(e.to_string()))?;
    cx.page.set_field_value("debugAuthOut", &session_output(&text));
    Ok(Next::Stay)
}

pub(crate) async fn remove_user(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    cx.api.session().remove_user().await;
    cx.page.set_field_value("debugAuthOut", &session_output("user removed"));
    Ok(Next::Stay)
}

pub(crate) async fn redirect_signin(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    cx.api.session().signin_redirect().await;
    cx.page.set_field_value("debugAuthOut", &session_output("sign-in requested"));
    Ok(Next::Stay)
}

/// Exchange the OAuth payload (a JSON object) for a patient token
pub(crate) async fn get_patient_token(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    let payload = site_field(cx, "debugOAuthPayload")?;
    let fields = match serde_json::from_str::<Value>(&payload) {
        Ok(Value::Object(fields)) => fields,
        _ => return Err(invalid(cx, "OAuth payload must be a JSON object".to_string())),
    };
    let form = fields
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(&text))
        })
        .collect::<Vec<_>>()
        .join("&");

    let mut request = debug_request(Method::POST, cx.api.resolve_url(TOKEN_PATH), None);
    request.headers.push((
        "Content-Type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    ));
    request.body = Some(form);

    let response = cx.api.exchange(request).await?;
    let token = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|tokens| tokens.get("access_token").and_then(Value::as_str).map(String::from));
    tracing::info!(obtained = token.is_some(), "Patient token exchange");

    cx.page.set_field_value(
        "debugPatientToken",
        &format!("Client Token: {}", token.as_deref().unwrap_or("None")),
    );
    cx.store.set_patient_token(token);
    cx.page.set_field_value("debugPatientTokenOut", &pretty_body(&response));
    Ok(Next::Stay)
}

/// Profile of whoever the patient token belongs to
pub(crate) async fn get_user_profile(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    let url = format!("{}users/profile", cx.api.endpoint());
    let request = debug_request(Method::GET, url, cx.store.patient_token());
    let response = cx.api.exchange(request).await?;
    cx.page.set_field_value("debugUserProfileOut", &pretty_body(&response));
    Ok(Next::Stay)
}

pub(crate) async fn get_pending_patient_consents(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    let url = cx.api.resolve_url(&site_field(cx, "debugPendingPatientConsentsUrl")?);
    let request = debug_request(Method::GET, url, cx.store.patient_token());
    let response = cx.api.exchange(request).await?;
    cx.page.set_field_value("debugPendingPatientConsentsOut", &pretty_body(&response));
    Ok(Next::Stay)
}

pub(crate) async fn patient_consents(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    let token = cx.store.patient_token().map(String::from);
    free_form(cx, "debugPatientConsents", token.as_deref()).await
}

pub(crate) async fn observations(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    free_form(cx, "debugObservations", None).await
}

/// Send the request described by the `<prefix>Method`, `<prefix>Url` and
/// `<prefix>Payload` fields and show the answer in `<prefix>Out`. The
/// payload is sent as JSON for every method but GET.
async fn free_form(cx: &mut ViewContext<'_>, prefix: &str, token: Option<&str>) -> PortalResult<Next> {
    let method_name = cx.form_text(&format!("{}Method", prefix))?.unwrap_or_default();
    let method = match Method::from_bytes(method_name.trim().to_uppercase().as_bytes()) {
        Ok(method) => method,
        Err(_) => return Err(invalid(cx, format!("Unknown HTTP method '{}'", method_name))),
    };
    let url = cx.api.resolve_url(&site_field(cx, &format!("{}Url", prefix))?);

    let mut request = debug_request(method.clone(), url, token);
    if method != Method::GET {
        request
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        request.body = cx.form_text(&format!("{}Payload", prefix))?;
    }

    let response = cx.api.exchange(request).await?;
    cx.page.set_field_value(&format!("{}Out", prefix), &pretty_body(&response));
    Ok(Next::Stay)
}
