//! Patients view

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{
    render, resolve_scope, selected_id, view_model, Controller, Next, Scope, View, ViewContext,
};
use crate::error::PortalResult;
use crate::model::{mark_selected, Paginated};
use crate::render::CRUD_BUTTON_PARTIAL;
use crate::router::{CrudMode, QueryParams, Route};

pub struct PatientsController;

/// Consent status of one patient, split by study
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientConsents {
    #[serde(default)]
    studies_pending_consent: Value,
    #[serde(default)]
    studies: Value,
}

#[async_trait]
impl Controller for PatientsController {
    async fn render(&self, cx: &mut ViewContext<'_>, params: &QueryParams) -> PortalResult<View> {
        let (organizations, organization_id) = match resolve_scope(cx, Route::Patients, params).await? {
            Scope::Redirect(view) => return Ok(view),
            Scope::Resolved {
                organizations,
                organization_id,
            } => (organizations, organization_id),
        };

        let mut studies: Paginated = cx
            .api
            .get("studies", Some(json!({ "organizationId": organization_id })))
            .await?;
        mark_selected(&mut studies.results, params.get_id("studyId"));

        let mut patient_params = Map::new();
        patient_params.insert("organizationId".into(), json!(organization_id));
        if let Some(study_id) = params.get("studyId") {
            patient_params.insert("studyId".into(), json!(study_id));
        }
        let patients: Paginated = cx
            .api
            .get("patients", Some(Value::Object(patient_params)))
            .await?;

        let mut record = Value::Null;
        let mut consents = PatientConsents::default();
        if let Some(mode) = params.crud_mode().filter(|m| *m != CrudMode::Create) {
            let id = selected_id(params)?;
            record = cx.api.get(&format!("patients/{}", id), None).await?;

            if mode == CrudMode::Read {
                consents = cx.api.get(&format!("patients/{}/consents", id), None).await?;
            }
        }

        cx.renderer.register_partial(CRUD_BUTTON_PARTIAL);

        let mut data = view_model(params);
        data.insert("patients".into(), Value::Array(patients.results));
        data.insert("patientRecord".into(), record);
        data.insert("organizationForPatientsSelect".into(), Value::Array(organizations));
        data.insert("studyForPatientsSelect".into(), Value::Array(studies.results));
        data.insert("studiesPendingConsent".into(), consents.studies_pending_consent);
        data.insert("studiesConsented".into(), consents.studies);

        render(cx, Route::Patients.template(), data)
    }
}

/// Placeholder identifier for patients created without one
fn generated_identifier() -> String {
    let digits = Uuid::new_v4().as_u128().to_string();
    digits.chars().take(16).collect()
}

pub(crate) async fn create(cx: &mut ViewContext<'_>, organization_id: i64) -> PortalResult<Next> {
    let identifier = cx
        .form_text("patientIdentifier")?
        .unwrap_or_else(generated_identifier);
    let record = json!({
        "organizationId": organization_id,
        "identifier": identifier,
        "nameFamily": cx.form_json("patientFamilyName")?,
        "nameGiven": cx.form_json("patientGivenName")?,
        "birthDate": cx.form_json("patientBirthDate")?,
        "telecomEmail": cx.form_json("patientTelecomEmail")?,
        "telecomPhone": cx.form_json("patientTelecomPhone")?,
    });
    cx.api.send(Method::POST, "patients", Some(record)).await?;
    Ok(Next::ReturnFromCrud)
}

pub(crate) async fn update(cx: &mut ViewContext<'_>, id: i64) -> PortalResult<Next> {
    let record = json!({
        "identifier": cx.form_json("patientIdentifier")?,
        "nameFamily": cx.form_json("patientFamilyName")?,
        "nameGiven": cx.form_json("patientGivenName")?,
        "birthDate": cx.form_json("patientBirthDate")?,
        "telecomPhone": cx.form_json("patientTelecomPhone")?,
    });
    cx.api
        .send(Method::PATCH, &format!("patients/{}", id), Some(record))
        .await?;
    Ok(Next::ReturnFromCrud)
}

pub(crate) async fn delete(cx: &mut ViewContext<'_>, id: i64) -> PortalResult<Next> {
    cx.api
        .send(Method::DELETE, &format!("patients/{}", id), None)
        .await?;
    Ok(Next::ReturnFromCrud)
}

/// Fetch the patient's invitation link into the read modal
pub(crate) async fn invitation_link(cx: &mut ViewContext<'_>, id: i64) -> PortalResult<Next> {
    let response: Value = cx
        .api
        .get(&format!("patients/{}/invitation_link", id), None)
        .await?;
    let link = response
        .get("invitationLink")
        .and_then(Value::as_str)
        .unwrap_or_default();
    cx.page.set_field_value("invitationLink", link);
    cx.page.set_enabled("copyInvitationLink", true);
    Ok(Next::Stay)
}
