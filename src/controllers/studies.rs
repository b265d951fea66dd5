//! Studies view
//!
//! Besides study CRUD this view is the second half of the patient
//! transfer: patients picked on the patients view are staged in the
//! [`Store`](crate::router::Store) and added here to the chosen study.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use super::{
    render, resolve_scope, selected_id, view_model, Controller, Next, Scope, View, ViewContext,
};
use crate::error::{PortalError, PortalResult};
use crate::model::{exclude_linked, into_list, nested_id, record_id, Paginated};
use crate::render::CRUD_BUTTON_PARTIAL;
use crate::router::{CrudMode, QueryParams, Route};

/// Checkbox class of the patient list
pub const PATIENT_CHECKBOX: &str = ".patient-checkbox";

pub(crate) const NO_PATIENTS_TO_ADD_MESSAGE: &str =
    "Please select one or more Patients to add to the Study.";

fn no_patients_to_remove_message(study_id: i64) -> String {
    format!(
        "Please select one or more Patients to remove from Study {}",
        study_id
    )
}

pub struct StudiesController;

#[async_trait]
impl Controller for StudiesController {
    async fn render(&self, cx: &mut ViewContext<'_>, params: &QueryParams) -> PortalResult<View> {
        let (organizations, organization_id) = match resolve_scope(cx, Route::Studies, params).await? {
            Scope::Redirect(view) => return Ok(view),
            Scope::Resolved {
                organizations,
                organization_id,
            } => (organizations, organization_id),
        };

        let studies: Paginated = cx
            .api
            .get("studies", Some(json!({ "organizationId": organization_id })))
            .await?;

        let mut record = Value::Null;
        let mut all_data_sources = Value::Null;
        let mut all_scopes = Value::Null;

        match params.crud_mode() {
            Some(CrudMode::Create) => {
                record = json!({
                    "organization": {
                        "id": organization_id,
                        "name": params.get("organizationName"),
                    }
                });
            }
            Some(mode) => {
                let id = selected_id(params)?;
                record = cx.api.get(&format!("studies/{}", id), None).await?;

                if mode == CrudMode::Read {
                    let data_sources: Value = cx
                        .api
                        .get(&format!("studies/{}/data_sources", id), None)
                        .await?;
                    let linked: HashSet<i64> =
                        data_sources.as_array().into_iter().flatten().filter_map(record_id).collect();
                    let candidates: Paginated = cx.api.get("data_sources", None).await?;
                    all_data_sources = Value::Array(exclude_linked(candidates.results, &linked));

                    let scopes_requested: Value = cx
                        .api
                        .get(&format!("studies/{}/scope_requests", id), None)
                        .await?;
                    let requested: HashSet<i64> = scopes_requested
                        .as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(|request| nested_id(request, "scopeCode"))
                        .collect();
                    let scopes: Value = cx.api.get("data_sources/all_scopes", None).await?;
                    all_scopes = Value::Array(exclude_linked(into_list(scopes), &requested));

                    if let Value::Object(fields) = &mut record {
                        fields.insert("dataSources".into(), data_sources);
                        fields.insert("scopesRequested".into(), scopes_requested);
                    }
                }
            }
            None => {}
        }

        cx.renderer.register_partial(CRUD_BUTTON_PARTIAL);

        let mut data = view_model(params);
        data.insert("studies".into(), Value::Array(studies.results));
        data.insert("studyRecord".into(), record);
        data.insert("allScopes".into(), all_scopes);
        data.insert("allDataSources".into(), all_data_sources);
        data.insert(
            "patientCount".into(),
            cx.store
                .pending_patients()
                .map(|ids| json!(ids.len()))
                .unwrap_or(Value::Null),
        );
        data.insert("organizationForStudiesSelect".into(), Value::Array(organizations));

        render(cx, Route::Studies.template(), data)
    }
}

/// Open the create form for a study owned by the given organization
pub(crate) fn create_from_organization(organization_id: i64, organization_name: &str) -> Next {
    Next::Navigate(
        Route::Studies,
        QueryParams::new()
            .with("create", true)
            .with("organizationId", organization_id)
            .with("organizationName", organization_name),
    )
}

pub(crate) async fn create(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    let organization: i64 = cx
        .form_text("studyOrganizationId")?
        .and_then(|id| id.trim().parse().ok())
        .ok_or_else(|| PortalError::MissingField("studyOrganizationId".to_string()))?;
    let record = json!({
        "name": cx.form_json("studyName")?,
        "description": cx.form_json("studyDescription")?,
        "organization": organization,
    });
    cx.api.send(Method::POST, "studies", Some(record)).await?;
    Ok(Next::ReturnFromCrud)
}

pub(crate) async fn update(cx: &mut ViewContext<'_>, id: i64) -> PortalResult<Next> {
    let record = json!({
        "name": cx.form_json("studyName")?,
        "description": cx.form_json("studyDescription")?,
    });
    cx.api
        .send(Method::PATCH, &format!("studies/{}", id), Some(record))
        .await?;
    Ok(Next::ReturnFromCrud)
}

pub(crate) async fn delete(cx: &mut ViewContext<'_>, id: i64) -> PortalResult<Next> {
    cx.api
        .send(Method::DELETE, &format!("studies/{}", id), None)
        .await?;
    Ok(Next::ReturnFromCrud)
}

/// Stage the checked patients and move to the study picker
pub(crate) fn select_patients(cx: &mut ViewContext<'_>, organization_id: i64) -> PortalResult<Next> {
    let ids = cx.checked_ids(PATIENT_CHECKBOX);
    if ids.is_empty() {
        cx.page.alert(NO_PATIENTS_TO_ADD_MESSAGE);
        return Err(PortalError::NothingSelected(NO_PATIENTS_TO_ADD_MESSAGE.to_string()));
    }

    tracing::debug!(count = ids.len(), "Staged patients for study");
    cx.store.stage_patients(ids);
    Ok(Next::Navigate(
        Route::Studies,
        QueryParams::new()
            .with("organizationId", organization_id)
            .with("addPatients", true),
    ))
}

/// Add the staged patients to `study_id`, then show that study's patients
pub(crate) async fn add_patients(
    cx: &mut ViewContext<'_>,
    study_id: i64,
    organization_id: i64,
) -> PortalResult<Next> {
    let Some(ids) = cx.store.pending_patients().map(<[i64]>::to_vec) else {
        cx.page.alert(NO_PATIENTS_TO_ADD_MESSAGE);
        return Err(PortalError::NothingSelected(NO_PATIENTS_TO_ADD_MESSAGE.to_string()));
    };

    cx.api
        .send(
            Method::POST,
            &format!("studies/{}/patients", study_id),
            Some(json!({ "patientIds": ids })),
        )
        .await?;
    cx.store.clear_patients();

    Ok(Next::Navigate(
        Route::Patients,
        QueryParams::new()
            .with("studyId", study_id)
            .with("organizationId", organization_id),
    ))
}

pub(crate) async fn remove_selected_patients(cx: &mut ViewContext<'_>, study_id: i64) -> PortalResult<Next> {
    let ids = cx.checked_ids(PATIENT_CHECKBOX);
    if ids.is_empty() {
        let message = no_patients_to_remove_message(study_id);
        cx.page.alert(&message);
        return Err(PortalError::NothingSelected(message));
    }
    remove_patients(cx, &ids, study_id).await
}

pub(crate) async fn remove_patients(
    cx: &mut ViewContext<'_>,
    patient_ids: &[i64],
    study_id: i64,
) -> PortalResult<Next> {
    if patient_ids.is_empty() || study_id == 0 {
        return Ok(Next::Stay);
    }
    cx.api
        .send(
            Method::DELETE,
            &format!("studies/{}/patients", study_id),
            Some(json!({ "patientIds": patient_ids })),
        )
        .await?;
    Ok(Next::Reload)
}

/// POST or DELETE a link on one of the study's sub-collections
async fn link(
    cx: &mut ViewContext<'_>,
    method: Method,
    study_id: i64,
    collection: &str,
    body: Value,
) -> PortalResult<Next> {
    cx.api
        .send(method, &format!("studies/{}/{}", study_id, collection), Some(body))
        .await?;
    Ok(Next::Reload)
}

pub(crate) async fn add_scope_request(
    cx: &mut ViewContext<'_>,
    scope_code_id: i64,
    study_id: i64,
) -> PortalResult<Next> {
    if scope_code_id == 0 || study_id == 0 {
        return Ok(Next::Stay);
    }
    link(cx, Method::POST, study_id, "scope_requests", json!({ "scopeCodeId": scope_code_id })).await
}

pub(crate) async fn remove_scope_request(
    cx: &mut ViewContext<'_>,
    scope_code_id: i64,
    study_id: i64,
) -> PortalResult<Next> {
    if scope_code_id == 0 || study_id == 0 {
        return Ok(Next::Stay);
    }
    link(cx, Method::DELETE, study_id, "scope_requests", json!({ "scopeCodeId": scope_code_id })).await
}

pub(crate) async fn add_data_source(
    cx: &mut ViewContext<'_>,
    data_source_id: i64,
    study_id: i64,
) -> PortalResult<Next> {
    if data_source_id == 0 || study_id == 0 {
        return Ok(Next::Stay);
    }
    link(cx, Method::POST, study_id, "data_sources", json!({ "dataSourceId": data_source_id })).await
}

pub(crate) async fn remove_data_source(
    cx: &mut ViewContext<'_>,
    data_source_id: i64,
    study_id: i64,
) -> PortalResult<Next> {
    if data_source_id == 0 || study_id == 0 {
        return Ok(Next::Stay);
    }
    link(cx, Method::DELETE, study_id, "data_sources", json!({ "dataSourceId": data_source_id })).await
}
