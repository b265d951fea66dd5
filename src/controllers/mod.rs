//! Resource controllers
//!
//! One controller per route. Rendering follows the same steps everywhere:
//! resolve the scoping organization, fetch the list, fetch the selected
//! record for CRUD modes, decorate, render. Requests are issued one after
//! another in the order written.
//!
//! Mutations are described by [`Action`] and run by [`perform`], which
//! reports where the portal should go next.

pub mod data_sources;
pub mod debug;
pub mod observations;
pub mod organizations;
pub mod patients;
pub mod studies;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::ApiClient;
use crate::config::PortalConstants;
use crate::error::{PortalError, PortalResult};
use crate::model::{mark_selected, record_id};
use crate::page::Page;
use crate::render::TemplateRenderer;
use crate::router::{QueryParams, Route, Store};

/// Alert shown when the user belongs to no organization
pub const NO_ORGANIZATION_MESSAGE: &str = "This user does not belong to any Organization.";

/// What a controller needs while rendering or mutating
pub struct ViewContext<'a> {
    pub api: &'a ApiClient,
    pub renderer: &'a dyn TemplateRenderer,
    pub page: &'a dyn Page,
    pub constants: &'a PortalConstants,
    pub store: &'a mut Store,
}

impl ViewContext<'_> {
    /// Form value as typed; empty input reads as `None`
    pub fn form_text(&self, id: &str) -> PortalResult<Option<String>> {
        let value = self
            .page
            .field_value(id)
            .ok_or_else(|| PortalError::MissingField(id.to_string()))?;
        Ok((!value.is_empty()).then_some(value))
    }

    /// Form value as JSON, `null` when empty
    pub fn form_json(&self, id: &str) -> PortalResult<Value> {
        Ok(self.form_text(id)?.map(Value::String).unwrap_or(Value::Null))
    }

    /// Ids of every checked checkbox matching `selector`
    pub fn checked_ids(&self, selector: &str) -> Vec<i64> {
        self.page
            .checked_values(selector)
            .iter()
            .filter_map(|v| v.trim().parse().ok())
            .collect()
    }
}

/// Result of rendering a route
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// Main-content HTML
    Fragment(String),
    /// The location is not canonical; navigate here instead
    Redirect(Route, QueryParams),
}

/// Where to go after a mutation succeeded
#[derive(Debug, Clone, PartialEq)]
pub enum Next {
    /// Leave the page as it is
    Stay,
    /// Re-render the current location
    Reload,
    /// Close the modal and re-render without CRUD-mode parameters
    ReturnFromCrud,
    /// Go to another view
    Navigate(Route, QueryParams),
}

/// Common rendering interface of every controller
#[async_trait]
pub trait Controller: Send + Sync {
    async fn render(&self, cx: &mut ViewContext<'_>, params: &QueryParams) -> PortalResult<View>;
}

/// Every mutation the portal offers
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateOrganization { part_of: i64 },
    UpdateOrganization { id: i64 },
    DeleteOrganization { id: i64 },
    AddUserToOrganization { email: String, organization_id: i64 },
    RemoveUserFromOrganization { user_id: i64, organization_id: i64 },

    CreatePatient { organization_id: i64 },
    UpdatePatient { id: i64 },
    DeletePatient { id: i64 },
    GetInvitationLink { id: i64 },

    CreateStudyFromOrganization { organization_id: i64, organization_name: String },
    CreateStudy,
    UpdateStudy { id: i64 },
    DeleteStudy { id: i64 },
    SelectPatientsForStudy { organization_id: i64 },
    AddPatientsToStudy { study_id: i64, organization_id: i64 },
    RemoveSelectedPatientsFromStudy { study_id: i64 },
    RemovePatientsFromStudy { patient_ids: Vec<i64>, study_id: i64 },
    AddScopeRequestToStudy { scope_code_id: i64, study_id: i64 },
    RemoveScopeRequestFromStudy { scope_code_id: i64, study_id: i64 },
    AddDataSourceToStudy { data_source_id: i64, study_id: i64 },
    RemoveDataSourceFromStudy { data_source_id: i64, study_id: i64 },

    CreateDataSource,
    DeleteDataSource { id: i64 },
    AddScopeToDataSource { scope_code_id: i64, data_source_id: i64 },
    RemoveScopeFromDataSource { scope_code_id: i64, data_source_id: i64 },

    DebugGetUser,
    DebugRemoveUser,
    DebugRedirectSignin,
    DebugGetPatientToken,
    DebugGetUserProfile,
    DebugGetPendingPatientConsents,
    DebugPatientConsents,
    DebugObservations,
}

/// Run a mutation and report where to go next
pub async fn perform(cx: &mut ViewContext<'_>, action: Action) -> PortalResult<Next> {
    tracing::info!(action = ?action, "Performing action");
    match action {
        Action::CreateOrganization { part_of } => organizations::create(cx, part_of).await,
        Action::UpdateOrganization { id } => organizations::update(cx, id).await,
        Action::DeleteOrganization { id } => organizations::delete(cx, id).await,
        Action::AddUserToOrganization {
            email,
            organization_id,
        } => organizations::add_user(cx, &email, organization_id).await,
        Action::RemoveUserFromOrganization {
            user_id,
            organization_id,
        } => organizations::remove_user(cx, user_id, organization_id).await,

        Action::CreatePatient { organization_id } => patients::create(cx, organization_id).await,
        Action::UpdatePatient { id } => patients::update(cx, id).await,
        Action::DeletePatient { id } => patients::delete(cx, id).await,
        Action::GetInvitationLink { id } => patients::invitation_link(cx, id).await,

        Action::CreateStudyFromOrganization {
            organization_id,
            organization_name,
        } => Ok(studies::create_from_organization(
            organization_id,
            &organization_name,
        )),
        Action::CreateStudy => studies::create(cx).await,
        Action::UpdateStudy { id } => studies::update(cx, id).await,
        Action::DeleteStudy { id } => studies::delete(cx, id).await,
        Action::SelectPatientsForStudy { organization_id } => {
            studies::select_patients(cx, organization_id)
        }
        Action::AddPatientsToStudy {
            study_id,
            organization_id,
        } => studies::add_patients(cx, study_id, organization_id).await,
        Action::RemoveSelectedPatientsFromStudy { study_id } => {
            studies::remove_selected_patients(cx, study_id).await
        }
        Action::RemovePatientsFromStudy {
            patient_ids,
            study_id,
        } => studies::remove_patients(cx, &patient_ids, study_id).await,
        Action::AddScopeRequestToStudy {
            scope_code_id,
            study_id,
        } => studies::add_scope_request(cx, scope_code_id, study_id).await,
        Action::RemoveScopeRequestFromStudy {
            scope_code_id,
            study_id,
        } => studies::remove_scope_request(cx, scope_code_id, study_id).await,
        Action::AddDataSourceToStudy {
            data_source_id,
            study_id,
        } => studies::add_data_source(cx, data_source_id, study_id).await,
        Action::RemoveDataSourceFromStudy {
            data_source_id,
            study_id,
        } => studies::remove_data_source(cx, data_source_id, study_id).await,

        Action::CreateDataSource => data_sources::create(cx).await,
        Action::DeleteDataSource { id } => data_sources::delete(cx, id).await,
        Action::AddScopeToDataSource {
            scope_code_id,
            data_source_id,
        } => data_sources::add_scope(cx, scope_code_id, data_source_id).await,
        Action::RemoveScopeFromDataSource {
            scope_code_id,
            data_source_id,
        } => data_sources::remove_scope(cx, scope_code_id, data_source_id).await,

        Action::DebugGetUser => debug::get_user(cx).await,
        Action::DebugRemoveUser => debug::remove_user(cx).await,
        Action::DebugRedirectSignin => debug::redirect_signin(cx).await,
        Action::DebugGetPatientToken => debug::get_patient_token(cx).await,
        Action::DebugGetUserProfile => debug::get_user_profile(cx).await,
        Action::DebugGetPendingPatientConsents => debug::get_pending_patient_consents(cx).await,
        Action::DebugPatientConsents => debug::patient_consents(cx).await,
        Action::DebugObservations => debug::observations(cx).await,
    }
}

/// Organizations the current user belongs to, with the one named by
/// `organizationId` marked selected.
pub(crate) enum Scope {
    Resolved {
        organizations: Vec<Value>,
        organization_id: i64,
    },
    Redirect(View),
}

/// Resolve the scoping organization of an organization-scoped view.
///
/// Without `organizationId` the view redirects to the user's first
/// organization; a user with no organization gets an alert and no view.
pub(crate) async fn resolve_scope(
    cx: &mut ViewContext<'_>,
    route: Route,
    params: &QueryParams,
) -> PortalResult<Scope> {
    let mut organizations: Vec<Value> = cx.api.get("users/organizations", None).await?;

    let Some(first_id) = organizations.first().and_then(record_id) else {
        cx.page.alert(NO_ORGANIZATION_MESSAGE);
        return Err(PortalError::ScopeMissing(NO_ORGANIZATION_MESSAGE.to_string()));
    };

    match params.get_id("organizationId") {
        None => Ok(Scope::Redirect(View::Redirect(
            route,
            QueryParams::new().with("organizationId", first_id),
        ))),
        Some(organization_id) => {
            mark_selected(&mut organizations, Some(organization_id));
            Ok(Scope::Resolved {
                organizations,
                organization_id,
            })
        }
    }
}

/// The `id` parameter of a read/update/delete location
pub(crate) fn selected_id(params: &QueryParams) -> PortalResult<i64> {
    params
        .get_id("id")
        .ok_or_else(|| PortalError::MissingParameter("id".to_string()))
}

/// Start a view-model from the query parameters
pub(crate) fn view_model(params: &QueryParams) -> Map<String, Value> {
    params.to_json()
}

/// Render `template` with the assembled view-model
pub(crate) fn render(cx: &ViewContext<'_>, template: &str, data: Map<String, Value>) -> PortalResult<View> {
    cx.renderer
        .render(template, &Value::Object(data))
        .map(View::Fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use serde_json::json;

    #[tokio::test]
    async fn test_scope_redirects_to_first_organization() {
        let h = Harness::new();
        h.transport.on("GET", "users/organizations", 200, json!([{"id": 7}, {"id": 9}]));

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let scope = resolve_scope(&mut cx, Route::Patients, &QueryParams::new()).await.unwrap();

        match scope {
            Scope::Redirect(View::Redirect(route, params)) => {
                assert_eq!(route, Route::Patients);
                assert_eq!(params, QueryParams::new().with("organizationId", 7));
            }
            _ => panic!("expected redirect"),
        }
    }

    #[tokio::test]
    async fn test_scope_missing_alerts() {
        let h = Harness::new();
        h.transport.on("GET", "users/organizations", 200, json!([]));

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let result = resolve_scope(&mut cx, Route::Studies, &QueryParams::new()).await;

        assert!(matches!(result, Err(PortalError::ScopeMissing(_))));
        assert_eq!(h.page.alerts(), vec![NO_ORGANIZATION_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_scope_marks_selected() {
        let h = Harness::new();
        h.transport.on("GET", "users/organizations", 200, json!([{"id": 7}, {"id": 9}]));

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let params = QueryParams::new().with("organizationId", 9);
        let Scope::Resolved { organizations, organization_id } =
            resolve_scope(&mut cx, Route::Observations, &params).await.unwrap()
        else {
            panic!("expected resolved scope");
        };

        assert_eq!(organization_id, 9);
        assert_eq!(organizations[0]["selected"], json!(false));
        assert_eq!(organizations[1]["selected"], json!(true));
    }

    #[test]
    fn test_form_helpers() {
        let h = Harness::new();
        h.page.type_into("studyName", "");
        h.page.type_into("studyDescription", " Sleep ");
        h.page.type_into("studyOrganizationId", "  ");
        h.page.check(".patient-checkbox", &["3", "x", "5"]);

        let api = h.api();
        let mut store = Store::default();
        let cx = h.context(&api, &mut store);
        assert_eq!(cx.form_text("studyName").unwrap(), None);
        assert_eq!(cx.form_json("studyDescription").unwrap(), json!(" Sleep "));
        assert_eq!(cx.form_json("studyOrganizationId").unwrap(), json!("  "));
        assert!(matches!(cx.form_text("nope"), Err(PortalError::MissingField(_))));
        assert_eq!(cx.checked_ids(".patient-checkbox"), vec![3, 5]);
    }
}
