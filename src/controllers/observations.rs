//! Observations view (read-only)

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{render, resolve_scope, view_model, Controller, Scope, View, ViewContext};
use crate::error::PortalResult;
use crate::model::{mark_selected, Paginated};
use crate::render::CRUD_BUTTON_PARTIAL;
use crate::router::{QueryParams, Route};

pub struct ObservationsController;

#[async_trait]
impl Controller for ObservationsController {
    async fn render(&self, cx: &mut ViewContext<'_>, params: &QueryParams) -> PortalResult<View> {
        let (organizations, organization_id) =
            match resolve_scope(cx, Route::Observations, params).await? {
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

        let mut filter = Map::new();
        filter.insert("organizationId".into(), json!(organization_id));
        if let Some(study_id) = params.get("studyId") {
            filter.insert("studyId".into(), json!(study_id));
        }
        let mut observations: Paginated = cx
            .api
            .get("observations", Some(Value::Object(filter)))
            .await?;
        for observation in observations.results.iter_mut() {
            pretty_attachment(observation)?;
        }

        cx.renderer.register_partial(CRUD_BUTTON_PARTIAL);

        let mut data = view_model(params);
        data.insert("observations".into(), Value::Array(observations.results));
        data.insert("observationRecord".into(), Value::Null);
        data.insert("organizationForObservationsSelect".into(), Value::Array(organizations));
        data.insert("studyForObservationsSelect".into(), Value::Array(studies.results));

        render(cx, Route::Observations.template(), data)
    }
}

/// Replace `valueAttachmentData` with its indented JSON text
fn pretty_attachment(observation: &mut Value) -> PortalResult<()> {
    if let Value::Object(fields) = observation {
        let data = fields.remove("valueAttachmentData").unwrap_or(Value::Null);
        let text = serde_json::to_string_pretty(&data)?;
        fields.insert("valueAttachmentData".into(), Value::String(text));
    }
    Ok(())
}
