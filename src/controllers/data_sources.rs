//! Data sources view

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};

use super::{render, selected_id, view_model, Controller, Next, View, ViewContext};
use crate::error::{PortalError, PortalResult};
use crate::model::{exclude_linked, into_list, nested_id, select_options, Paginated};
use crate::render::CRUD_BUTTON_PARTIAL;
use crate::router::{CrudMode, QueryParams, Route};

pub struct DataSourcesController;

#[async_trait]
impl Controller for DataSourcesController {
    async fn render(&self, cx: &mut ViewContext<'_>, params: &QueryParams) -> PortalResult<View> {
        let data_sources: Paginated = cx.api.get("data_sources", None).await?;

        let mode = params.crud_mode();
        let mut record = Map::new();
        let mut all_scopes = Value::Null;

        if let Some(mode) = mode.filter(|m| *m != CrudMode::Create) {
            let id = selected_id(params)?;
            let fetched: Value = cx.api.get(&format!("data_sources/{}", id), None).await?;
            let Value::Object(fetched) = fetched else {
                return Err(PortalError::Serialization(format!(
                    "data source {} is not an object",
                    id
                )));
            };
            record = fetched;

            if mode == CrudMode::Read {
                let supported: Value = cx
                    .api
                    .get(&format!("data_sources/{}/supported_scopes", id), None)
                    .await?;
                let supported_ids: HashSet<i64> = supported
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|scope| nested_id(scope, "scopeCode"))
                    .collect();
                let scopes: Value = cx.api.get("data_sources/all_scopes", None).await?;
                all_scopes = Value::Array(exclude_linked(into_list(scopes), &supported_ids));
                record.insert("supportedScopes".into(), supported);
            }
        }

        let record_type = record.get("type").and_then(Value::as_str).map(str::to_string);
        record.insert(
            "typeSelect".into(),
            serde_json::to_value(select_options(
                &cx.constants.data_source_types,
                record_type.as_deref(),
                &[],
            ))?,
        );

        cx.renderer.register_partial(CRUD_BUTTON_PARTIAL);

        let mut data = view_model(params);
        data.insert("dataSources".into(), Value::Array(data_sources.results));
        data.insert("dataSourceRecord".into(), Value::Object(record));
        data.insert("allScopes".into(), all_scopes);

        render(cx, Route::DataSources.template(), data)
    }
}

pub(crate) async fn create(cx: &mut ViewContext<'_>) -> PortalResult<Next> {
    let record = json!({
        "name": cx.form_json("dataSourceName")?,
        "type": cx.form_text("dataSourceType")?.unwrap_or_default(),
    });
    cx.api.send(Method::POST, "data_sources", Some(record)).await?;
    Ok(Next::ReturnFromCrud)
}

pub(crate) async fn delete(cx: &mut ViewContext<'_>, id: i64) -> PortalResult<Next> {
    cx.api
        .send(Method::DELETE, &format!("data_sources/{}", id), None)
        .await?;
    Ok(Next::ReturnFromCrud)
}

async fn supported_scope(
    cx: &mut ViewContext<'_>,
    method: Method,
    scope_code_id: i64,
    data_source_id: i64,
) -> PortalResult<Next> {
    if scope_code_id == 0 || data_source_id == 0 {
        return Ok(Next::Stay);
    }
    cx.api
        .send(
            method,
            &format!("data_sources/{}/supported_scopes", data_source_id),
            Some(json!({ "scopeCodeId": scope_code_id })),
        )
        .await?;
    Ok(Next::Reload)
}

pub(crate) async fn add_scope(
    cx: &mut ViewContext<'_>,
    scope_code_id: i64,
    data_source_id: i64,
) -> PortalResult<Next> {
    supported_scope(cx, Method::POST, scope_code_id, data_source_id).await
}

pub(crate) async fn remove_scope(
    cx: &mut ViewContext<'_>,
    scope_code_id: i64,
    data_source_id: i64,
) -> PortalResult<Next> {
    supported_scope(cx, Method::DELETE, scope_code_id, data_source_id).await
}
