//! Organizations view
//!
//! Lists top-level organizations, the tree under the selected one, and the
//! CRUD modal for a single organization.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};

use super::{render, selected_id, view_model, Controller, Next, View, ViewContext};
use crate::error::{PortalError, PortalResult};
use crate::model::{as_id, into_list, mark_selected, select_options, Paginated};
use crate::render::{CRUD_BUTTON_PARTIAL, ORGANIZATION_TREE_PARTIAL};
use crate::router::{CrudMode, QueryParams, Route};

/// Organization type never offered in forms
const ROOT_TYPE: &str = "root";

pub(crate) const NO_USER_MESSAGE: &str = "No User with this E-mail exists.";

pub struct OrganizationsController;

#[async_trait]
impl Controller for OrganizationsController {
    async fn render(&self, cx: &mut ViewContext<'_>, params: &QueryParams) -> PortalResult<View> {
        let top_level = cx.constants.organization_top_level_part_of_id;
        let mut top_level_organizations: Paginated = cx
            .api
            .get("organizations", Some(json!({ "partOf": top_level })))
            .await?;

        let mut children = Vec::new();
        if let Some(tlo_id) = params.get_id("tloId").filter(|id| *id != 0) {
            mark_selected(&mut top_level_organizations.results, Some(tlo_id));
            let tree: Value = cx
                .api
                .get(&format!("organizations/{}/tree", tlo_id), None)
                .await?;
            children = into_list(tree.get("children").cloned().unwrap_or(Value::Null));
        }

        let record = match params.crud_mode() {
            Some(CrudMode::Create) => Some(new_record(cx, params).await?),
            Some(mode) => Some(existing_record(cx, params, mode).await?),
            None => None,
        };

        cx.renderer.register_partial(ORGANIZATION_TREE_PARTIAL);
        cx.renderer.register_partial(CRUD_BUTTON_PARTIAL);

        let mut data = view_model(params);
        data.insert(
            "topLevelOrganizationsSelect".into(),
            Value::Array(top_level_organizations.results),
        );
        data.insert("children".into(), Value::Array(children));
        data.insert(
            "organizationRecord".into(),
            record.map(Value::Object).unwrap_or(Value::Null),
        );

        render(cx, Route::Organizations.template(), data)
    }
}

/// Blank record for the create form, with the parent resolved
async fn new_record(cx: &ViewContext<'_>, params: &QueryParams) -> PortalResult<Map<String, Value>> {
    let top_level = cx.constants.organization_top_level_part_of_id;
    let parent = params.get_id("partOf").or_else(|| params.get_id("id"));

    let (part_of_id, part_of_name) = match parent {
        Some(id) if id != top_level => {
            let parent: Value = cx.api.get(&format!("organizations/{}", id), None).await?;
            (
                parent.get("id").cloned().unwrap_or(json!(id)),
                parent.get("name").cloned().unwrap_or(Value::Null),
            )
        }
        _ => (
            json!(top_level),
            json!(cx.constants.organization_top_level_part_of_label),
        ),
    };

    let mut record = Map::new();
    record.insert("partOfId".into(), part_of_id);
    record.insert("partOfName".into(), part_of_name);
    record.insert(
        "typeSelect".into(),
        serde_json::to_value(select_options(
            &cx.constants.organization_types,
            None,
            &[ROOT_TYPE],
        ))?,
    );
    Ok(record)
}

/// Stored record for read/update/delete, with parent name and, when
/// reading, its users and studies
async fn existing_record(
    cx: &ViewContext<'_>,
    params: &QueryParams,
    mode: CrudMode,
) -> PortalResult<Map<String, Value>> {
    let id = selected_id(params)?;
    let record: Value = cx.api.get(&format!("organizations/{}", id), None).await?;
    let Value::Object(mut record) = record else {
        return Err(PortalError::Serialization(format!(
            "organization {} is not an object",
            id
        )));
    };

    let record_type = record.get("type").and_then(Value::as_str).map(str::to_string);
    record.insert(
        "typeSelect".into(),
        serde_json::to_value(select_options(
            &cx.constants.organization_types,
            record_type.as_deref(),
            &[ROOT_TYPE],
        ))?,
    );

    let top_level = cx.constants.organization_top_level_part_of_id;
    let part_of = record.get("partOf").and_then(as_id);
    let part_of_name = match part_of {
        Some(parent_id) if parent_id != top_level => {
            let parent: Value = cx
                .api
                .get(&format!("organizations/{}", parent_id), None)
                .await?;
            parent.get("name").cloned().unwrap_or(Value::Null)
        }
        _ => json!(cx.constants.organization_top_level_part_of_label),
    };
    record.insert("partOfName".into(), part_of_name);

    if mode == CrudMode::Read {
        let users: Value = cx.api.get(&format!("organizations/{}/users", id), None).await?;
        record.insert("users".into(), users);
        let studies: Value = cx
            .api
            .get(&format!("organizations/{}/studies", id), None)
            .await?;
        record.insert("studies".into(), studies);
    }

    Ok(record)
}

pub(crate) async fn create(cx: &mut ViewContext<'_>, part_of: i64) -> PortalResult<Next> {
    let record = json!({
        "name": cx.form_json("organizationName")?,
        "type": cx.form_json("organizationType")?,
        "partOf": part_of,
    });
    cx.api.send(Method::POST, "organizations", Some(record)).await?;
    Ok(Next::ReturnFromCrud)
}

pub(crate) async fn update(cx: &mut ViewContext<'_>, id: i64) -> PortalResult<Next> {
    let record = json!({
        "name": cx.form_json("organizationName")?,
        "type": cx.form_json("organizationType")?,
    });
    cx.api
        .send(Method::PATCH, &format!("organizations/{}", id), Some(record))
        .await?;
    Ok(Next::ReturnFromCrud)
}

pub(crate) async fn delete(cx: &mut ViewContext<'_>, id: i64) -> PortalResult<Next> {
    cx.api
        .send(Method::DELETE, &format!("organizations/{}", id), None)
        .await?;
    Ok(Next::ReturnFromCrud)
}

/// Look the user up by e-mail and add them to the organization
pub(crate) async fn add_user(
    cx: &mut ViewContext<'_>,
    email: &str,
    organization_id: i64,
) -> PortalResult<Next> {
    let email = email.trim();
    if email.is_empty() || organization_id == 0 {
        return Ok(Next::Stay);
    }

    let users: Paginated = cx.api.get("users", Some(json!({ "email": email }))).await?;
    let Some(user_id) = users.results.first().and_then(|user| user.get("id").cloned()) else {
        cx.page.alert(NO_USER_MESSAGE);
        return Err(PortalError::NothingSelected(NO_USER_MESSAGE.to_string()));
    };

    cx.api
        .send(
            Method::POST,
            &format!("organizations/{}/user", organization_id),
            Some(json!({ "jheUserId": user_id })),
        )
        .await?;
    Ok(Next::Reload)
}

pub(crate) async fn remove_user(
    cx: &mut ViewContext<'_>,
    user_id: i64,
    organization_id: i64,
) -> PortalResult<Next> {
    if user_id == 0 || organization_id == 0 {
        return Ok(Next::Stay);
    }
    cx.api
        .send(
            Method::DELETE,
            &format!("organizations/{}/user", organization_id),
            Some(json!({ "jheUserId": user_id })),
        )
        .await?;
    Ok(Next::Reload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::perform;
    use crate::controllers::Action;
    use crate::router::Store;
    use crate::testing::Harness;

    fn script_top_level(h: &Harness) {
        h.transport.on(
            "GET",
            "organizations?partOf=0",
            200,
            json!({"count": 2, "results": [{"id": 1, "name": "Clinic A"}, {"id": 2, "name": "Clinic B"}]}),
        );
    }

    #[tokio::test]
    async fn test_render_list_with_tree() {
        let h = Harness::new();
        script_top_level(&h);
        h.transport.on(
            "GET",
            "organizations/2/tree",
            200,
            json!({"id": 2, "children": [{"id": 20, "name": "Cardiology", "children": []}]}),
        );

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let params = QueryParams::new().with("tloId", 2);
        let view = OrganizationsController.render(&mut cx, &params).await.unwrap();

        let data = h.rendered("organizations");
        assert_eq!(data["tloId"], json!("2"));
        assert_eq!(data["topLevelOrganizationsSelect"][1]["selected"], json!(true));
        assert_eq!(data["children"][0]["name"], json!("Cardiology"));
        assert_eq!(data["organizationRecord"], Value::Null);
        assert!(matches!(view, View::Fragment(_)));
        assert!(h.renderer_partials().contains(&ORGANIZATION_TREE_PARTIAL.to_string()));
    }

    #[tokio::test]
    async fn test_zero_tlo_skips_tree() {
        let h = Harness::new();
        script_top_level(&h);

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        OrganizationsController
            .render(&mut cx, &QueryParams::new().with("tloId", 0))
            .await
            .unwrap();

        assert_eq!(h.transport.calls(), vec!["GET organizations?partOf=0"]);
    }

    #[tokio::test]
    async fn test_create_under_top_level() {
        let h = Harness::new();
        script_top_level(&h);

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let params = QueryParams::new().with("create", true).with("partOf", 0);
        OrganizationsController.render(&mut cx, &params).await.unwrap();

        let record = &h.rendered("organizations")["organizationRecord"];
        assert_eq!(record["partOfId"], json!(0));
        assert_eq!(record["partOfName"], json!("None (Top Level Organization)"));
        let types = record["typeSelect"].as_array().unwrap();
        assert!(types.iter().all(|t| t["value"] != json!("root")));
    }

    #[tokio::test]
    async fn test_create_under_parent() {
        let h = Harness::new();
        script_top_level(&h);
        h.transport.on("GET", "organizations/12", 200, json!({"id": 12, "name": "Acme Health"}));

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let params = QueryParams::new().with("create", true).with("id", 12);
        OrganizationsController.render(&mut cx, &params).await.unwrap();

        let record = &h.rendered("organizations")["organizationRecord"];
        assert_eq!(record["partOfId"], json!(12));
        assert_eq!(record["partOfName"], json!("Acme Health"));
    }

    #[tokio::test]
    async fn test_read_fetches_users_and_studies() {
        let h = Harness::new();
        script_top_level(&h);
        h.transport.on(
            "GET",
            "organizations/20",
            200,
            json!({"id": 20, "name": "Cardiology", "type": "dept", "partOf": 2}),
        );
        h.transport.on("GET", "organizations/2", 200, json!({"id": 2, "name": "Clinic B"}));
        h.transport.on("GET", "organizations/20/users", 200, json!([{"id": 5, "email": "a@b.c"}]));
        h.transport.on("GET", "organizations/20/studies", 200, json!([{"id": 44}]));

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let params = QueryParams::new().with("read", true).with("id", 20);
        OrganizationsController.render(&mut cx, &params).await.unwrap();

        let record = &h.rendered("organizations")["organizationRecord"];
        assert_eq!(record["partOfName"], json!("Clinic B"));
        assert_eq!(record["users"][0]["id"], json!(5));
        assert_eq!(record["studies"][0]["id"], json!(44));
        let selected: Vec<_> = record["typeSelect"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|t| t["selected"] == json!(true))
            .map(|t| t["value"].clone())
            .collect();
        assert_eq!(selected, vec![json!("dept")]);

        assert_eq!(
            h.transport.calls(),
            vec![
                "GET organizations?partOf=0",
                "GET organizations/20",
                "GET organizations/2",
                "GET organizations/20/users",
                "GET organizations/20/studies",
            ]
        );
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let h = Harness::new();
        script_top_level(&h);

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let result = OrganizationsController
            .render(&mut cx, &QueryParams::new().with("update", true))
            .await;
        assert!(matches!(result, Err(PortalError::MissingParameter(_))));
    }

    #[tokio::test]
    async fn test_create_posts_form() {
        let h = Harness::new();
        h.transport.on("POST", "organizations", 201, json!({"id": 30}));
        h.page.type_into("organizationName", "Acme");
        h.page.type_into("organizationType", "site");

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let next = perform(&mut cx, Action::CreateOrganization { part_of: 12 }).await.unwrap();

        assert_eq!(next, Next::ReturnFromCrud);
        assert_eq!(
            h.transport.body_of("POST", "organizations"),
            Some(json!({"name": "Acme", "type": "site", "partOf": 12}))
        );
    }

    #[tokio::test]
    async fn test_create_sends_name_as_typed() {
        let h = Harness::new();
        h.transport.on("POST", "organizations", 201, json!({"id": 31}));
        h.page.type_into("organizationName", "  Acme  ");
        h.page.type_into("organizationType", "");

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        perform(&mut cx, Action::CreateOrganization { part_of: 12 }).await.unwrap();

        assert_eq!(
            h.transport.body_of("POST", "organizations"),
            Some(json!({"name": "  Acme  ", "type": null, "partOf": 12}))
        );
    }

    #[tokio::test]
    async fn test_add_unknown_user_alerts() {
        let h = Harness::new();
        h.transport.on("GET", "users?email=nobody%40example.org", 200, json!({"results": []}));

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let result = perform(
            &mut cx,
            Action::AddUserToOrganization {
                email: "nobody@example.org".into(),
                organization_id: 2,
            },
        )
        .await;

        assert!(matches!(result, Err(PortalError::NothingSelected(_))));
        assert_eq!(h.page.alerts(), vec![NO_USER_MESSAGE.to_string()]);
        assert_eq!(h.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_add_and_remove_user() {
        let h = Harness::new();
        h.transport.on("GET", "users?email=a%40b.c", 200, json!({"results": [{"id": 5}]}));
        h.transport.on("POST", "organizations/2/user", 200, json!({}));
        h.transport.on("DELETE", "organizations/2/user", 200, json!({}));

        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let next = perform(
            &mut cx,
            Action::AddUserToOrganization {
                email: "a@b.c".into(),
                organization_id: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(next, Next::Reload);
        assert_eq!(
            h.transport.body_of("POST", "organizations/2/user"),
            Some(json!({"jheUserId": 5}))
        );

        let next = perform(
            &mut cx,
            Action::RemoveUserFromOrganization {
                user_id: 5,
                organization_id: 2,
            },
        )
        .await
        .unwrap();
        assert_eq!(next, Next::Reload);
        assert_eq!(
            h.transport.body_of("DELETE", "organizations/2/user"),
            Some(json!({"jheUserId": 5}))
        );
    }

    #[tokio::test]
    async fn test_blank_email_does_nothing() {
        let h = Harness::new();
        let api = h.api();
        let mut store = Store::default();
        let mut cx = h.context(&api, &mut store);
        let next = add_user(&mut cx, "  ", 2).await.unwrap();
        assert_eq!(next, Next::Stay);
        assert!(h.transport.calls().is_empty());
    }
}
