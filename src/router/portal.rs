//! The navigator
//!
//! [`Portal`] owns the application state and every collaborator. All
//! navigation and every user action go through it, one at a time.

use std::sync::Arc;

use serde_json::json;

use super::history::{History, Location};
use super::params::QueryParams;
use super::route::{mark_active, registry, Route, RouteDescriptor};
use super::state::AppState;
use crate::api::{ApiClient, HttpTransport};
use crate::config::{Config, PortalConfig, PortalConstants};
use crate::controllers::{perform, Action, Next, View, ViewContext};
use crate::error::{Failure, PortalError, PortalResult};
use crate::page::Page;
use crate::render::{TemplateRenderer, BODY_TEMPLATE};
use crate::session::{load_profile, ProfileCheck, SessionManager};

pub struct Portal {
    settings: PortalConfig,
    constants: PortalConstants,
    api: ApiClient,
    session: Arc<dyn SessionManager>,
    renderer: Arc<dyn TemplateRenderer>,
    page: Arc<dyn Page>,
    history: Arc<dyn History>,
    nav_items: Vec<RouteDescriptor>,
    default_route: Route,
    state: AppState,
}

impl Portal {
    pub fn new(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionManager>,
        renderer: Arc<dyn TemplateRenderer>,
        page: Arc<dyn Page>,
        history: Arc<dyn History>,
    ) -> Self {
        let default_route = Route::from_key(&config.portal.default_route).unwrap_or_else(|| {
            tracing::warn!(
                default_route = %config.portal.default_route,
                "Unknown default route, using organizations"
            );
            Route::Organizations
        });
        let api = ApiClient::new(&config.api, transport, session.clone(), page.clone());

        Self {
            settings: config.portal.clone(),
            constants: config.constants.clone(),
            api,
            session,
            renderer,
            page,
            history,
            nav_items: registry(),
            default_route,
            state: AppState::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Navigation menu as last rendered
    pub fn nav_items(&self) -> &[RouteDescriptor] {
        &self.nav_items
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Route key and parameters of the current history entry
    pub fn current_location(&self) -> Location {
        Location::parse(&self.history.current(), &self.settings.route_prefix)
    }

    /// Render whatever the current location names
    pub async fn start(&mut self) -> PortalResult<()> {
        let location = self.current_location();
        self.navigate_key(&location.route_key, Some(location.params), None)
            .await
    }

    /// Navigate by route key; unknown keys fall back to the default route
    pub async fn navigate_key(
        &mut self,
        key: &str,
        params: Option<QueryParams>,
        append: Option<QueryParams>,
    ) -> PortalResult<()> {
        let route = match Route::from_key(key) {
            Some(route) => route,
            None => {
                tracing::debug!(key, default = self.default_route.key(), "Unknown route");
                self.default_route
            }
        };
        self.navigate(route, params, append).await
    }

    /// Show `route`.
    ///
    /// Explicit `params` win; otherwise `append` is merged over the current
    /// parameters; otherwise the view starts with no parameters. A failure
    /// the user has already been told about leaves the page as it was.
    pub async fn navigate(
        &mut self,
        route: Route,
        params: Option<QueryParams>,
        append: Option<QueryParams>,
    ) -> PortalResult<()> {
        let current = self.current_location();
        let params = match (params, append) {
            (Some(params), _) => params,
            (None, Some(append)) => current.params.clone().merged(append),
            (None, None) => QueryParams::new(),
        };

        match self.show(route, params, &current).await {
            Err(e) if e.is_surfaced() => {
                tracing::debug!(route = route.key(), error = %e, "Navigation halted");
                Ok(())
            }
            result => result,
        }
    }

    async fn show(&mut self, route: Route, params: QueryParams, current: &Location) -> PortalResult<()> {
        if self.session.get_user().await.is_none() {
            tracing::info!("No session, requesting sign-in");
            self.session.signin_redirect().await;
            if self.session.get_user().await.is_none() {
                return Err(PortalError::Incomplete(Failure::AuthRequired));
            }
        }

        let (route, params, main_content) = self.render_route(route, params).await?;

        mark_active(&mut self.nav_items, route);
        let body = self.renderer.render(
            BODY_TEMPLATE,
            &json!({
                "navItems": self.nav_items,
                "mainContent": main_content,
            }),
        )?;
        self.page.replace_body(&body);

        if let Err(e) = self.render_user_profile().await {
            tracing::warn!(error = %e, "Could not show user profile");
        }
        if self.state.signing_out {
            return Ok(());
        }

        if params.crud_mode().is_some() {
            self.page.open_modal(route.key());
        }

        if route.key() != current.route_key || params != current.params {
            let url = Location::format(route.key(), &params, &self.settings.route_prefix);
            tracing::debug!(url = %url, "Pushing history entry");
            self.history.push(&url);
        }

        tracing::info!(route = route.key(), params = %params, "Navigated");
        Ok(())
    }

    /// Run controllers until one produces content, following redirects to
    /// canonical locations.
    async fn render_route(
        &mut self,
        mut route: Route,
        mut params: QueryParams,
    ) -> PortalResult<(Route, QueryParams, String)> {
        loop {
            let mut cx = self.context();
            match route.controller().render(&mut cx, &params).await? {
                View::Fragment(html) => return Ok((route, params, html)),
                View::Redirect(to, to_params) => {
                    tracing::debug!(from = route.key(), to = to.key(), params = %to_params, "Redirecting");
                    route = to;
                    params = to_params;
                }
            }
        }
    }

    fn context(&mut self) -> ViewContext<'_> {
        ViewContext {
            api: &self.api,
            renderer: self.renderer.as_ref(),
            page: self.page.as_ref(),
            constants: &self.constants,
            store: &mut self.state.store,
        }
    }

    /// Re-render the current location without touching history
    pub async fn nav_reload(&mut self) -> PortalResult<()> {
        self.page.clear_validation();
        self.page.close_modal();
        let current = self.current_location();
        self.navigate_key(&current.route_key, Some(current.params), None)
            .await
    }

    /// Close the modal and show the current location without CRUD mode
    pub async fn nav_return_from_crud(&mut self) -> PortalResult<()> {
        let current = self.current_location();
        self.page.close_modal();
        self.navigate_key(&current.route_key, Some(current.params.without_crud()), None)
            .await
    }

    /// Back/forward navigation
    pub async fn on_pop_state(&mut self) -> PortalResult<()> {
        if self.state.signing_out {
            tracing::debug!("Ignoring history event while signing out");
            return Ok(());
        }
        self.nav_reload().await
    }

    /// End the session and leave the application
    pub async fn sign_out(&mut self) {
        tracing::info!("Signing out");
        self.state.signing_out = true;
        self.session.remove_user().await;
        self.state.profile = None;
        self.page.leave(&self.settings.logout_url);
    }

    async fn render_user_profile(&mut self) -> PortalResult<()> {
        if self.state.profile.is_none() {
            match load_profile(&self.api, self.session.as_ref()).await? {
                ProfileCheck::Valid(profile) => self.state.profile = Some(profile),
                ProfileCheck::SubjectMismatch(_) => {
                    self.sign_out().await;
                    return Ok(());
                }
            }
        }
        if let Some(profile) = &self.state.profile {
            self.page.set_profile_name(&profile.display_name());
        }
        Ok(())
    }

    /// Run a user action and go wherever it leads. A failed action leaves
    /// the page, and any open modal, as it was.
    pub async fn dispatch(&mut self, action: Action) -> PortalResult<()> {
        let mut cx = self.context();
        let next = match perform(&mut cx, action).await {
            Ok(next) => next,
            Err(e) if e.is_surfaced() => {
                tracing::debug!(error = %e, "Action did not complete");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match next {
            Next::Stay => Ok(()),
            Next::Reload => self.nav_reload().await,
            Next::ReturnFromCrud => self.nav_return_from_crud().await,
            Next::Navigate(route, params) => {
                self.page.close_modal();
                self.navigate(route, Some(params), None).await
            }
        }
    }
}
