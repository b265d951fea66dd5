//! Route registry

use serde::Serialize;

use crate::controllers::{
    data_sources::DataSourcesController, debug::DebugController,
    observations::ObservationsController, organizations::OrganizationsController,
    patients::PatientsController, studies::StudiesController, Controller,
};

/// Every navigable view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Organizations,
    Patients,
    Studies,
    Observations,
    DataSources,
    Debug,
}

impl Route {
    /// Registration order, which is also menu order
    pub const ALL: [Route; 6] = [
        Route::Organizations,
        Route::Patients,
        Route::Studies,
        Route::Observations,
        Route::DataSources,
        Route::Debug,
    ];

    /// URL path segment
    pub fn key(self) -> &'static str {
        match self {
            Route::Organizations => "organizations",
            Route::Patients => "patients",
            Route::Studies => "studies",
            Route::Observations => "observations",
            Route::DataSources => "dataSources",
            Route::Debug => "debug",
        }
    }

    pub fn from_key(key: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|route| route.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            Route::Organizations => "Organizations",
            Route::Patients => "Patients",
            Route::Studies => "Studies",
            Route::Observations => "Observations",
            Route::DataSources => "Data Sources",
            Route::Debug => "Debug",
        }
    }

    pub fn icon_class(self) -> &'static str {
        match self {
            Route::Organizations => "bi-diagram-3",
            Route::Patients => "bi-person-vcard",
            Route::Studies => "bi-journals",
            Route::Observations => "bi-database",
            Route::DataSources => "bi-phone",
            Route::Debug => "bi-bug",
        }
    }

    /// Template rendering this route's main content
    pub fn template(self) -> &'static str {
        self.key()
    }

    pub fn controller(self) -> &'static dyn Controller {
        match self {
            Route::Organizations => &OrganizationsController,
            Route::Patients => &PatientsController,
            Route::Studies => &StudiesController,
            Route::Observations => &ObservationsController,
            Route::DataSources => &DataSourcesController,
            Route::Debug => &DebugController,
        }
    }
}

/// A navigation menu entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDescriptor {
    pub key: String,
    pub label: String,
    pub icon_class: String,
    pub active: bool,
}

impl RouteDescriptor {
    fn new(route: Route) -> Self {
        Self {
            key: route.key().to_string(),
            label: route.label().to_string(),
            icon_class: route.icon_class().to_string(),
            active: false,
        }
    }
}

/// Menu entries for every route, none active
pub fn registry() -> Vec<RouteDescriptor> {
    Route::ALL.into_iter().map(RouteDescriptor::new).collect()
}

/// Mark the entry for `route` active and every other entry inactive
pub fn mark_active(descriptors: &mut [RouteDescriptor], route: Route) {
    for descriptor in descriptors.iter_mut() {
        descriptor.active = descriptor.key == route.key();
    }
}
