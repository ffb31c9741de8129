//! Application state

use holocron_auth::AuthService;
use holocron_core::{CatalogService, SyncEngine};
use std::sync::Arc;

/// Prometheus render handle served on `/metrics`
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub catalog: Arc<CatalogService>,
    pub sync: Arc<SyncEngine>,
}

impl AppState {
    pub fn new(
        auth: Arc<AuthService>,
        catalog: Arc<CatalogService>,
        sync: Arc<SyncEngine>,
    ) -> Self {
        Self {
            auth,
            catalog,
            sync,
        }
    }
}
