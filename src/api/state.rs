use crate::application::DeckCache;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub deck_cache: Arc<DeckCache>,
    /// Catalog base URL, reported by `/health`
    pub catalog_url: String,
    /// Absent when no Prometheus recorder was installed (tests)
    pub metrics: Option<PrometheusHandle>,
}
