//! Shared handler state.

use std::sync::Arc;

use chatrelay_llm::Provider;
use chatrelay_settings::ChatRelaySettings;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::websocket::registry::SessionRegistry;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Upstream completion service.
    pub provider: Arc<dyn Provider>,
    /// Open `/ws` sessions.
    pub registry: Arc<SessionRegistry>,
    /// Loaded settings snapshot.
    pub settings: Arc<ChatRelaySettings>,
    /// Prometheus handle backing `/metrics`, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State with an empty registry and no metrics recorder.
    pub fn new(provider: Arc<dyn Provider>, settings: Arc<ChatRelaySettings>) -> Self {
        Self {
            provider,
            registry: Arc::new(SessionRegistry::new()),
            settings,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
