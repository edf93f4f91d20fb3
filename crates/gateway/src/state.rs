use crate::backend::GameBackend;
use crate::metrics::GatewayMetrics;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn GameBackend>,
    pub metrics: Arc<GatewayMetrics>,
    pub health_timeout: Duration,
}
