use crate::backend::{GameBackend, Upstream};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use bingo_common::{GatewayError, Outcome};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tracing::debug;

/// 上游不可用时的占位状态
pub const DOWN: &str = "down";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub gateway: String,
    #[serde(rename = "serviceA")]
    pub service_a: String,
    #[serde(rename = "serviceB")]
    pub service_b: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let report = aggregate(state.backend.as_ref(), state.health_timeout).await;
    state
        .metrics
        .set_upstream_up(Upstream::Game, report.service_a != DOWN);
    state
        .metrics
        .set_upstream_up(Upstream::Validation, report.service_b != DOWN);
    Json(report)
}

/// 两个上游并发探测、各自限时，一方失败不影响另一方的结果
pub async fn aggregate(backend: &dyn GameBackend, probe_timeout: Duration) -> HealthReport {
    let (service_a, service_b) = tokio::join!(
        probe_one(backend, Upstream::Game, probe_timeout),
        probe_one(backend, Upstream::Validation, probe_timeout),
    );
    HealthReport {
        gateway: "ok".to_string(),
        service_a,
        service_b,
    }
}

async fn probe_one(backend: &dyn GameBackend, upstream: Upstream, probe_timeout: Duration) -> String {
    match timeout(probe_timeout, backend.probe(upstream)).await {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            debug!(%upstream, error = %err, "health probe failed");
            DOWN.to_string()
        }
        Err(_) => {
            debug!(%upstream, "health probe timed out");
            DOWN.to_string()
        }
    }
}

pub async fn check_tcp(address: &str, timeout_duration: Duration) -> Outcome<()> {
    match timeout(timeout_duration, TcpStream::connect(address)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(err)) => Err(GatewayError::unavailable(format!("{address}: {err}"))),
        Err(_) => Err(GatewayError::Timeout),
    }
}
