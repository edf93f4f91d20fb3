use crate::backend::Upstream;
use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

const METRIC_PREFIX: &str = "bingo_gateway";

/// 网关进程级指标；持有独立的 Registry，计数器本身是原子的
pub struct GatewayMetrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    inflight_requests: IntGauge,
    upstream_errors_total: IntCounterVec,
    upstream_up: IntGaugeVec,
    games_created_total: IntCounter,
    players_registered_total: IntCounter,
    numbers_drawn_total: IntCounter,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new(
                format!("{METRIC_PREFIX}_http_requests_total"),
                "网关 HTTP 请求总数",
            ),
            &["method", "route", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                format!("{METRIC_PREFIX}_http_request_duration_seconds"),
                "网关 HTTP 请求耗时（秒）",
            ),
            &["method", "route", "status"],
        )?;
        let inflight_requests = IntGauge::new(
            format!("{METRIC_PREFIX}_inflight_requests"),
            "正在处理的请求数",
        )?;
        let upstream_errors_total = IntCounterVec::new(
            Opts::new(
                format!("{METRIC_PREFIX}_upstream_errors_total"),
                "上游调用失败次数",
            ),
            &["reason"],
        )?;
        let upstream_up = IntGaugeVec::new(
            Opts::new(
                format!("{METRIC_PREFIX}_upstream_up"),
                "最近一次健康检查中上游是否可用",
            ),
            &["service"],
        )?;
        let games_created_total = IntCounter::new(
            format!("{METRIC_PREFIX}_games_created_total"),
            "已创建的游戏数",
        )?;
        let players_registered_total = IntCounter::new(
            format!("{METRIC_PREFIX}_players_registered_total"),
            "注册成功的玩家数",
        )?;
        let numbers_drawn_total = IntCounter::new(
            format!("{METRIC_PREFIX}_numbers_drawn_total"),
            "成功抽取的号码数",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(inflight_requests.clone()))?;
        registry.register(Box::new(upstream_errors_total.clone()))?;
        registry.register(Box::new(upstream_up.clone()))?;
        registry.register(Box::new(games_created_total.clone()))?;
        registry.register(Box::new(players_registered_total.clone()))?;
        registry.register(Box::new(numbers_drawn_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            inflight_requests,
            upstream_errors_total,
            upstream_up,
            games_created_total,
            players_registered_total,
            numbers_drawn_total,
        })
    }

    pub fn observe_request(&self, method: &str, route: &str, status: &str, elapsed_secs: f64) {
        self.http_requests_total
            .with_label_values(&[method, route, status])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, route, status])
            .observe(elapsed_secs);
    }

    /// 请求结束（包括 panic 展开）时 guard 被 drop，自动减一
    pub fn track_inflight(&self) -> InflightGuard {
        self.inflight_requests.inc();
        InflightGuard {
            gauge: self.inflight_requests.clone(),
        }
    }

    pub fn inc_upstream_error(&self, reason: &str) {
        self.upstream_errors_total.with_label_values(&[reason]).inc();
    }

    pub fn set_upstream_up(&self, upstream: Upstream, up: bool) {
        let service = upstream.to_string();
        self.upstream_up
            .with_label_values(&[service.as_str()])
            .set(i64::from(up));
    }

    pub fn inc_games_created(&self) {
        self.games_created_total.inc();
    }

    pub fn inc_players_registered(&self) {
        self.players_registered_total.inc();
    }

    pub fn inc_numbers_drawn(&self) {
        self.numbers_drawn_total.inc();
    }

    pub fn render(&self) -> Response {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        match encoder.encode(&metric_families, &mut buffer) {
            Ok(_) => {
                let mut resp = Response::new(Body::from(buffer));
                resp.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_str(encoder.format_type())
                        .unwrap_or_else(|_| HeaderValue::from_static("text/plain; version=0.0.4")),
                );
                resp
            }
            Err(e) => {
                tracing::error!("Failed to encode metrics: {}", e);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(serde_json::json!({"error": "Metrics encoding failed"})),
                )
                    .into_response()
            }
        }
    }
}

pub struct InflightGuard {
    gauge: IntGauge,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

// 测试中读取计数
#[cfg(test)]
impl GatewayMetrics {
    pub fn games_created(&self) -> u64 {
        self.games_created_total.get()
    }

    pub fn players_registered(&self) -> u64 {
        self.players_registered_total.get()
    }

    pub fn numbers_drawn(&self) -> u64 {
        self.numbers_drawn_total.get()
    }

    pub fn requests_total(&self, method: &str, route: &str, status: &str) -> u64 {
        self.http_requests_total
            .with_label_values(&[method, route, status])
            .get()
    }

    pub fn inflight(&self) -> i64 {
        self.inflight_requests.get()
    }

    pub fn upstream_errors(&self, reason: &str) -> u64 {
        self.upstream_errors_total.with_label_values(&[reason]).get()
    }
}

pub async fn metrics_middleware(
    State(metrics): State<Arc<GatewayMetrics>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "<unmatched>".to_string());

    let _inflight = metrics.track_inflight();
    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed = start.elapsed().as_secs_f64();

    let status = response.status().as_u16().to_string();
    metrics.observe_request(&method, &route, &status, elapsed);

    response
}
