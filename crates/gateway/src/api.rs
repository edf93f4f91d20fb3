use crate::alias::rewrite_legacy_path;
use crate::extract::Input;
use crate::health;
use crate::metrics::metrics_middleware;
use crate::state::AppState;
use axum::Json;
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bingo_common::models::{
    BingoReply, CardReply, CheckBingoRequest, CreateGameReply, CreateGameRequest,
    DrawNumberReply, DrawNumberRequest, GetCardRequest, MarkNumberRequest, RegisterCardRequest,
    RegisterPlayerReply, RegisterPlayerRequest, SuccessReply, ValidateBingoRequest,
    ValidateNumberRequest, require, require_text,
};
use bingo_common::{BackendMode, GatewayError, GatewayResult, Operation, Outcome};
use tower::Layer;
use tower::util::{MapRequest, MapRequestLayer};
use tower_http::trace::TraceLayer;

/// 对外服务：旧路径改写 + 规范路由
pub type App = MapRequest<Router, fn(Request) -> Request>;

/// 某个操作内部产生的错误，按该操作的约定渲染响应体
#[derive(Debug)]
pub struct OperationError {
    operation: Operation,
    error: GatewayError,
}

impl OperationError {
    fn of(operation: Operation) -> impl Fn(GatewayError) -> Self {
        move |error| Self { operation, error }
    }
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        tracing::debug!(operation = self.operation.name(), "operation failed");
        self.error
            .into_response_with(self.operation.failure_convention())
    }
}

type ApiResult<T> = std::result::Result<Json<T>, OperationError>;

pub fn app(state: AppState) -> App {
    let rewrite: fn(Request) -> Request = rewrite_legacy_path;
    MapRequestLayer::new(rewrite).layer(router(state))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(Operation::CreateGame.path(), post(create_game))
        .route(Operation::RegisterPlayer.path(), post(register_player))
        .route(Operation::DrawNumber.path(), post(draw_number))
        .route(Operation::MarkNumber.path(), post(mark_number))
        .route(
            Operation::CheckBingo.path(),
            get(check_bingo).post(check_bingo),
        )
        .route(Operation::GetCard.path(), get(get_card).post(get_card))
        .route(Operation::RegisterCard.path(), post(register_card))
        .route(Operation::ValidateNumber.path(), post(validate_number))
        .route(Operation::ValidateBingo.path(), post(validate_bingo))
        .route("/health", get(health::health))
        .route("/metrics", get(metrics))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 上游失败计入指标后转为操作错误
fn settle<T>(state: &AppState, operation: Operation, outcome: Outcome<T>) -> Result<T, OperationError> {
    outcome.map_err(|error| {
        if let Some(reason) = error.upstream_reason() {
            state.metrics.inc_upstream_error(reason);
        }
        OperationError { operation, error }
    })
}

async fn create_game(
    State(state): State<AppState>,
    Input(payload): Input<CreateGameRequest>,
) -> ApiResult<CreateGameReply> {
    let op = Operation::CreateGame;
    let game_name = require_text(&payload.game_name, "game_name").map_err(OperationError::of(op))?;

    let reply = settle(&state, op, state.backend.create_game(game_name).await)?;
    state.metrics.inc_games_created();
    Ok(Json(reply))
}

async fn register_player(
    State(state): State<AppState>,
    Input(payload): Input<RegisterPlayerRequest>,
) -> ApiResult<RegisterPlayerReply> {
    let op = Operation::RegisterPlayer;
    let game_id = require_text(&payload.game_id, "game_id").map_err(OperationError::of(op))?;
    let player_name =
        require_text(&payload.player_name, "player_name").map_err(OperationError::of(op))?;

    let reply = settle(
        &state,
        op,
        state.backend.register_player(game_id, player_name).await,
    )?;
    if reply.success {
        state.metrics.inc_players_registered();
    }
    Ok(Json(reply))
}

async fn draw_number(
    State(state): State<AppState>,
    Input(payload): Input<DrawNumberRequest>,
) -> ApiResult<DrawNumberReply> {
    let op = Operation::DrawNumber;
    let game_id = require_text(&payload.game_id, "game_id").map_err(OperationError::of(op))?;

    let reply = settle(&state, op, state.backend.draw_number(game_id).await)?;
    if reply.success {
        state.metrics.inc_numbers_drawn();
    }
    Ok(Json(reply))
}

/// RPC 代际的 MarkNumber 请求带 game_id，HTTP 代际只按 player_id 定位
fn mark_game_id(mode: BackendMode, game_id: &Option<String>) -> GatewayResult<Option<&str>> {
    match mode {
        BackendMode::Grpc => require_text(game_id, "game_id").map(Some),
        BackendMode::Rest => Ok(None),
    }
}

async fn mark_number(
    State(state): State<AppState>,
    Input(payload): Input<MarkNumberRequest>,
) -> ApiResult<SuccessReply> {
    let op = Operation::MarkNumber;
    let game_id =
        mark_game_id(state.backend.mode(), &payload.game_id).map_err(OperationError::of(op))?;
    let player_id = require_text(&payload.player_id, "player_id").map_err(OperationError::of(op))?;
    let number = require(&payload.number, "number").map_err(OperationError::of(op))?;

    let outcome = state.backend.mark_number(game_id, player_id, number).await;
    Ok(Json(settle(&state, op, outcome)?))
}

async fn check_bingo(
    State(state): State<AppState>,
    Input(payload): Input<CheckBingoRequest>,
) -> ApiResult<BingoReply> {
    let op = Operation::CheckBingo;
    let game_id = require_text(&payload.game_id, "game_id").map_err(OperationError::of(op))?;
    let player_id = require_text(&payload.player_id, "player_id").map_err(OperationError::of(op))?;

    let outcome = state.backend.check_bingo(game_id, player_id).await;
    Ok(Json(settle(&state, op, outcome)?))
}

async fn get_card(
    State(state): State<AppState>,
    Input(payload): Input<GetCardRequest>,
) -> ApiResult<CardReply> {
    let op = Operation::GetCard;
    let player_id = require_text(&payload.player_id, "player_id").map_err(OperationError::of(op))?;

    let outcome = state.backend.get_card(player_id).await;
    Ok(Json(settle(&state, op, outcome)?))
}

async fn register_card(
    State(state): State<AppState>,
    Input(payload): Input<RegisterCardRequest>,
) -> ApiResult<SuccessReply> {
    let op = Operation::RegisterCard;
    let player_id = require_text(&payload.player_id, "player_id").map_err(OperationError::of(op))?;
    let card_numbers =
        require(&payload.card_numbers, "card_numbers").map_err(OperationError::of(op))?;

    let outcome = state.backend.register_card(player_id, &card_numbers).await;
    Ok(Json(settle(&state, op, outcome)?))
}

async fn validate_number(
    State(state): State<AppState>,
    Input(payload): Input<ValidateNumberRequest>,
) -> ApiResult<SuccessReply> {
    let op = Operation::ValidateNumber;
    let player_id = require_text(&payload.player_id, "player_id").map_err(OperationError::of(op))?;
    let number = require(&payload.number, "number").map_err(OperationError::of(op))?;

    let outcome = state.backend.validate_number(player_id, number).await;
    Ok(Json(settle(&state, op, outcome)?))
}

async fn validate_bingo(
    State(state): State<AppState>,
    Input(payload): Input<ValidateBingoRequest>,
) -> ApiResult<BingoReply> {
    let op = Operation::ValidateBingo;
    let player_id = require_text(&payload.player_id, "player_id").map_err(OperationError::of(op))?;
    let numbers = require(&payload.numbers, "numbers").map_err(OperationError::of(op))?;

    let outcome = state.backend.validate_bingo(player_id, &numbers).await;
    Ok(Json(settle(&state, op, outcome)?))
}

async fn metrics(State(state): State<AppState>) -> Response {
    state.metrics.render()
}

async fn not_found() -> GatewayError {
    GatewayError::NotFound("Endpoint not found".to_string())
}

async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GameBackend, Upstream};
    use crate::metrics::GatewayMetrics;
    use crate::testing::{Fault, FakeBackend};
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Harness {
        app: App,
        backend: Arc<FakeBackend>,
        metrics: Arc<GatewayMetrics>,
    }

    fn harness(mode: BackendMode) -> Harness {
        let backend = Arc::new(FakeBackend::new(mode));
        let metrics = Arc::new(GatewayMetrics::new().unwrap());
        let state = AppState {
            backend: backend.clone(),
            metrics: metrics.clone(),
            health_timeout: Duration::from_millis(200),
        };
        Harness {
            app: app(state),
            backend,
            metrics,
        }
    }

    /// 预置一局游戏 g1 和玩家 p1（号码卡 [1..=5]）
    async fn seeded(mode: BackendMode) -> Harness {
        let h = harness(mode);
        h.backend.create_game("Bingo").await.unwrap();
        h.backend.register_player("g1", "Ana").await.unwrap();
        h
    }

    async fn send(app: &App, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!bytes.is_empty(), "{method} {uri} answered with an empty body");
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post(app: &App, uri: &str, body: Value) -> (StatusCode, Value) {
        send(app, "POST", uri, Some(body)).await
    }

    fn valid_body(op: Operation) -> Value {
        match op {
            Operation::CreateGame => json!({"game_name": "Bingo"}),
            Operation::RegisterPlayer => json!({"game_id": "g1", "player_name": "Ana"}),
            Operation::DrawNumber => json!({"game_id": "g1"}),
            Operation::MarkNumber => json!({"game_id": "g1", "player_id": "p1", "number": 1}),
            Operation::CheckBingo => json!({"game_id": "g1", "player_id": "p1"}),
            Operation::GetCard => json!({"player_id": "p1"}),
            Operation::RegisterCard => json!({"player_id": "p1", "card_numbers": [1, 2]}),
            Operation::ValidateNumber => json!({"player_id": "p1", "number": 1}),
            Operation::ValidateBingo => json!({"player_id": "p1", "numbers": [1, 2]}),
        }
    }

    #[tokio::test]
    async fn missing_field_short_circuits_before_backend() {
        let h = harness(BackendMode::Grpc);

        let (status, body) = post(&h.app, "/register-player", json!({"game_id": "g1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "player_name é obrigatório"}));

        let (status, body) = post(&h.app, "/create-game", json!({"game_name": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "game_name é obrigatório"}));

        let (status, body) = send(&h.app, "POST", "/register-card", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "player_id é obrigatório"}));

        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn register_card_then_get_card_returns_same_numbers() {
        let h = harness(BackendMode::Rest);
        let card = json!([3, 8, 19, 44, 67]);

        let (status, body) = post(
            &h.app,
            "/register-card",
            json!({"player_id": "p9", "card_numbers": card}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, body) = post(&h.app, "/get-card", json!({"player_id": "p9"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"card": card}));

        let (_, body) = send(&h.app, "GET", "/get-card?player_id=p9", None).await;
        assert_eq!(body, json!({"card": card}));
    }

    #[tokio::test]
    async fn unavailable_upstream_is_bad_gateway_for_every_operation() {
        for op in Operation::ALL {
            let h = harness(BackendMode::Grpc);
            h.backend.inject(Fault::Unavailable);

            let (status, body) = post(&h.app, op.path(), valid_body(op)).await;
            assert_eq!(status, StatusCode::BAD_GATEWAY, "{}", op.name());
            assert_eq!(body["error"], "Bad gateway", "{}", op.name());
            assert!(
                body["detail"].as_str().is_some_and(|d| !d.is_empty()),
                "{}",
                op.name()
            );
            assert_eq!(h.metrics.upstream_errors("unavailable"), 1);
        }
    }

    #[tokio::test]
    async fn timeout_is_gateway_timeout() {
        let h = harness(BackendMode::Grpc);
        h.backend.inject(Fault::Timeout);

        let (status, body) = post(&h.app, "/draw-number", json!({"game_id": "g1"})).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body, json!({"error": "Bad gateway", "detail": "timeout"}));
        assert_eq!(h.backend.calls(), 1);
    }

    #[tokio::test]
    async fn application_error_keeps_per_operation_shape() {
        let h = harness(BackendMode::Grpc);
        h.backend.inject(Fault::Application("Jogo não encontrado".to_string()));

        let cases = [
            ("/create-game", Operation::CreateGame, json!({"error": "Jogo não encontrado"})),
            (
                "/draw-number",
                Operation::DrawNumber,
                json!({"success": false, "error": "Jogo não encontrado"}),
            ),
            (
                "/check-bingo",
                Operation::CheckBingo,
                json!({"bingo": false, "error": "Jogo não encontrado"}),
            ),
            (
                "/validate-bingo",
                Operation::ValidateBingo,
                json!({"bingo": false, "error": "Jogo não encontrado"}),
            ),
        ];
        for (uri, op, expected) in cases {
            let (status, body) = post(&h.app, uri, valid_body(op)).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(body, expected, "{uri}");
        }
        assert_eq!(h.metrics.upstream_errors("application"), 4);
        assert_eq!(h.metrics.games_created(), 0);
    }

    #[tokio::test]
    async fn full_game_round() {
        let h = harness(BackendMode::Grpc);

        let (_, body) = post(&h.app, "/create-game", json!({"game_name": "Bingo"})).await;
        assert_eq!(body, json!({"game_id": "g1"}));

        let (_, body) = post(
            &h.app,
            "/register-player",
            json!({"game_id": "g1", "player_name": "Ana"}),
        )
        .await;
        assert_eq!(body["player_id"], "p1");
        assert_eq!(body["success"], true);
        let card: Vec<i64> = body["card"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n.as_i64().unwrap())
            .collect();
        assert_eq!(card, vec![1, 2, 3, 4, 5]);

        for expected in 1..=5 {
            let (status, body) = post(&h.app, "/draw-number", json!({"game_id": "g1"})).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"number": expected, "success": true}));

            let (_, bingo) = post(
                &h.app,
                "/check-bingo",
                json!({"game_id": "g1", "player_id": "p1"}),
            )
            .await;
            assert_eq!(bingo, json!({"bingo": false}));

            let (_, marked) = post(
                &h.app,
                "/mark-number",
                json!({"game_id": "g1", "player_id": "p1", "number": expected}),
            )
            .await;
            assert_eq!(marked, json!({"success": true}));
        }

        let (_, off_card) = post(
            &h.app,
            "/mark-number",
            json!({"game_id": "g1", "player_id": "p1", "number": 42}),
        )
        .await;
        assert_eq!(off_card, json!({"success": false}));

        let (_, bingo) = send(&h.app, "GET", "/check-bingo?game_id=g1&player_id=p1", None).await;
        assert_eq!(bingo, json!({"bingo": true}));
    }

    #[tokio::test]
    async fn legacy_paths_behave_like_canonical_paths() {
        let bodies = |op: Operation| vec![Some(valid_body(op)), Some(json!({})), None];

        for (legacy, canonical) in crate::alias::ALIASES {
            let Some(op) = Operation::ALL.into_iter().find(|op| op.path() == *canonical) else {
                let legacy_app = harness(BackendMode::Grpc);
                let canonical_app = harness(BackendMode::Grpc);
                assert_eq!(
                    send(&legacy_app.app, "GET", legacy, None).await,
                    send(&canonical_app.app, "GET", canonical, None).await,
                );
                continue;
            };

            for body in bodies(op) {
                let legacy_app = seeded(BackendMode::Grpc).await;
                let canonical_app = seeded(BackendMode::Grpc).await;
                let from_legacy = send(&legacy_app.app, "POST", legacy, body.clone()).await;
                let from_canonical = send(&canonical_app.app, "POST", canonical, body).await;
                assert_eq!(from_legacy, from_canonical, "{legacy} vs {canonical}");
            }
        }

        let h = seeded(BackendMode::Grpc).await;
        let (status, body) = send(&h.app, "GET", "/game/bingo?game_id=g1&player_id=p1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"bingo": false}));
        assert_eq!(
            h.metrics.requests_total("GET", "/check-bingo", "200"),
            1,
            "legacy requests are recorded under the canonical route"
        );
    }

    #[tokio::test]
    async fn draw_counter_tracks_successful_draws() {
        let h = seeded(BackendMode::Rest).await;
        let n = 7;
        for _ in 0..n {
            post(&h.app, "/draw-number", json!({"game_id": "g1"})).await;
        }
        let (_, body) = post(&h.app, "/draw-number", json!({"game_id": "nope"})).await;
        assert_eq!(body["success"], false);
        assert_eq!(h.metrics.numbers_drawn(), n);

        let response = h
            .app
            .clone()
            .oneshot(axum::http::Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(text.to_vec()).unwrap();
        assert!(text.contains("bingo_gateway_numbers_drawn_total 7"));
        assert!(text.contains("route=\"/draw-number\""));

        post(&h.app, "/draw-number", json!({"game_id": "g1"})).await;
        assert_eq!(h.metrics.numbers_drawn(), n + 1);
    }

    #[tokio::test]
    async fn player_counter_tracks_successful_registrations() {
        let h = seeded(BackendMode::Grpc).await;
        assert_eq!(h.metrics.players_registered(), 0);

        let (status, body) = post(
            &h.app,
            "/register-player",
            json!({"game_id": "g1", "player_name": "Bia"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(h.metrics.players_registered(), 1);

        let (status, body) = post(
            &h.app,
            "/game/register",
            json!({"game_id": "g1", "player_name": "Caio"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(h.metrics.players_registered(), 2);

        let (status, body) = post(
            &h.app,
            "/register-player",
            json!({"game_id": "nope", "player_name": "Duda"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(h.metrics.players_registered(), 2);
    }

    #[tokio::test]
    async fn oversized_body_is_payload_too_large() {
        let h = harness(BackendMode::Grpc);
        let response = h
            .app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/register-card")
                    .body(Body::from(vec![b' '; 3 * 1024 * 1024]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn health_reports_each_upstream_independently() {
        let h = harness(BackendMode::Grpc);
        h.backend.set_down(Upstream::Validation);

        let (status, body) = send(&h.app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"gateway": "ok", "serviceA": "ok", "serviceB": "down"})
        );

        h.backend.set_hanging(Upstream::Game);
        let (status, body) = send(&h.app, "GET", "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"gateway": "ok", "serviceA": "down", "serviceB": "down"})
        );
        assert_eq!(h.backend.calls(), 0);
    }

    #[tokio::test]
    async fn mark_number_game_id_depends_on_generation() {
        let body = json!({"player_id": "p1", "number": 1});

        let grpc = seeded(BackendMode::Grpc).await;
        let (status, reply) = post(&grpc.app, "/mark-number", body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply, json!({"error": "game_id é obrigatório"}));

        let rest = seeded(BackendMode::Rest).await;
        let (status, reply) = post(&rest.app, "/mark-number", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply, json!({"success": true}));

        let (status, reply) = post(&rest.app, "/mark-number", json!({"player_id": "p1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply, json!({"error": "number é obrigatório"}));
    }

    #[tokio::test]
    async fn unrouted_requests_still_answer_json() {
        let h = harness(BackendMode::Grpc);

        let (status, body) = send(&h.app, "GET", "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Endpoint not found"}));
        assert_eq!(h.metrics.requests_total("GET", "<unmatched>", "404"), 1);

        let (status, body) = send(&h.app, "GET", "/create-game", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"error": "Method not allowed"}));

        let response = h
            .app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/draw-number")
                    .body(Body::from("{\"game_id\":"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("JSON inválido"));
        assert_eq!(h.backend.calls(), 0);
    }
}
