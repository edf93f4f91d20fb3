//! 旧版网关路径兼容层
//!
//! 在路由匹配之前把旧路径改写为规范路径，method、headers、body 与
//! query string 保持不变，所以旧路径与规范路径走的是同一个 handler。

use axum::extract::Request;
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use tracing::debug;

/// (旧路径, 规范路径)
pub const ALIASES: &[(&str, &str)] = &[
    ("/game/create", "/create-game"),
    ("/game/register", "/register-player"),
    ("/game/draw", "/draw-number"),
    ("/game/mark", "/mark-number"),
    ("/game/bingo", "/check-bingo"),
    ("/game/card", "/get-card"),
    ("/healthz", "/health"),
];

pub fn canonical_path(path: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(legacy, _)| *legacy == path)
        .map(|(_, canonical)| *canonical)
}

pub fn rewrite_legacy_path(mut req: Request) -> Request {
    let Some(canonical) = canonical_path(req.uri().path()) else {
        return req;
    };

    let path_and_query = match req.uri().query() {
        Some(query) => format!("{canonical}?{query}"),
        None => canonical.to_string(),
    };
    let Ok(path_and_query) = PathAndQuery::try_from(path_and_query) else {
        return req;
    };

    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    match Uri::from_parts(parts) {
        Ok(uri) => {
            debug!(from = %req.uri().path(), to = canonical, "legacy path rewritten");
            *req.uri_mut() = uri;
        }
        Err(err) => debug!(error = %err, "failed to rewrite legacy path"),
    }
    req
}
