use axum::extract::{FromRequest, Query, Request};
use axum::http::Method;
use bingo_common::GatewayError;
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// 操作入参：GET 取 query string，其他方法取 JSON body
///
/// 空 body 解码为全字段缺失的请求，交给 handler 报告具体缺哪个字段。
#[derive(Debug, Clone, Default)]
pub struct Input<T>(pub T);

impl<S, T> FromRequest<S> for Input<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if req.method() == Method::GET {
            let Query(value) = Query::<T>::try_from_uri(req.uri())
                .map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;
            return Ok(Self(value));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| GatewayError::Rejected {
                status: rejection.status().as_u16(),
                message: rejection.body_text(),
            })?;
        decode_json(&body).map(Self)
    }
}

fn decode_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::BadRequest(format!("JSON inválido: {e}")))
}
