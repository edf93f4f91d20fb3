//! Gateway 统一错误类型定义
//!
//! 适配器调用的结果统一为 `Outcome<T>`：`Ok` 即成功载荷，`Err` 为下列失败之一。
//! 所有失败最终都被规整为带状态码的 JSON 响应，不会出现空响应体。

use crate::models::FailureConvention;
use serde_json::{Map, Value as JsonValue, json};
use thiserror::Error;

/// Gateway 统一错误类型
#[derive(Error, Debug)]
pub enum GatewayError {
    /// 必填字段缺失 (400)
    #[error("{0} é obrigatório")]
    MissingField(&'static str),

    /// 请求体无法解析 (400)
    #[error("{0}")]
    BadRequest(String),

    /// 请求体被 HTTP 层拒绝（超长、读取失败等），沿用拒绝方给出的状态码
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// 路由不存在 (404)
    #[error("{0}")]
    NotFound(String),

    /// 路由存在但方法不匹配 (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// 上游不可达：连接拒绝、DNS、网络错误 (502)
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// 上游调用超时 (504)
    #[error("upstream timeout")]
    Timeout,

    /// 上游返回的业务错误，消息原样透传 (500)
    #[error("{0}")]
    Upstream(String),

    /// REST 转发模式下上游的非 2xx 响应，状态码与响应体原样透传
    #[error("upstream responded with status {status}")]
    UpstreamStatus { status: u16, body: JsonValue },

    /// 其他内部错误 (500)
    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// 创建字段缺失错误
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField(field)
    }

    /// 创建上游不可达错误，detail 永不为空
    pub fn unavailable(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if detail.trim().is_empty() {
            Self::UpstreamUnavailable("upstream unavailable".to_string())
        } else {
            Self::UpstreamUnavailable(detail)
        }
    }

    /// 创建上游业务错误
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// 根据上游原始响应构造透传错误；非 JSON 响应体包装为 `{error}`
    pub fn from_upstream_reply(status: u16, raw: &[u8]) -> Self {
        let body = match serde_json::from_slice::<JsonValue>(raw) {
            Ok(value) => value,
            Err(_) => {
                let text = String::from_utf8_lossy(raw).trim().to_string();
                if text.is_empty() {
                    json!({"error": format!("upstream responded with status {status}")})
                } else {
                    json!({"error": text})
                }
            }
        };
        Self::UpstreamStatus { status, body }
    }

    /// 判断是否为客户端错误（4xx），这类错误发生在任何上游调用之前
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::BadRequest(_)
                | Self::Rejected { .. }
                | Self::NotFound(_)
                | Self::MethodNotAllowed
        )
    }

    /// 获取 HTTP 状态码
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingField(_) | Self::BadRequest(_) => 400,
            Self::Rejected { status, .. } => *status,
            Self::NotFound(_) => 404,
            Self::MethodNotAllowed => 405,
            Self::UpstreamUnavailable(_) => 502,
            Self::Timeout => 504,
            Self::UpstreamStatus { status, .. } => *status,
            Self::Upstream(_) | Self::Internal(_) => 500,
        }
    }

    /// 上游错误分类，用于指标标签；客户端错误返回 None
    pub fn upstream_reason(&self) -> Option<&'static str> {
        match self {
            Self::UpstreamUnavailable(_) => Some("unavailable"),
            Self::Timeout => Some("timeout"),
            Self::Upstream(_) => Some("application"),
            Self::UpstreamStatus { .. } => Some("status"),
            _ => None,
        }
    }

    /// 按操作约定渲染 JSON 响应体
    pub fn body(&self, convention: FailureConvention) -> JsonValue {
        match self {
            Self::UpstreamUnavailable(detail) => json!({"error": "Bad gateway", "detail": detail}),
            Self::Timeout => json!({"error": "Bad gateway", "detail": "timeout"}),
            Self::UpstreamStatus { body, .. } => body.clone(),
            Self::Upstream(msg) => match convention {
                FailureConvention::Plain => json!({"error": msg}),
                FailureConvention::Flag(flag) => {
                    let mut body = Map::new();
                    body.insert(flag.to_string(), JsonValue::Bool(false));
                    body.insert("error".to_string(), JsonValue::String(msg.clone()));
                    JsonValue::Object(body)
                }
            },
            other => json!({"error": other.to_string()}),
        }
    }

    /// 获取 HTTP 状态码（axum 类型）
    #[cfg(feature = "http")]
    pub fn axum_status_code(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::from_u16(self.http_status_code())
            .unwrap_or(axum::http::StatusCode::BAD_GATEWAY)
    }
}

/// Gateway Result 类型别名
pub type Result<T> = std::result::Result<T, GatewayError>;

/// 适配器调用结果
pub type Outcome<T> = std::result::Result<T, GatewayError>;

// ============ Axum HTTP 响应支持 ============

#[cfg(feature = "http")]
mod axum_impl {
    use super::*;
    use axum::{
        Json,
        response::{IntoResponse, Response},
    };

    impl GatewayError {
        /// 记录结构化日志后按给定约定生成响应
        pub fn into_response_with(self, convention: FailureConvention) -> Response {
            let status = self.axum_status_code();

            match &self {
                // 客户端错误（4xx）- info 级别
                err if err.is_client_error() => {
                    tracing::info!(status = status.as_u16(), reason = %err, "Client request rejected");
                }
                // 上游不可达 / 超时 - warn 级别
                GatewayError::UpstreamUnavailable(detail) => {
                    tracing::warn!(status = status.as_u16(), detail = %detail, "Upstream unavailable");
                }
                GatewayError::Timeout => {
                    tracing::warn!(status = status.as_u16(), "Upstream call timed out");
                }
                GatewayError::UpstreamStatus { status: upstream, .. } => {
                    tracing::warn!(status = *upstream, "Passing upstream status through");
                }
                // 上游业务错误与内部错误 - error 级别
                GatewayError::Upstream(msg) => {
                    tracing::error!(status = status.as_u16(), upstream_error = %msg, "Upstream application error");
                }
                GatewayError::Internal(internal_err) => {
                    tracing::error!(
                        status = status.as_u16(),
                        internal_error = ?internal_err,
                        "Internal server error"
                    );
                }
                // 已由首个分支记录
                GatewayError::MissingField(_)
                | GatewayError::BadRequest(_)
                | GatewayError::Rejected { .. }
                | GatewayError::NotFound(_)
                | GatewayError::MethodNotAllowed => {}
            }

            let body = Json(self.body(convention));
            (status, body).into_response()
        }
    }

    /// 为 GatewayError 实现 Axum IntoResponse trait（普通约定）
    impl IntoResponse for GatewayError {
        fn into_response(self) -> Response {
            self.into_response_with(FailureConvention::Plain)
        }
    }
}
