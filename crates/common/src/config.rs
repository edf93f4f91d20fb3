use anyhow::{Result, anyhow};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 当前部署所对接的后端协议代际
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// 二进制 RPC（gRPC）后端
    Grpc,
    /// 纯 REST 后端，网关只做 HTTP 转发
    Rest,
}

impl FromStr for BackendMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "grpc" | "rpc" => Ok(Self::Grpc),
            "rest" | "http" => Ok(Self::Rest),
            other => Err(anyhow!(
                "BACKEND_MODE must be one of grpc, rest (got {})",
                other
            )),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grpc => f.write_str("grpc"),
            Self::Rest => f.write_str("rest"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_mode: BackendMode,
    pub game_base: String,
    pub validation_base: String,
    pub port: u16,
    pub upstream_timeout_ms: u64,
    pub health_check_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        // Load .env early so process env reads pick it up.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_mode = match lookup("BACKEND_MODE") {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => BackendMode::Grpc,
        };

        let game_base = non_empty(lookup("GAME_BASE"))
            .unwrap_or_else(|| "http://game-server-service:50051".to_string());
        let validation_base = non_empty(lookup("VALIDATION_BASE"))
            .unwrap_or_else(|| "http://validation-server-service:50052".to_string());

        let port = parse_or(lookup("PORT"), 8080u16);
        let upstream_timeout_ms = parse_or(lookup("UPSTREAM_TIMEOUT_MS"), 5000u64);
        let health_check_timeout_ms = parse_or(lookup("HEALTH_CHECK_TIMEOUT_MS"), 800u64);

        Ok(Self {
            backend_mode,
            game_base,
            validation_base,
            port,
            upstream_timeout_ms,
            health_check_timeout_ms,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms.max(1))
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms.max(50))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
