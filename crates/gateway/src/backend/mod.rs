//! 后端适配器：把规范操作翻译为当前部署的上游协议调用
//!
//! 每个部署只激活一种实现，在启动时根据 `BACKEND_MODE` 选定，
//! 路由层只面向 [`GameBackend`]，不感知具体协议。

mod grpc;
mod proto;
mod rest;

pub use grpc::GrpcBackend;
pub use rest::RestBackend;

use anyhow::Result;
use async_trait::async_trait;
use bingo_common::models::{
    BingoReply, CardReply, CreateGameReply, DrawNumberReply, RegisterPlayerReply, SuccessReply,
};
use bingo_common::{AppConfig, BackendMode, Outcome};
use std::fmt;
use std::sync::Arc;

/// 网关依赖的两个上游服务
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    /// serviceA：游戏引擎
    Game,
    /// serviceB：校验引擎
    Validation,
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game => f.write_str("game"),
            Self::Validation => f.write_str("validation"),
        }
    }
}

/// 每次调用至多执行一次，适配器内部不做重试
#[async_trait]
pub trait GameBackend: Send + Sync {
    fn mode(&self) -> BackendMode;

    async fn create_game(&self, game_name: &str) -> Outcome<CreateGameReply>;

    async fn register_player(
        &self,
        game_id: &str,
        player_name: &str,
    ) -> Outcome<RegisterPlayerReply>;

    async fn draw_number(&self, game_id: &str) -> Outcome<DrawNumberReply>;

    /// `game_id` 只有 RPC 代际会携带
    async fn mark_number(
        &self,
        game_id: Option<&str>,
        player_id: &str,
        number: i32,
    ) -> Outcome<SuccessReply>;

    async fn check_bingo(&self, game_id: &str, player_id: &str) -> Outcome<BingoReply>;

    async fn get_card(&self, player_id: &str) -> Outcome<CardReply>;

    async fn register_card(&self, player_id: &str, card_numbers: &[i32]) -> Outcome<SuccessReply>;

    async fn validate_number(&self, player_id: &str, number: i32) -> Outcome<SuccessReply>;

    async fn validate_bingo(&self, player_id: &str, numbers: &[i32]) -> Outcome<BingoReply>;

    /// 探测上游健康状态，返回上游自报的状态字符串
    async fn probe(&self, upstream: Upstream) -> Outcome<String>;
}

pub fn build_backend(config: &AppConfig) -> Result<Arc<dyn GameBackend>> {
    let timeout = config.upstream_timeout();
    let backend: Arc<dyn GameBackend> = match config.backend_mode {
        BackendMode::Grpc => Arc::new(GrpcBackend::new(
            &config.game_base,
            &config.validation_base,
            timeout,
        )?),
        BackendMode::Rest => Arc::new(RestBackend::new(
            &config.game_base,
            &config.validation_base,
            timeout,
        )?),
    };
    Ok(backend)
}

/// 上游地址允许省略 scheme（如 `localhost:50051`）
fn with_scheme(base: &str) -> String {
    let base = base.trim();
    if base.contains("://") {
        base.to_string()
    } else {
        format!("http://{base}")
    }
}
