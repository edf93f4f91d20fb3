use super::{GameBackend, Upstream, with_scheme};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bingo_common::models::{
    BingoReply, CardReply, CreateGameReply, DrawNumberReply, RegisterPlayerReply, SuccessReply,
};
use bingo_common::{BackendMode, GatewayError, Outcome};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::debug;

/// HTTP 转发适配器：共用一个带连接池的 reqwest 客户端
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    game_base: Url,
    validation_base: Url,
}

// 上游 REST 服务的原生响应，字段可能缺失或为 null
#[derive(Debug, Deserialize)]
struct UpstreamRegisterPlayer {
    player_id: Option<String>,
    #[serde(alias = "card")]
    card_numbers: Option<Vec<i32>>,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct UpstreamDrawNumber {
    number: Option<i32>,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct UpstreamCard {
    #[serde(default, alias = "card")]
    card_numbers: Vec<i32>,
}

#[derive(Debug, Deserialize)]
struct UpstreamHealth {
    status: Option<String>,
}

impl RestBackend {
    pub fn new(game_base: &str, validation_base: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("failed to build upstream http client")?;
        Ok(Self {
            client,
            game_base: parse_base(game_base)?,
            validation_base: parse_base(validation_base)?,
        })
    }

    fn base(&self, upstream: Upstream) -> &Url {
        match upstream {
            Upstream::Game => &self.game_base,
            Upstream::Validation => &self.validation_base,
        }
    }

    /// 追加路径段，每段单独做百分号编码
    fn url(&self, upstream: Upstream, segments: &[&str]) -> Outcome<Url> {
        let mut url = self.base(upstream).clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("upstream base {} cannot carry a path", self.base(upstream)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// 2xx 解码为上游原生结构；非 2xx 原样透传；连接失败 → 不可达
    async fn forward<T: DeserializeOwned>(&self, request: RequestBuilder) -> Outcome<T> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "upstream replied with non-success status");
            return Err(GatewayError::from_upstream_reply(status.as_u16(), &body));
        }

        serde_json::from_slice(&body)
            .map_err(|err| GatewayError::upstream(format!("invalid upstream response: {err}")))
    }
}

fn parse_base(base: &str) -> Result<Url> {
    let url = Url::parse(&with_scheme(base))
        .with_context(|| format!("invalid upstream address {base}"))?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("invalid upstream address {base}"));
    }
    Ok(url)
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::unavailable(err.to_string())
    }
}

#[async_trait]
impl GameBackend for RestBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Rest
    }

    async fn create_game(&self, game_name: &str) -> Outcome<CreateGameReply> {
        let url = self.url(Upstream::Game, &["games"])?;
        self.forward(self.client.post(url).json(&json!({ "game_name": game_name })))
            .await
    }

    async fn register_player(
        &self,
        game_id: &str,
        player_name: &str,
    ) -> Outcome<RegisterPlayerReply> {
        let url = self.url(Upstream::Game, &["games", game_id, "players"])?;
        let reply: UpstreamRegisterPlayer = self
            .forward(self.client.post(url).json(&json!({ "player_name": player_name })))
            .await?;
        Ok(RegisterPlayerReply {
            player_id: reply.player_id.unwrap_or_default(),
            card: reply.card_numbers.unwrap_or_default(),
            success: reply.success,
        })
    }

    async fn draw_number(&self, game_id: &str) -> Outcome<DrawNumberReply> {
        let url = self.url(Upstream::Game, &["games", game_id, "draw"])?;
        let reply: UpstreamDrawNumber = self
            .forward(self.client.post(url).json(&json!({})))
            .await?;
        Ok(DrawNumberReply {
            number: reply.number.unwrap_or_default(),
            success: reply.success,
        })
    }

    async fn mark_number(
        &self,
        _game_id: Option<&str>,
        player_id: &str,
        number: i32,
    ) -> Outcome<SuccessReply> {
        let url = self.url(Upstream::Game, &["players", player_id, "mark"])?;
        self.forward(self.client.post(url).json(&json!({ "number": number })))
            .await
    }

    async fn check_bingo(&self, game_id: &str, player_id: &str) -> Outcome<BingoReply> {
        let mut url = self.url(Upstream::Game, &["games", game_id, "bingo"])?;
        url.query_pairs_mut().append_pair("player_id", player_id);
        self.forward(self.client.get(url)).await
    }

    async fn get_card(&self, player_id: &str) -> Outcome<CardReply> {
        let url = self.url(Upstream::Validation, &["card", player_id])?;
        let reply: UpstreamCard = self.forward(self.client.get(url)).await?;
        Ok(CardReply {
            card: reply.card_numbers,
        })
    }

    async fn register_card(&self, player_id: &str, card_numbers: &[i32]) -> Outcome<SuccessReply> {
        let url = self.url(Upstream::Validation, &["register-card"])?;
        let payload = json!({ "player_id": player_id, "card_numbers": card_numbers });
        self.forward(self.client.post(url).json(&payload)).await
    }

    async fn validate_number(&self, player_id: &str, number: i32) -> Outcome<SuccessReply> {
        let url = self.url(Upstream::Validation, &["validate-number"])?;
        let payload = json!({ "player_id": player_id, "number": number });
        self.forward(self.client.post(url).json(&payload)).await
    }

    async fn validate_bingo(&self, player_id: &str, numbers: &[i32]) -> Outcome<BingoReply> {
        let url = self.url(Upstream::Validation, &["validate-bingo"])?;
        let payload = json!({ "player_id": player_id, "numbers": numbers });
        self.forward(self.client.post(url).json(&payload)).await
    }

    async fn probe(&self, upstream: Upstream) -> Outcome<String> {
        let url = self.url(upstream, &["healthz"])?;
        let body: JsonValue = self.forward(self.client.get(url)).await?;
        let status = serde_json::from_value::<UpstreamHealth>(body)
            .ok()
            .and_then(|health| health.status)
            .unwrap_or_else(|| "ok".to_string());
        Ok(status)
    }
}
