use super::proto as pb;
use super::{GameBackend, Upstream, with_scheme};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bingo_common::models::{
    BingoReply, CardReply, CreateGameReply, DrawNumberReply, RegisterPlayerReply, SuccessReply,
};
use bingo_common::{BackendMode, GatewayError, Outcome};
use std::time::Duration;
use tonic::client::Grpc;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tonic_prost::ProstCodec;
use tracing::debug;

/// 二进制 RPC 适配器：两条进程级 channel，启动时创建、所有请求复用
#[derive(Clone)]
pub struct GrpcBackend {
    game: Channel,
    validation: Channel,
    game_addr: String,
    validation_addr: String,
    timeout: Duration,
}

impl GrpcBackend {
    pub fn new(game_base: &str, validation_base: &str, timeout: Duration) -> Result<Self> {
        let (game, game_addr) = lazy_channel(game_base, timeout)?;
        let (validation, validation_addr) = lazy_channel(validation_base, timeout)?;
        Ok(Self {
            game,
            validation,
            game_addr,
            validation_addr,
            timeout,
        })
    }

    async fn unary<Req, Resp>(
        &self,
        channel: &Channel,
        path: &'static str,
        request: Req,
    ) -> Outcome<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let call = async {
            let mut grpc = Grpc::new(channel.clone());
            grpc.ready()
                .await
                .map_err(|err| Status::unavailable(format!("service was not ready: {err}")))?;
            let codec: ProstCodec<Req, Resp> = ProstCodec::default();
            let response = grpc
                .unary(
                    tonic::Request::new(request),
                    PathAndQuery::from_static(path),
                    codec,
                )
                .await?;
            Ok::<_, Status>(response.into_inner())
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(status)) => {
                debug!(rpc = path, code = ?status.code(), "rpc failed: {}", status.message());
                Err(status_to_error(&status))
            }
            Err(_) => Err(GatewayError::Timeout),
        }
    }
}

fn lazy_channel(base: &str, timeout: Duration) -> Result<(Channel, String)> {
    let uri = with_scheme(base);
    let endpoint = Endpoint::from_shared(uri.clone())
        .with_context(|| format!("invalid upstream address {base}"))?
        .connect_timeout(timeout)
        .timeout(timeout)
        .tcp_keepalive(Some(Duration::from_secs(30)));

    let host = endpoint
        .uri()
        .host()
        .ok_or_else(|| anyhow!("upstream address {base} has no host"))?;
    let port = endpoint.uri().port_u16().unwrap_or(80);
    let probe_addr = format!("{host}:{port}");

    Ok((endpoint.connect_lazy(), probe_addr))
}

/// 传输层故障 → 不可达 / 超时；被调方返回的其他状态 → 业务错误
fn status_to_error(status: &Status) -> GatewayError {
    match status.code() {
        Code::Unavailable => GatewayError::unavailable(status.message()),
        Code::DeadlineExceeded | Code::Cancelled => GatewayError::Timeout,
        _ if caused_by_transport(status) => GatewayError::unavailable(status.message()),
        code => {
            if status.message().is_empty() {
                GatewayError::upstream(code.description())
            } else {
                GatewayError::upstream(status.message())
            }
        }
    }
}

fn caused_by_transport(status: &Status) -> bool {
    let mut source = std::error::Error::source(status);
    while let Some(err) = source {
        if err.is::<tonic::transport::Error>() || err.is::<std::io::Error>() {
            return true;
        }
        source = err.source();
    }
    false
}

#[async_trait]
impl GameBackend for GrpcBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Grpc
    }

    async fn create_game(&self, game_name: &str) -> Outcome<CreateGameReply> {
        let request = pb::CreateGameRequest {
            game_name: game_name.to_string(),
        };
        let reply: pb::CreateGameResponse =
            self.unary(&self.game, pb::CREATE_GAME, request).await?;
        Ok(CreateGameReply {
            game_id: reply.game_id,
        })
    }

    async fn register_player(
        &self,
        game_id: &str,
        player_name: &str,
    ) -> Outcome<RegisterPlayerReply> {
        let request = pb::RegisterPlayerRequest {
            game_id: game_id.to_string(),
            player_name: player_name.to_string(),
        };
        let reply: pb::RegisterPlayerResponse =
            self.unary(&self.game, pb::REGISTER_PLAYER, request).await?;
        Ok(RegisterPlayerReply {
            player_id: reply.player_id,
            card: reply.card_numbers,
            success: reply.success,
        })
    }

    async fn draw_number(&self, game_id: &str) -> Outcome<DrawNumberReply> {
        let request = pb::DrawNumberRequest {
            game_id: game_id.to_string(),
        };
        let reply: pb::DrawNumberResponse =
            self.unary(&self.game, pb::DRAW_NUMBER, request).await?;
        Ok(DrawNumberReply {
            number: reply.number,
            success: reply.success,
        })
    }

    async fn mark_number(
        &self,
        game_id: Option<&str>,
        player_id: &str,
        number: i32,
    ) -> Outcome<SuccessReply> {
        let request = pb::MarkNumberRequest {
            game_id: game_id.unwrap_or_default().to_string(),
            player_id: player_id.to_string(),
            number,
        };
        let reply: pb::MarkNumberResponse =
            self.unary(&self.game, pb::MARK_NUMBER, request).await?;
        Ok(SuccessReply {
            success: reply.success,
        })
    }

    async fn check_bingo(&self, game_id: &str, player_id: &str) -> Outcome<BingoReply> {
        let request = pb::CheckBingoRequest {
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
        };
        let reply: pb::CheckBingoResponse =
            self.unary(&self.game, pb::CHECK_BINGO, request).await?;
        Ok(BingoReply { bingo: reply.bingo })
    }

    async fn get_card(&self, player_id: &str) -> Outcome<CardReply> {
        let request = pb::GetCardRequest {
            player_id: player_id.to_string(),
        };
        let reply: pb::GetCardResponse =
            self.unary(&self.validation, pb::GET_CARD, request).await?;
        Ok(CardReply {
            card: reply.card_numbers,
        })
    }

    async fn register_card(&self, player_id: &str, card_numbers: &[i32]) -> Outcome<SuccessReply> {
        let request = pb::RegisterCardRequest {
            player_id: player_id.to_string(),
            card_numbers: card_numbers.to_vec(),
        };
        let reply: pb::RegisterCardResponse =
            self.unary(&self.validation, pb::REGISTER_CARD, request).await?;
        Ok(SuccessReply {
            success: reply.success,
        })
    }

    async fn validate_number(&self, player_id: &str, number: i32) -> Outcome<SuccessReply> {
        let request = pb::ValidateNumberRequest {
            player_id: player_id.to_string(),
            number,
        };
        let reply: pb::ValidateNumberResponse =
            self.unary(&self.validation, pb::VALIDATE_NUMBER, request).await?;
        Ok(SuccessReply {
            success: reply.success,
        })
    }

    async fn validate_bingo(&self, player_id: &str, numbers: &[i32]) -> Outcome<BingoReply> {
        let request = pb::ValidateBingoRequest {
            player_id: player_id.to_string(),
            numbers: numbers.to_vec(),
        };
        let reply: pb::ValidateBingoResponse =
            self.unary(&self.validation, pb::VALIDATE_BINGO, request).await?;
        Ok(BingoReply { bingo: reply.bingo })
    }

    // 上游未实现 gRPC 健康检查服务，退化为 TCP 连通性探测
    async fn probe(&self, upstream: Upstream) -> Outcome<String> {
        let address = match upstream {
            Upstream::Game => &self.game_addr,
            Upstream::Validation => &self.validation_addr,
        };
        crate::health::check_tcp(address, self.timeout)
            .await
            .map(|()| "ok".to_string())
    }
}
