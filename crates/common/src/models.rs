//! 网关对外暴露的请求/响应结构
//!
//! 请求结构的字段全部是 `Option`：字段是否存在由路由层逐一检查，
//! 缺失时返回 `MissingField`，而不是让反序列化直接失败。

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};

/// 上游业务错误时响应体采用的约定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureConvention {
    /// `{ "error": msg }`
    Plain,
    /// `{ <flag>: false, "error": msg }`，与该操作成功时的布尔结果同形
    Flag(&'static str),
}

/// 网关对外提供的规范操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateGame,
    RegisterPlayer,
    DrawNumber,
    MarkNumber,
    CheckBingo,
    GetCard,
    RegisterCard,
    ValidateNumber,
    ValidateBingo,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::CreateGame,
        Operation::RegisterPlayer,
        Operation::DrawNumber,
        Operation::MarkNumber,
        Operation::CheckBingo,
        Operation::GetCard,
        Operation::RegisterCard,
        Operation::ValidateNumber,
        Operation::ValidateBingo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CreateGame => "create_game",
            Self::RegisterPlayer => "register_player",
            Self::DrawNumber => "draw_number",
            Self::MarkNumber => "mark_number",
            Self::CheckBingo => "check_bingo",
            Self::GetCard => "get_card",
            Self::RegisterCard => "register_card",
            Self::ValidateNumber => "validate_number",
            Self::ValidateBingo => "validate_bingo",
        }
    }

    /// 规范路由
    pub fn path(self) -> &'static str {
        match self {
            Self::CreateGame => "/create-game",
            Self::RegisterPlayer => "/register-player",
            Self::DrawNumber => "/draw-number",
            Self::MarkNumber => "/mark-number",
            Self::CheckBingo => "/check-bingo",
            Self::GetCard => "/get-card",
            Self::RegisterCard => "/register-card",
            Self::ValidateNumber => "/validate-number",
            Self::ValidateBingo => "/validate-bingo",
        }
    }

    /// 约定按操作固定，不随具体失败变化
    pub fn failure_convention(self) -> FailureConvention {
        match self {
            Self::CreateGame | Self::RegisterPlayer | Self::GetCard => FailureConvention::Plain,
            Self::DrawNumber | Self::MarkNumber | Self::RegisterCard | Self::ValidateNumber => {
                FailureConvention::Flag("success")
            }
            Self::CheckBingo | Self::ValidateBingo => FailureConvention::Flag("bingo"),
        }
    }
}

// ============ 请求 ============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateGameRequest {
    pub game_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterPlayerRequest {
    pub game_id: Option<String>,
    pub player_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrawNumberRequest {
    pub game_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkNumberRequest {
    pub game_id: Option<String>,
    pub player_id: Option<String>,
    pub number: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckBingoRequest {
    pub game_id: Option<String>,
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetCardRequest {
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterCardRequest {
    pub player_id: Option<String>,
    /// 新旧两代客户端分别使用 `card_numbers` 与 `card`
    #[serde(alias = "card")]
    pub card_numbers: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateNumberRequest {
    pub player_id: Option<String>,
    pub number: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateBingoRequest {
    pub player_id: Option<String>,
    pub numbers: Option<Vec<i32>>,
}

// ============ 规范响应 ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameReply {
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPlayerReply {
    pub player_id: String,
    pub card: Vec<i32>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawNumberReply {
    pub number: i32,
    pub success: bool,
}

/// MarkNumber / RegisterCard / ValidateNumber 共用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessReply {
    pub success: bool,
}

/// CheckBingo / ValidateBingo 共用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BingoReply {
    pub bingo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardReply {
    pub card: Vec<i32>,
}

// ============ 字段检查 ============

/// 空字符串与缺失等价
pub fn require_text<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str> {
    match value.as_deref() {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(GatewayError::missing(field)),
    }
}

pub fn require<T: Clone>(value: &Option<T>, field: &'static str) -> Result<T> {
    value.clone().ok_or_else(|| GatewayError::missing(field))
}
