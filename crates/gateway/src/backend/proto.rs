//! `bingo` 包的 protobuf 消息（GameService / ValidationService）

pub const CREATE_GAME: &str = "/bingo.GameService/CreateGame";
pub const REGISTER_PLAYER: &str = "/bingo.GameService/RegisterPlayer";
pub const DRAW_NUMBER: &str = "/bingo.GameService/DrawNumber";
pub const MARK_NUMBER: &str = "/bingo.GameService/MarkNumber";
pub const CHECK_BINGO: &str = "/bingo.GameService/CheckBingo";

pub const REGISTER_CARD: &str = "/bingo.ValidationService/RegisterCard";
pub const VALIDATE_NUMBER: &str = "/bingo.ValidationService/ValidateNumber";
pub const VALIDATE_BINGO: &str = "/bingo.ValidationService/ValidateBingo";
pub const GET_CARD: &str = "/bingo.ValidationService/GetCard";

// ============ GameService ============

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateGameRequest {
    #[prost(string, tag = "1")]
    pub game_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateGameResponse {
    #[prost(string, tag = "1")]
    pub game_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterPlayerRequest {
    #[prost(string, tag = "1")]
    pub game_id: String,
    #[prost(string, tag = "2")]
    pub player_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterPlayerResponse {
    #[prost(string, tag = "1")]
    pub player_id: String,
    #[prost(int32, repeated, tag = "2")]
    pub card_numbers: Vec<i32>,
    #[prost(bool, tag = "3")]
    pub success: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DrawNumberRequest {
    #[prost(string, tag = "1")]
    pub game_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DrawNumberResponse {
    #[prost(int32, tag = "1")]
    pub number: i32,
    #[prost(bool, tag = "2")]
    pub success: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarkNumberRequest {
    #[prost(string, tag = "1")]
    pub game_id: String,
    #[prost(string, tag = "2")]
    pub player_id: String,
    #[prost(int32, tag = "3")]
    pub number: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarkNumberResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckBingoRequest {
    #[prost(string, tag = "1")]
    pub game_id: String,
    #[prost(string, tag = "2")]
    pub player_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CheckBingoResponse {
    #[prost(bool, tag = "1")]
    pub bingo: bool,
}

// ============ ValidationService ============

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterCardRequest {
    #[prost(string, tag = "1")]
    pub player_id: String,
    #[prost(int32, repeated, tag = "2")]
    pub card_numbers: Vec<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterCardResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateNumberRequest {
    #[prost(string, tag = "1")]
    pub player_id: String,
    #[prost(int32, tag = "2")]
    pub number: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateNumberResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateBingoRequest {
    #[prost(string, tag = "1")]
    pub player_id: String,
    #[prost(int32, repeated, tag = "2")]
    pub numbers: Vec<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateBingoResponse {
    #[prost(bool, tag = "1")]
    pub bingo: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetCardRequest {
    #[prost(string, tag = "1")]
    pub player_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetCardResponse {
    #[prost(int32, repeated, tag = "1")]
    pub card_numbers: Vec<i32>,
}
