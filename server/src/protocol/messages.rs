use crate::game::{GameId, GameStatus, Seat, Winner};
use serde::{Deserialize, Serialize};

/// 對外的遊戲狀態快照
///
/// `board` 由上而下逐列，0 = 空、1 = A、2 = B。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateView {
    pub board: Vec<Vec<u8>>,
    pub current_turn: u8,
    pub status: GameStatus,
    pub winner: Winner,
    pub move_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_name: Option<String>,
}

/// 客戶端到伺服器的訊息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// 加入配對
    #[serde(rename = "JOIN")]
    Join { username: String },

    /// 落子 (欄位先以有號整數接收，負數也要能回報錯誤而不是解析失敗)
    #[serde(rename = "MOVE")]
    Move { column: i64 },

    /// 斷線後重回原本的遊戲
    #[serde(rename = "RECONNECT")]
    Reconnect { username: String },

    /// Ping (用於測試)
    #[serde(rename = "PING")]
    Ping,
}

/// 伺服器到客戶端的訊息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// 已進入等待佇列
    #[serde(rename = "WAITING")]
    Waiting { message: String },

    /// 遊戲開始
    #[serde(rename = "GAME_START")]
    GameStart {
        game_id: GameId,
        seat: Seat,
        player_number: u8,
        opponent: String,
        opponent_is_bot: bool,
        state: GameStateView,
    },

    /// 每一步之後的狀態
    #[serde(rename = "GAME_UPDATE")]
    GameUpdate { game_id: GameId, state: GameStateView },

    /// 重連成功，附上完整狀態
    #[serde(rename = "RECONNECTED")]
    Reconnected {
        game_id: GameId,
        seat: Seat,
        player_number: u8,
        opponent: String,
        state: GameStateView,
    },

    /// 錯誤訊息
    #[serde(rename = "ERROR")]
    Error { message: String },

    /// Pong (用於測試)
    #[serde(rename = "PONG")]
    Pong,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
