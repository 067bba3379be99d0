//! 遊戲生命週期事件
//!
//! 事件只是 fire-and-forget：發佈失敗記 log，不重試。

use crate::game::{AppliedMove, Game, GameId, Seat};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// 事件發佈錯誤
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write event: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    GameStart,
    Move,
    GameEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveData {
    pub player_num: u8,
    pub column: usize,
    pub move_num: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    /// 0 = 平手，1 / 2 = 座位
    pub winner: u8,
    pub total_moves: u32,
    pub duration_secs: u64,
}

/// 送往分析管線的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub event_type: LifecycleKind,
    pub game_id: GameId,
    /// Unix epoch 毫秒
    pub timestamp: u64,
    pub player1: String,
    pub player2: String,
    pub player2_is_bot: bool,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub move_data: Option<MoveData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
}

impl LifecycleEvent {
    fn base(kind: LifecycleKind, game: &Game) -> Self {
        Self {
            event_type: kind,
            game_id: game.id.clone(),
            timestamp: now_millis(),
            player1: game.username(Seat::A).to_string(),
            player2: game.username(Seat::B).to_string(),
            player2_is_bot: game.is_bot(Seat::B),
            move_data: None,
            result: None,
        }
    }

    pub fn game_start(game: &Game) -> Self {
        Self::base(LifecycleKind::GameStart, game)
    }

    pub fn moved(game: &Game, applied: &AppliedMove) -> Self {
        Self {
            move_data: Some(MoveData {
                player_num: applied.seat.number(),
                column: applied.column,
                move_num: applied.move_number,
            }),
            ..Self::base(LifecycleKind::Move, game)
        }
    }

    pub fn game_end(game: &Game) -> Self {
        Self {
            result: Some(GameResult {
                winner: game.winner.number(),
                total_moves: game.move_count,
                duration_secs: game.duration().as_secs(),
            }),
            ..Self::base(LifecycleKind::GameEnd, game)
        }
    }
}

/// 事件輸出端
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError>;
}

/// 以 JSON 寫進 log
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError> {
        info!("[EVENT] {}", serde_json::to_string(event)?);
        Ok(())
    }
}

/// 以 NDJSON 附加到檔案
#[derive(Debug)]
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileSink {
    fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

/// 測試用：收集所有事件
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LifecycleEvent>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<LifecycleKind> {
        self.events().iter().map(|e| e.event_type).collect()
    }
}

#[cfg(test)]
impl EventSink for MemorySink {
    fn publish(&self, event: &LifecycleEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
