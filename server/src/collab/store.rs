//! 戰績儲存
//!
//! 核心只把完成的遊戲與勝負結果丟進來，讀取端 (排行榜、個人戰績)
//! 由管理介面使用。寫入失敗只記 log，不影響遊戲進行。

use crate::ai::BOT_USERNAME;
use crate::game::{Game, GameId, GameStatus, Seat, Winner};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// 儲存層錯誤
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("player not found: {0}")]
    NotFound(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// 單一玩家的結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

/// 完成的遊戲紀錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: GameId,
    pub player1: String,
    pub player2: String,
    pub player2_is_bot: bool,
    pub winner: Winner,
    pub status: GameStatus,
    pub started_at_ms: u64,
    pub ended_at_ms: Option<u64>,
    pub move_count: u32,
    pub duration_secs: u64,
}

impl GameRecord {
    pub fn from_game(game: &Game) -> Self {
        Self {
            id: game.id.clone(),
            player1: game.username(Seat::A).to_string(),
            player2: game.username(Seat::B).to_string(),
            player2_is_bot: game.is_bot(Seat::B),
            winner: game.winner,
            status: game.status,
            started_at_ms: epoch_millis(game.started_at),
            ended_at_ms: game.ended_at.map(epoch_millis),
            move_count: game.move_count,
            duration_secs: game.duration().as_secs(),
        }
    }
}

/// 累計戰績
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub username: String,
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub games_drawn: u32,
}

impl PlayerStats {
    fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            ..Self::default()
        }
    }

    /// 勝率 (0.0 ~ 1.0)
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            f64::from(self.games_won) / f64::from(self.games_played)
        }
    }

    fn record(&mut self, outcome: Outcome) {
        self.games_played += 1;
        match outcome {
            Outcome::Win => self.games_won += 1,
            Outcome::Loss => self.games_lost += 1,
            Outcome::Draw => self.games_drawn += 1,
        }
    }
}

/// 儲存層介面
pub trait GameStore: Send + Sync {
    /// 以 game id 為鍵的 upsert
    fn save_game(&self, record: &GameRecord) -> Result<(), StoreError>;

    fn update_stats(&self, username: &str, outcome: Outcome) -> Result<(), StoreError>;

    /// 依勝場、勝率、場數遞減排序，只含下過至少一場的真人
    fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerStats>, StoreError>;

    fn player_stats(&self, username: &str) -> Result<PlayerStats, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryTables {
    games: HashMap<GameId, GameRecord>,
    players: HashMap<String, PlayerStats>,
}

/// 行程內的儲存實作
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, MemoryTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 已存的遊戲紀錄
    pub fn game(&self, id: &str) -> Option<GameRecord> {
        self.tables().games.get(id).cloned()
    }

    pub fn game_count(&self) -> usize {
        self.tables().games.len()
    }
}

impl GameStore for MemoryStore {
    fn save_game(&self, record: &GameRecord) -> Result<(), StoreError> {
        self.tables().games.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn update_stats(&self, username: &str, outcome: Outcome) -> Result<(), StoreError> {
        self.tables()
            .players
            .entry(username.to_string())
            .or_insert_with(|| PlayerStats::new(username))
            .record(outcome);
        Ok(())
    }

    fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerStats>, StoreError> {
        let mut entries: Vec<PlayerStats> = self
            .tables()
            .players
            .values()
            .filter(|s| s.username != BOT_USERNAME && s.games_played > 0)
            .cloned()
            .collect();

        entries.sort_by(|a, b| {
            b.games_won
                .cmp(&a.games_won)
                .then_with(|| b.win_rate().total_cmp(&a.win_rate()))
                .then_with(|| b.games_played.cmp(&a.games_played))
                .then_with(|| a.username.cmp(&b.username))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    fn player_stats(&self, username: &str) -> Result<PlayerStats, StoreError> {
        self.tables()
            .players
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(username.to_string()))
    }
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
