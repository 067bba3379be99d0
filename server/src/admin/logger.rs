//! Admin Logger - 遊戲事件記錄器
//!
//! 使用 Ring Buffer 儲存最近的遊戲事件，供管理介面查詢。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// 預設保留的訊息數量
const DEFAULT_CAPACITY: usize = 500;

/// 事件類型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    PlayerJoin,
    PlayerLeave,
    PlayerReconnect,
    GameStart,
    Move,
    GameEnd,
    Forfeit,
    AdminAction,
    Error,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::PlayerJoin,
        EventType::PlayerLeave,
        EventType::PlayerReconnect,
        EventType::GameStart,
        EventType::Move,
        EventType::GameEnd,
        EventType::Forfeit,
        EventType::AdminAction,
        EventType::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PlayerJoin => "PLAYER_JOIN",
            EventType::PlayerLeave => "PLAYER_LEAVE",
            EventType::PlayerReconnect => "PLAYER_RECONNECT",
            EventType::GameStart => "GAME_START",
            EventType::Move => "MOVE",
            EventType::GameEnd => "GAME_END",
            EventType::Forfeit => "FORFEIT",
            EventType::AdminAction => "ADMIN",
            EventType::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.to_uppercase();
        Self::ALL.into_iter().find(|t| t.as_str() == upper)
    }
}

/// 日誌條目
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Unix epoch 秒
    pub timestamp: u64,
    pub event_type: EventType,
    pub message: String,
}

impl LogEntry {
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            timestamp,
            event_type,
            message: message.into(),
        }
    }

    /// 格式化為顯示字串
    pub fn format(&self) -> String {
        format!(
            "[{} UTC] {}: {}",
            format_time_of_day(self.timestamp),
            self.event_type.as_str(),
            self.message
        )
    }
}

/// 只顯示當日時間 (HH:MM:SS)，ring buffer 的內容不會跨太久
fn format_time_of_day(timestamp: u64) -> String {
    let secs = timestamp % 86400;
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

/// 日誌管理器 (線程安全)
#[derive(Clone)]
pub struct GameLogger {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl GameLogger {
    /// 建立新的日誌管理器
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// 建立指定容量的日誌管理器
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// 記錄事件
    pub fn log(&self, event_type: EventType, message: impl Into<String>) {
        let entry = LogEntry::new(event_type, message);

        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// 取得最近 n 條日誌
    pub fn get_recent(&self, n: usize) -> Vec<LogEntry> {
        if let Ok(entries) = self.entries.lock() {
            let start = entries.len().saturating_sub(n);
            entries.iter().skip(start).cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// 取得最近 n 條指定類型的日誌
    pub fn get_recent_by_type(&self, n: usize, event_type: EventType) -> Vec<LogEntry> {
        if let Ok(entries) = self.entries.lock() {
            entries
                .iter()
                .filter(|e| e.event_type == event_type)
                .rev()
                .take(n)
                .cloned()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect()
        } else {
            Vec::new()
        }
    }

    /// 取得日誌總數
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GameLogger {
    fn default() -> Self {
        Self::new()
    }
}

// === 便捷記錄函數 ===

impl GameLogger {
    pub fn player_join(&self, username: &str) {
        self.log(EventType::PlayerJoin, format!("{} joined the queue", username));
    }

    pub fn player_leave(&self, username: &str, game_id: Option<&str>) {
        let message = match game_id {
            Some(id) => format!("{} disconnected from {}", username, id),
            None => format!("{} left the queue", username),
        };
        self.log(EventType::PlayerLeave, message);
    }

    pub fn player_reconnect(&self, username: &str, game_id: &str) {
        self.log(
            EventType::PlayerReconnect,
            format!("{} reconnected to {}", username, game_id),
        );
    }

    pub fn game_start(&self, game_id: &str, player1: &str, player2: &str) {
        self.log(
            EventType::GameStart,
            format!("{} started: {} vs {}", game_id, player1, player2),
        );
    }

    pub fn moved(&self, game_id: &str, username: &str, column: usize, move_number: u32) {
        self.log(
            EventType::Move,
            format!(
                "{} #{}: {} drops in column {}",
                game_id, move_number, username, column
            ),
        );
    }

    pub fn game_end(&self, game_id: &str, result: &str, moves: u32) {
        self.log(
            EventType::GameEnd,
            format!("{} ended: {} after {} moves", game_id, result, moves),
        );
    }

    pub fn forfeit(&self, game_id: &str, loser: &str) {
        self.log(
            EventType::Forfeit,
            format!("{} forfeited by {} (disconnect timeout)", game_id, loser),
        );
    }

    pub fn admin_action(&self, action: &str, detail: &str) {
        self.log(EventType::AdminAction, format!("{}: {}", action, detail));
    }

    pub fn error(&self, message: &str) {
        self.log(EventType::Error, message.to_string());
    }
}
