//! AI 模組 - Server 內建 bot 對手
//!
//! - BotPlayer: 虛擬玩家 (不佔用 TCP 連線)
//! - MoveOracle: 立即勝 / 阻擋 / minimax 三層選步
//! - heuristic: 搜尋葉節點的盤面評估

pub mod heuristic;
mod oracle;
mod player;

pub use oracle::{MoveOracle, MoveStrategy, DEFAULT_SEARCH_DEPTH, WIN_SCORE};
pub use player::{BotPlayer, BOT_USERNAME};
