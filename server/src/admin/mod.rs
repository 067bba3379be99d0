//! Admin Module - 遠端管理介面
//!
//! 提供獨立 TCP Port 的管理功能：
//! - 伺服器狀態與進行中的遊戲
//! - 排行榜與個人戰績
//! - 遊戲事件記錄查看

pub mod commands;
pub mod logger;
pub mod server;

pub use commands::ParsedCommand;
pub use logger::{EventType, GameLogger, LogEntry};
pub use server::{spawn_admin_server, AdminConfig};
