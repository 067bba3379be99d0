//! Four-in-a-Row Server
//!
//! 即時四子棋伺服器：配對、斷線重連、minimax bot 與管理介面。

pub mod admin;
pub mod ai;
pub mod collab;
pub mod config;
pub mod game;
pub mod lobby;
pub mod net;
pub mod protocol;
