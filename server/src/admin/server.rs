//! Admin Server - 管理介面 TCP Server
//!
//! 在獨立 Port 監聽管理連線，直接以讀鎖查詢 [`GameServer`]。

use super::commands::{
    format_games, format_leaderboard, format_logs, format_stats, format_status, help_message,
    parse_command, ParsedCommand,
};
use crate::collab::StoreError;
use crate::lobby::GameServer;
use crate::net::create_tcp_listener;
use log::{error, info, warn};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// 閒置多久斷開管理連線
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Admin Server 設定
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// 認證 Token
    pub auth_token: String,
    /// 監聽位址
    pub addr: SocketAddr,
}

/// Admin 連線狀態
struct AdminSession {
    stream: TcpStream,
    authenticated: bool,
    peer_addr: String,
}

impl AdminSession {
    fn new(stream: TcpStream) -> Self {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            stream,
            authenticated: false,
            peer_addr,
        }
    }

    fn send(&mut self, message: &str) {
        let msg = if message.ends_with('\n') {
            message.to_string()
        } else {
            format!("{}\n", message)
        };

        if let Err(e) = self.stream.write_all(msg.as_bytes()) {
            warn!("[ADMIN] Failed to send to {}: {}", self.peer_addr, e);
        }
        let _ = self.stream.flush();
    }

    fn send_prompt(&mut self) {
        let prompt = if self.authenticated {
            "admin> "
        } else {
            "auth> "
        };
        let _ = self.stream.write_all(prompt.as_bytes());
        let _ = self.stream.flush();
    }
}

/// 啟動 Admin Server，回傳實際綁定的位址
pub fn spawn_admin_server(config: AdminConfig, server: Arc<GameServer>) -> io::Result<SocketAddr> {
    let listener = create_tcp_listener(config.addr)?;
    let local_addr = listener.local_addr()?;

    info!("[ADMIN] Admin server listening on {}", local_addr);

    thread::Builder::new()
        .name("admin-accept".to_string())
        .spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        let server = Arc::clone(&server);
                        let auth_token = config.auth_token.clone();

                        thread::spawn(move || {
                            handle_admin_connection(stream, &auth_token, &server);
                        });
                    }
                    Err(e) => {
                        error!("[ADMIN] Accept error: {}", e);
                    }
                }
            }
        })?;

    Ok(local_addr)
}

/// 處理單一管理連線
fn handle_admin_connection(stream: TcpStream, auth_token: &str, server: &GameServer) {
    let writer = match stream.try_clone() {
        Ok(w) => w,
        Err(e) => {
            error!("[ADMIN] Failed to clone admin stream: {}", e);
            return;
        }
    };
    let mut session = AdminSession::new(writer);
    info!("[ADMIN] New admin connection from {}", session.peer_addr);

    let _ = stream.set_read_timeout(Some(IDLE_TIMEOUT));

    session.send("=== Four-in-a-Row Admin Console ===");
    session.send("Type 'AUTH <token>' to authenticate, or 'HELP' for commands.");
    session.send_prompt();

    let reader = BufReader::new(stream);

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                info!("[ADMIN] {} disconnected: {}", session.peer_addr, e);
                break;
            }
        };

        let command = parse_command(&line);
        if command.requires_auth() && !session.authenticated {
            session.send("ERROR: Not authenticated. Use AUTH <token> first.");
            session.send_prompt();
            continue;
        }

        match command {
            ParsedCommand::Help => {
                session.send(&help_message());
            }

            ParsedCommand::Auth(token) => {
                if token == auth_token {
                    session.authenticated = true;
                    session.send("OK: Authentication successful");
                    server
                        .logger()
                        .admin_action("AUTH", &format!("Admin logged in from {}", session.peer_addr));
                } else {
                    session.send("ERROR: Invalid token");
                    warn!("[ADMIN] Failed auth attempt from {}", session.peer_addr);
                }
            }

            ParsedCommand::Status => {
                session.send(&format_status(&server.metrics()));
            }

            ParsedCommand::Games => {
                session.send(&format_games(&server.list_games()));
            }

            ParsedCommand::Leaderboard(limit) => {
                match server.dispatcher().store().leaderboard(limit) {
                    Ok(entries) => session.send(&format_leaderboard(&entries)),
                    Err(e) => session.send(&format!("ERROR: {}", e)),
                }
            }

            ParsedCommand::Stats(username) => {
                match server.dispatcher().store().player_stats(&username) {
                    Ok(stats) => session.send(&format_stats(&stats)),
                    Err(StoreError::NotFound(_)) => {
                        session.send(&format!("ERROR: No record for '{}'", username))
                    }
                    Err(e) => session.send(&format!("ERROR: {}", e)),
                }
            }

            ParsedCommand::Logs(count, event_type) => {
                session.send(&format_logs(server.logger(), count, event_type));
            }

            ParsedCommand::Quit => {
                session.send("Goodbye!");
                info!("[ADMIN] {} logged out", session.peer_addr);
                break;
            }

            ParsedCommand::Unknown(msg) => {
                if !msg.is_empty() {
                    session.send(&format!("ERROR: {}", msg));
                }
            }
        }

        session.send_prompt();
    }

    info!("[ADMIN] Connection closed: {}", session.peer_addr);
}
