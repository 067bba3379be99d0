//! Admin Commands - 管理指令解析與輸出格式

use super::logger::{EventType, GameLogger};
use crate::collab::PlayerStats;
use crate::lobby::{GameSummary, Metrics};

const DEFAULT_LOG_COUNT: usize = 20;
const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// 指令解析結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Help,
    Auth(String),
    Status,
    Games,
    Leaderboard(usize),
    Stats(String),
    Logs(usize, Option<EventType>),
    Quit,
    Unknown(String),
}

impl ParsedCommand {
    /// 需要先 AUTH 的指令
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            ParsedCommand::Help | ParsedCommand::Auth(_) | ParsedCommand::Quit | ParsedCommand::Unknown(_)
        )
    }
}

/// 解析指令
pub fn parse_command(input: &str) -> ParsedCommand {
    let input = input.trim();
    let parts: Vec<&str> = input.split_whitespace().collect();

    if parts.is_empty() {
        return ParsedCommand::Unknown(String::new());
    }

    let cmd = parts[0].to_uppercase();
    // 名稱可以含空白，取指令後的整段
    let rest = input[parts[0].len()..].trim();

    match cmd.as_str() {
        "HELP" | "?" => ParsedCommand::Help,
        "AUTH" => {
            if parts.len() < 2 {
                ParsedCommand::Unknown("AUTH requires a token".to_string())
            } else {
                ParsedCommand::Auth(parts[1].to_string())
            }
        }
        "STATUS" => ParsedCommand::Status,
        "GAMES" => ParsedCommand::Games,
        "LEADERBOARD" | "TOP" => {
            let limit = parts
                .get(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LEADERBOARD_SIZE);
            ParsedCommand::Leaderboard(limit)
        }
        "STATS" => {
            if rest.is_empty() {
                ParsedCommand::Unknown("STATS requires a username".to_string())
            } else {
                ParsedCommand::Stats(rest.to_string())
            }
        }
        "LOGS" => {
            let count = parts
                .get(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LOG_COUNT);
            let event_type = parts.get(2).and_then(|s| EventType::parse(s));
            ParsedCommand::Logs(count, event_type)
        }
        "QUIT" | "EXIT" | "BYE" => ParsedCommand::Quit,
        _ => ParsedCommand::Unknown(format!("Unknown command: {}", cmd)),
    }
}

/// 產生 HELP 訊息
pub fn help_message() -> String {
    r#"
=== Four-in-a-Row Admin Console ===

Commands:
  AUTH <token>       Authenticate with admin token (required first)
  HELP               Show this help message
  STATUS             Show server status
  GAMES              List live games
  LEADERBOARD [n]    Show top n players (default: 10)
  STATS <username>   Show a player's record
  LOGS [n] [type]    Show recent n logs (default: 20)
                     Types: PLAYER_JOIN, PLAYER_LEAVE, PLAYER_RECONNECT,
                            GAME_START, MOVE, GAME_END, FORFEIT, ADMIN, ERROR
  QUIT               Disconnect from admin console

Examples:
  AUTH my_secret_token
  LEADERBOARD 5
  STATS alice
  LOGS 10 GAME_END
"#
    .to_string()
}

/// 格式化狀態
pub fn format_status(metrics: &Metrics) -> String {
    format!(
        r#"
=== Server Status ===
Active Games: {}
Waiting Players: {}
Players In Games: {}
"#,
        metrics.active_games, metrics.waiting_players, metrics.indexed_players
    )
}

/// 格式化遊戲列表
pub fn format_games(games: &[GameSummary]) -> String {
    if games.is_empty() {
        return "No games in progress.".to_string();
    }

    let mut output = String::from("\n=== Games ===\n");
    output.push_str(&format!(
        "{:<38} {:<16} {:<16} {:<6} {:<6} {:<8}\n",
        "ID", "Player 1", "Player 2", "Turn", "Moves", "Online"
    ));
    output.push_str(&"-".repeat(94));
    output.push('\n');

    for game in games {
        let online = match game.connected {
            (true, true) => "both",
            (true, false) => "P1",
            (false, true) => "P2",
            (false, false) => "none",
        };
        output.push_str(&format!(
            "{:<38} {:<16} {:<16} {:<6} {:<6} {:<8}\n",
            game.id,
            game.player1,
            if game.has_bot {
                format!("{} (bot)", game.player2)
            } else {
                game.player2.clone()
            },
            game.current_turn.number(),
            game.move_count,
            online
        ));
    }
    output
}

/// 格式化排行榜
pub fn format_leaderboard(entries: &[PlayerStats]) -> String {
    if entries.is_empty() {
        return "No players yet.".to_string();
    }

    let mut output = String::from("\n=== Leaderboard ===\n");
    output.push_str(&format!(
        "{:<4} {:<20} {:>6} {:>6} {:>6} {:>6} {:>8}\n",
        "#", "Player", "Games", "Won", "Lost", "Drawn", "Win %"
    ));
    output.push_str(&"-".repeat(62));
    output.push('\n');

    for (rank, entry) in entries.iter().enumerate() {
        output.push_str(&format!(
            "{:<4} {:<20} {:>6} {:>6} {:>6} {:>6} {:>7.1}%\n",
            rank + 1,
            entry.username,
            entry.games_played,
            entry.games_won,
            entry.games_lost,
            entry.games_drawn,
            entry.win_rate() * 100.0
        ));
    }
    output
}

/// 格式化個人戰績
pub fn format_stats(stats: &PlayerStats) -> String {
    format!(
        "{}: {} games, {} won, {} lost, {} drawn ({:.1}% wins)",
        stats.username,
        stats.games_played,
        stats.games_won,
        stats.games_lost,
        stats.games_drawn,
        stats.win_rate() * 100.0
    )
}

/// 格式化日誌
pub fn format_logs(logger: &GameLogger, count: usize, event_type: Option<EventType>) -> String {
    let entries = match event_type {
        Some(et) => logger.get_recent_by_type(count, et),
        None => logger.get_recent(count),
    };

    if entries.is_empty() {
        return "No logs found.".to_string();
    }

    let mut output = String::from("\n=== Logs ===\n");
    for entry in entries {
        output.push_str(&entry.format());
        output.push('\n');
    }
    output
}
