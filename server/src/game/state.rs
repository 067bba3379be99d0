use super::board::{Board, DropError, Seat};
use crate::net::{Connection, ConnectionId};
use crate::protocol::{GameStateView, ServerMessage};
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};

/// 遊戲 ID (UUID 字串)
pub type GameId = String;

/// 遊戲生命週期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

/// 勝負結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Winner {
    None,
    A,
    B,
    Draw,
}

impl Winner {
    /// 獲勝的座位 (平手或未分勝負時為 None)
    pub fn seat(self) -> Option<Seat> {
        match self {
            Winner::A => Some(Seat::A),
            Winner::B => Some(Seat::B),
            Winner::None | Winner::Draw => None,
        }
    }

    /// 協議用編號：0 = 無 / 平手，1 / 2 = 座位
    pub fn number(self) -> u8 {
        self.seat().map_or(0, Seat::number)
    }
}

impl From<Seat> for Winner {
    fn from(seat: Seat) -> Self {
        match seat {
            Seat::A => Winner::A,
            Seat::B => Winner::B,
        }
    }
}

/// 座位上的玩家
///
/// 真人玩家的 connection 可以在重連時原地替換，
/// username 與座位不變，遊戲成員身份也不受影響。
#[derive(Debug, Clone)]
pub struct Player {
    pub username: String,
    pub seat: Seat,
    pub is_bot: bool,
    pub connection: Option<Connection>,
    pub connected: bool,
    pub last_seen: Instant,
}

impl Player {
    /// 建立真人玩家
    pub fn human(username: impl Into<String>, seat: Seat, connection: Connection) -> Self {
        Self {
            username: username.into(),
            seat,
            is_bot: false,
            connection: Some(connection),
            connected: true,
            last_seen: Instant::now(),
        }
    }

    /// 建立 bot 玩家 (沒有連線，永遠視為在線)
    pub fn bot(username: impl Into<String>, seat: Seat) -> Self {
        Self {
            username: username.into(),
            seat,
            is_bot: true,
            connection: None,
            connected: true,
            last_seen: Instant::now(),
        }
    }

    /// 目前連線 ID
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(Connection::id)
    }

    /// 盡力送出訊息；寫入失敗時把玩家標記為斷線
    ///
    /// 回傳是否成功送出。bot 與已斷線的玩家直接略過。
    pub fn send(&mut self, msg: &ServerMessage) -> bool {
        if self.is_bot || !self.connected {
            return false;
        }
        let Some(conn) = &self.connection else {
            return false;
        };

        match conn.send(msg.clone()) {
            Ok(()) => true,
            Err(e) => {
                warn!("[GAME] Failed to write to '{}': {}", self.username, e);
                self.connected = false;
                self.last_seen = Instant::now();
                false
            }
        }
    }

    /// 重連：替換 connection 並標記在線
    pub fn attach(&mut self, connection: Connection, now: Instant) {
        self.connection = Some(connection);
        self.connected = true;
        self.last_seen = now;
    }

    /// 斷線：保留座位，記錄最後在線時間
    pub fn detach(&mut self, now: Instant) {
        self.connected = false;
        self.last_seen = now;
    }

    /// 斷線時間是否已達 timeout
    pub fn offline_at_least(&self, timeout: Duration, now: Instant) -> bool {
        !self.is_bot && !self.connected && now.saturating_duration_since(self.last_seen) >= timeout
    }
}

/// 落子錯誤
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("game not in playing state: {0:?}")]
    NotPlaying(GameStatus),
    #[error("not your turn (current: {current:?}, yours: {yours:?})")]
    NotYourTurn { current: Seat, yours: Seat },
    #[error(transparent)]
    Drop(#[from] DropError),
}

/// 每一步之後恰好成立其中一種
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Continue,
    Win(Seat),
    Draw,
}

/// 已接受的一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedMove {
    pub seat: Seat,
    pub column: usize,
    pub row: usize,
    pub move_number: u32,
    pub outcome: MoveOutcome,
}

/// 一局遊戲
#[derive(Debug, Clone)]
pub struct Game {
    pub id: GameId,
    pub board: Board,
    pub seat_a: Option<Player>,
    pub seat_b: Option<Player>,
    pub current_turn: Seat,
    pub status: GameStatus,
    pub winner: Winner,
    pub move_count: u32,
    pub started_at: SystemTime,
    pub ended_at: Option<SystemTime>,
    pub last_activity: Instant,
}

impl Game {
    /// 建立等待中的空遊戲
    pub fn new(id: impl Into<GameId>) -> Self {
        Self {
            id: id.into(),
            board: Board::new(),
            seat_a: None,
            seat_b: None,
            current_turn: Seat::A,
            status: GameStatus::Waiting,
            winner: Winner::None,
            move_count: 0,
            started_at: SystemTime::now(),
            ended_at: None,
            last_activity: Instant::now(),
        }
    }

    /// 入座並開始：第一位參與者固定為 A
    pub fn start(&mut self, mut first: Player, mut second: Player) {
        first.seat = Seat::A;
        second.seat = Seat::B;
        self.seat_a = Some(first);
        self.seat_b = Some(second);
        self.current_turn = Seat::A;
        self.status = GameStatus::Playing;
        self.started_at = SystemTime::now();
        self.last_activity = Instant::now();
    }

    pub fn player(&self, seat: Seat) -> Option<&Player> {
        match seat {
            Seat::A => self.seat_a.as_ref(),
            Seat::B => self.seat_b.as_ref(),
        }
    }

    pub fn player_mut(&mut self, seat: Seat) -> Option<&mut Player> {
        match seat {
            Seat::A => self.seat_a.as_mut(),
            Seat::B => self.seat_b.as_mut(),
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.seat_a.iter().chain(self.seat_b.iter())
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.seat_a.iter_mut().chain(self.seat_b.iter_mut())
    }

    /// 真人玩家的座位
    pub fn seat_of(&self, username: &str) -> Option<Seat> {
        self.players()
            .find(|p| !p.is_bot && p.username == username)
            .map(|p| p.seat)
    }

    /// 座位上玩家的名稱 (空位時為空字串)
    pub fn username(&self, seat: Seat) -> &str {
        self.player(seat).map_or("", |p| p.username.as_str())
    }

    pub fn is_bot(&self, seat: Seat) -> bool {
        self.player(seat).is_some_and(|p| p.is_bot)
    }

    pub fn has_bot(&self) -> bool {
        self.players().any(|p| p.is_bot)
    }

    /// 輪到 bot 下棋
    pub fn is_bot_turn(&self) -> bool {
        self.status == GameStatus::Playing && self.is_bot(self.current_turn)
    }

    /// 套用一步
    ///
    /// 勝利檢查先於滿盤檢查：最後一格同時連線時算勝利而非平手。
    pub fn apply_move(&mut self, seat: Seat, column: usize) -> Result<AppliedMove, MoveError> {
        if self.status != GameStatus::Playing {
            return Err(MoveError::NotPlaying(self.status));
        }
        if seat != self.current_turn {
            return Err(MoveError::NotYourTurn {
                current: self.current_turn,
                yours: seat,
            });
        }

        let row = self.board.drop_piece(column, seat)?;
        self.move_count += 1;
        self.last_activity = Instant::now();

        let outcome = if self.board.check_win(row, column, seat) {
            self.finish(Winner::from(seat));
            MoveOutcome::Win(seat)
        } else if self.board.is_full() {
            self.finish(Winner::Draw);
            MoveOutcome::Draw
        } else {
            self.current_turn = seat.other();
            MoveOutcome::Continue
        };

        Ok(AppliedMove {
            seat,
            column,
            row,
            move_number: self.move_count,
            outcome,
        })
    }

    /// 因斷線判負：另一方獲勝
    pub fn forfeit(&mut self, loser: Seat) {
        self.finish(Winner::from(loser.other()));
    }

    fn finish(&mut self, winner: Winner) {
        self.status = GameStatus::Finished;
        self.winner = winner;
        self.ended_at = Some(SystemTime::now());
    }

    /// 遊戲時長 (進行中則計到現在)
    pub fn duration(&self) -> Duration {
        let end = self.ended_at.unwrap_or_else(SystemTime::now);
        end.duration_since(self.started_at).unwrap_or_default()
    }

    /// 獲勝者名稱
    pub fn winner_name(&self) -> Option<&str> {
        self.winner.seat().map(|seat| self.username(seat))
    }

    /// 對外的盤面快照
    pub fn state_view(&self) -> GameStateView {
        GameStateView {
            board: self.board.to_rows(),
            current_turn: self.current_turn.number(),
            status: self.status,
            winner: self.winner,
            move_count: self.move_count,
            winner_name: if self.status == GameStatus::Finished {
                self.winner_name().map(str::to_string)
            } else {
                None
            },
        }
    }

    /// 送給所有在線真人玩家；寫入失敗只會讓該玩家斷線，不影響另一位
    pub fn broadcast(&mut self, msg: &ServerMessage) -> usize {
        self.players_mut().filter(|p| !p.is_bot).map(|p| p.send(msg)).filter(|&sent| sent).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Connection;

    fn playing_game() -> Game {
        let mut game = Game::new("g1");
        let (alice, _) = Connection::open();
        let (bob, _) = Connection::open();
        game.start(
            Player::human("alice", Seat::B, alice),
            Player::human("bob", Seat::A, bob),
        );
        game
    }

    // 無連線的滿盤花紋：每行 AABB 週期，奇數列反相
    const DRAW_PATTERN: [&str; 6] = [
        "AABBAAB", "BBAABBA", "AABBAAB", "BBAABBA", "AABBAAB", "BBAABBA",
    ];

    #[test]
    fn test_start_assigns_seats_in_order() {
        let game = playing_game();
        assert_eq!(game.status, GameStatus::Playing);
        assert_eq!(game.player(Seat::A).unwrap().username, "alice");
        assert_eq!(game.player(Seat::B).unwrap().username, "bob");
        assert_eq!(game.current_turn, Seat::A);
        assert_eq!(game.seat_of("bob"), Some(Seat::B));
        assert_eq!(game.seat_of("carol"), None);
    }

    #[test]
    fn test_turn_alternates_and_counter_increases() {
        let mut game = playing_game();

        let first = game.apply_move(Seat::A, 3).unwrap();
        assert_eq!(first.outcome, MoveOutcome::Continue);
        assert_eq!(first.move_number, 1);
        assert_eq!(game.current_turn, Seat::B);

        let second = game.apply_move(Seat::B, 3).unwrap();
        assert_eq!(second.row, 4);
        assert_eq!(second.move_number, 2);
        assert_eq!(game.current_turn, Seat::A);
    }

    #[test]
    fn test_rejects_wrong_turn_without_mutation() {
        let mut game = playing_game();
        let before = game.board;

        let err = game.apply_move(Seat::B, 0).unwrap_err();
        assert_eq!(
            err,
            MoveError::NotYourTurn {
                current: Seat::A,
                yours: Seat::B
            }
        );
        assert_eq!(game.board, before);
        assert_eq!(game.move_count, 0);
    }

    #[test]
    fn test_rejects_invalid_column_and_waiting_game() {
        let mut game = playing_game();
        assert_eq!(
            game.apply_move(Seat::A, 7),
            Err(MoveError::Drop(DropError::InvalidColumn))
        );
        assert_eq!(game.current_turn, Seat::A);

        let mut waiting = Game::new("g2");
        assert_eq!(
            waiting.apply_move(Seat::A, 0),
            Err(MoveError::NotPlaying(GameStatus::Waiting))
        );
    }

    #[test]
    fn test_vertical_win_finishes_game() {
        let mut game = playing_game();
        for _ in 0..3 {
            game.apply_move(Seat::A, 0).unwrap();
            game.apply_move(Seat::B, 1).unwrap();
        }
        let last = game.apply_move(Seat::A, 0).unwrap();

        assert_eq!(last.outcome, MoveOutcome::Win(Seat::A));
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Winner::A);
        assert!(game.ended_at.is_some());
        assert_eq!(game.winner_name(), Some("alice"));
        assert_eq!(
            game.apply_move(Seat::B, 2),
            Err(MoveError::NotPlaying(GameStatus::Finished))
        );
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        let mut game = playing_game();
        let mut rows = DRAW_PATTERN;
        rows[0] = "AABBAA.";
        game.board = Board::from_rows(&rows);
        game.current_turn = Seat::B;

        let applied = game.apply_move(Seat::B, 6).unwrap();
        assert_eq!(applied.outcome, MoveOutcome::Draw);
        assert_eq!(game.winner, Winner::Draw);
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.state_view().winner_name, None);
    }

    #[test]
    fn test_win_on_last_cell_beats_draw() {
        let mut game = playing_game();
        let mut rows = DRAW_PATTERN;
        rows[0] = "AAB.BBA";
        game.board = Board::from_rows(&rows);
        game.current_turn = Seat::B;

        let applied = game.apply_move(Seat::B, 3).unwrap();
        assert!(game.board.is_full());
        assert_eq!(applied.outcome, MoveOutcome::Win(Seat::B));
        assert_eq!(game.winner, Winner::B);
    }

    #[test]
    fn test_forfeit_credits_other_seat() {
        let mut game = playing_game();
        game.forfeit(Seat::B);
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Winner::A);
        assert!(game.ended_at.is_some());
    }

    #[test]
    fn test_broadcast_write_failure_marks_disconnected() {
        let mut game = Game::new("g3");
        let (alice, alice_rx) = Connection::open();
        let (bob, bob_rx) = Connection::open();
        game.start(Player::human("alice", Seat::A, alice), Player::human("bob", Seat::B, bob));
        drop(bob_rx);

        let sent = game.broadcast(&ServerMessage::Pong);
        assert_eq!(sent, 1);
        assert!(alice_rx.try_recv().is_ok());
        assert!(game.player(Seat::A).unwrap().connected);
        assert!(!game.player(Seat::B).unwrap().connected);
    }

    #[test]
    fn test_bot_is_skipped_by_broadcast() {
        let mut game = Game::new("g4");
        let (alice, alice_rx) = Connection::open();
        game.start(Player::human("alice", Seat::A, alice), Player::bot("BOT", Seat::B));

        assert_eq!(game.broadcast(&ServerMessage::Pong), 1);
        assert!(alice_rx.try_recv().is_ok());
        assert!(game.has_bot());
        assert!(!game.is_bot_turn());

        game.apply_move(Seat::A, 3).unwrap();
        assert!(game.is_bot_turn());
        assert_eq!(game.seat_of("BOT"), None);
    }
}
