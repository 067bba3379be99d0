//! Session Registry - 遊戲、等待佇列與玩家索引
//!
//! 三個集合都在同一把 `RwLock` 之下：
//! - 所有修改 (加入、配對、落子、斷線、重連、清理) 取寫鎖
//! - 狀態查詢 (metrics、遊戲列表) 取讀鎖
//!
//! 對玩家的廣播在鎖內進行，但只是把訊息丟進各連線的通道，
//! 真正的 socket 寫入在各自的 handler 執行緒，因此同一座位看到的狀態順序不會錯亂。
//! 儲存與事件發佈則交給 [`Dispatcher`]，鎖內不做任何協作者 I/O。

use super::handshake::{validate_username, UsernameError};
use crate::admin::GameLogger;
use crate::ai::{BotPlayer, MoveStrategy, BOT_USERNAME};
use crate::collab::{Dispatcher, GameRecord, LifecycleEvent, Outcome};
use crate::config::SessionConfig;
use crate::game::{
    AppliedMove, Board, DropError, Game, GameId, GameStatus, MoveError, MoveOutcome, Player, Seat,
    Winner,
};
use crate::net::{Connection, ConnectionId};
use crate::protocol::ServerMessage;
use log::{debug, info, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::Instant;
use uuid::Uuid;

/// 路由或落子失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("You are not in a game")]
    NotInGame,
    #[error("Game not found: {0}")]
    GameNotFound(GameId),
    #[error("No active game found")]
    NoActiveGame,
    #[error("stale bot move for game {0}")]
    StaleBotMove(GameId),
    #[error(transparent)]
    Move(#[from] MoveError),
}

/// 加入的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// 進入等待佇列
    Queued,
    /// 已在佇列中，不做任何事
    AlreadyWaiting,
    /// 該名稱已在進行中的遊戲，視為重連
    Rejoined(GameId),
    /// 連線在確認前就已關閉，沒有入列
    Dropped,
}

/// 等待配對的玩家
#[derive(Debug, Clone)]
pub struct WaitingPlayer {
    pub username: String,
    pub connection: Connection,
    pub queued_at: Instant,
}

/// 伺服器統計
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub active_games: usize,
    pub waiting_players: usize,
    pub indexed_players: usize,
}

/// 管理介面用的遊戲摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub id: GameId,
    pub player1: String,
    pub player2: String,
    pub status: GameStatus,
    pub current_turn: Seat,
    pub move_count: u32,
    pub has_bot: bool,
    pub connected: (bool, bool),
}

/// 交給 bot 執行緒的工作：盤面快照與提交時要核對的前提
#[derive(Debug, Clone)]
struct BotJob {
    game_id: GameId,
    seat: Seat,
    board: Board,
    move_count: u32,
}

#[derive(Debug, Default)]
struct Registry {
    games: HashMap<GameId, Game>,
    waiting: VecDeque<WaitingPlayer>,
    /// username -> game id (只有真人)
    player_games: HashMap<String, GameId>,
}

/// 遊戲伺服器核心
pub struct GameServer {
    registry: RwLock<Registry>,
    config: SessionConfig,
    strategy: Arc<dyn MoveStrategy>,
    dispatcher: Dispatcher,
    logger: GameLogger,
}

impl GameServer {
    pub fn new(
        config: SessionConfig,
        strategy: Arc<dyn MoveStrategy>,
        dispatcher: Dispatcher,
        logger: GameLogger,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: RwLock::new(Registry::default()),
            config,
            strategy,
            dispatcher,
            logger,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn logger(&self) -> &GameLogger {
        &self.logger
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    // === 加入 / 配對 ===

    /// 加入配對佇列
    pub fn join(&self, username: &str, connection: Connection) -> Result<JoinOutcome, UsernameError> {
        let username = validate_username(username)?;
        let mut reg = self.write();

        if let Some(game_id) = reg.player_games.get(username).cloned() {
            if let Some(game) = reg
                .games
                .get_mut(&game_id)
                .filter(|g| g.status == GameStatus::Playing)
            {
                if self.reconnect_seat(game, username, connection.clone()).is_ok() {
                    info!("[LOBBY] '{}' rejoined game {}", username, game_id);
                    return Ok(JoinOutcome::Rejoined(game_id));
                }
            }
            // 過期的索引
            reg.player_games.remove(username);
        }

        if reg.waiting.iter().any(|w| w.username == username) {
            debug!("[LOBBY] '{}' is already waiting", username);
            return Ok(JoinOutcome::AlreadyWaiting);
        }

        if connection
            .send(ServerMessage::Waiting {
                message: "Waiting for opponent...".to_string(),
            })
            .is_err()
        {
            warn!("[LOBBY] '{}' left before the waiting ack", username);
            return Ok(JoinOutcome::Dropped);
        }

        reg.waiting.push_back(WaitingPlayer {
            username: username.to_string(),
            connection,
            queued_at: Instant::now(),
        });
        self.logger.player_join(username);
        info!(
            "[LOBBY] '{}' joined the queue (waiting: {})",
            username,
            reg.waiting.len()
        );
        Ok(JoinOutcome::Queued)
    }

    pub fn matchmaking_sweep(self: &Arc<Self>) -> usize {
        self.matchmaking_sweep_at(Instant::now())
    }

    /// 配對掃描，回傳開了幾局
    ///
    /// 兩人以上依 FIFO 兩兩配對；只剩一人且等待超過門檻時配 bot。
    pub fn matchmaking_sweep_at(self: &Arc<Self>, now: Instant) -> usize {
        let mut started = 0;
        let mut bot_jobs = Vec::new();
        {
            let mut reg = self.write();

            while reg.waiting.len() >= 2 {
                let (Some(first), Some(second)) = (reg.waiting.pop_front(), reg.waiting.pop_front())
                else {
                    break;
                };
                let a = Player::human(first.username, Seat::A, first.connection);
                let b = Player::human(second.username, Seat::B, second.connection);
                bot_jobs.extend(self.start_game(&mut reg, a, b));
                started += 1;
            }

            let bot_due = reg
                .waiting
                .front()
                .is_some_and(|w| now.saturating_duration_since(w.queued_at) >= self.config.bot_wait);
            if reg.waiting.len() == 1 && bot_due {
                if let Some(waiting) = reg.waiting.pop_front() {
                    info!(
                        "[MATCH] '{}' waited {:?}, pairing with bot",
                        waiting.username, self.config.bot_wait
                    );
                    let human = Player::human(waiting.username, Seat::A, waiting.connection);
                    let bot = BotPlayer::new(Seat::B, self.config.bot_delay_ms.clone());
                    bot_jobs.extend(self.start_game(&mut reg, human, bot.seat_player()));
                    started += 1;
                }
            }
        }

        for job in bot_jobs {
            self.schedule_bot(job);
        }
        started
    }

    /// 開局：第一位是 A，通知雙方並發佈事件
    fn start_game(&self, reg: &mut Registry, first: Player, second: Player) -> Option<BotJob> {
        let game_id = Uuid::new_v4().to_string();
        let mut game = Game::new(game_id.clone());
        game.start(first, second);

        for player in game.players().filter(|p| !p.is_bot) {
            reg.player_games.insert(player.username.clone(), game_id.clone());
        }

        let state = game.state_view();
        for seat in [Seat::A, Seat::B] {
            let msg = ServerMessage::GameStart {
                game_id: game_id.clone(),
                seat,
                player_number: seat.number(),
                opponent: game.username(seat.other()).to_string(),
                opponent_is_bot: game.is_bot(seat.other()),
                state: state.clone(),
            };
            if let Some(player) = game.player_mut(seat) {
                player.send(&msg);
            }
        }

        self.dispatcher.publish(LifecycleEvent::game_start(&game));
        self.logger
            .game_start(&game_id, game.username(Seat::A), game.username(Seat::B));
        info!(
            "[MATCH] Game {} started: {} vs {}{}",
            game_id,
            game.username(Seat::A),
            game.username(Seat::B),
            if game.has_bot() { " (bot)" } else { "" }
        );

        let job = bot_job(&game);
        reg.games.insert(game_id, game);
        job
    }

    // === 落子 ===

    /// 依 username 路由客戶端的 MOVE
    pub fn handle_move_request(
        self: &Arc<Self>,
        username: &str,
        column: i64,
    ) -> Result<AppliedMove, SessionError> {
        let column = usize::try_from(column).map_err(|_| MoveError::Drop(DropError::InvalidColumn))?;

        let (applied, next) = {
            let mut reg = self.write();
            let game_id = reg
                .player_games
                .get(username)
                .cloned()
                .ok_or(SessionError::NotInGame)?;
            let seat = reg
                .games
                .get(&game_id)
                .ok_or_else(|| SessionError::GameNotFound(game_id.clone()))?
                .seat_of(username)
                .ok_or(SessionError::NotInGame)?;
            self.commit_move(&mut reg, &game_id, seat, column)?
        };

        if let Some(job) = next {
            self.schedule_bot(job);
        }
        Ok(applied)
    }

    /// 以座位提交一步
    pub fn submit_move(
        self: &Arc<Self>,
        game_id: &str,
        seat: Seat,
        column: usize,
    ) -> Result<AppliedMove, SessionError> {
        let (applied, next) = self.commit_move(&mut self.write(), game_id, seat, column)?;
        if let Some(job) = next {
            self.schedule_bot(job);
        }
        Ok(applied)
    }

    /// 套用、發佈、廣播；結束時收尾，否則回傳下一個 bot 工作
    fn commit_move(
        &self,
        reg: &mut Registry,
        game_id: &str,
        seat: Seat,
        column: usize,
    ) -> Result<(AppliedMove, Option<BotJob>), SessionError> {
        let game = reg
            .games
            .get_mut(game_id)
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;

        let applied = game.apply_move(seat, column).map_err(|e| {
            debug!("[GAME] Rejected move in {} by {:?}: {}", game_id, seat, e);
            e
        })?;

        self.dispatcher.publish(LifecycleEvent::moved(game, &applied));
        self.logger
            .moved(game_id, game.username(seat), column, applied.move_number);

        let update = ServerMessage::GameUpdate {
            game_id: game.id.clone(),
            state: game.state_view(),
        };
        game.broadcast(&update);

        match applied.outcome {
            MoveOutcome::Continue => Ok((applied, bot_job(game))),
            MoveOutcome::Win(_) | MoveOutcome::Draw => {
                self.finalize(reg, game_id);
                Ok((applied, None))
            }
        }
    }

    // === Bot ===

    /// 在獨立執行緒上思考，完成後重新取鎖提交
    fn schedule_bot(self: &Arc<Self>, job: BotJob) {
        let server = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("bot-{}", job.game_id))
            .spawn(move || {
                let bot = BotPlayer::new(job.seat, server.config.bot_delay_ms.clone());
                thread::sleep(bot.think_delay());

                let Some(column) = bot.choose_column(server.strategy.as_ref(), &job.board) else {
                    warn!("[BOT] No legal move in game {}", job.game_id);
                    return;
                };

                match server.submit_bot_move(&job, column) {
                    Ok(applied) => debug!(
                        "[BOT] Game {} move #{}: column {}",
                        job.game_id, applied.move_number, column
                    ),
                    Err(SessionError::StaleBotMove(id)) => {
                        debug!("[BOT] Discarding stale move for game {}", id)
                    }
                    Err(e) => warn!("[BOT] Move rejected in game {}: {}", job.game_id, e),
                }
            });

        if let Err(e) = spawned {
            warn!("[BOT] Failed to spawn bot thread: {}", e);
        }
    }

    /// 核對快照的前提仍成立才提交
    fn submit_bot_move(self: &Arc<Self>, job: &BotJob, column: usize) -> Result<AppliedMove, SessionError> {
        let (applied, next) = {
            let mut reg = self.write();
            let still_valid = reg.games.get(&job.game_id).is_some_and(|game| {
                game.status == GameStatus::Playing
                    && game.current_turn == job.seat
                    && game.is_bot(job.seat)
                    && game.move_count == job.move_count
            });
            if !still_valid {
                return Err(SessionError::StaleBotMove(job.game_id.clone()));
            }
            self.commit_move(&mut reg, &job.game_id, job.seat, column)?
        };

        if let Some(next) = next {
            self.schedule_bot(next);
        }
        Ok(applied)
    }

    // === 斷線 / 重連 ===

    /// 連線關閉
    ///
    /// 只有當 `conn_id` 仍是座位上的連線時才生效，
    /// 避免舊連線在重連之後才關閉而把新連線標成斷線。
    pub fn disconnect(&self, username: &str, conn_id: ConnectionId) -> bool {
        let mut reg = self.write();

        if let Some(pos) = reg
            .waiting
            .iter()
            .position(|w| w.username == username && w.connection.id() == conn_id)
        {
            reg.waiting.remove(pos);
            self.logger.player_leave(username, None);
            info!("[LOBBY] '{}' left the queue", username);
            return true;
        }

        let Some(game_id) = reg.player_games.get(username).cloned() else {
            return false;
        };
        let Some(game) = reg.games.get_mut(&game_id) else {
            return false;
        };
        let Some(player) = game
            .seat_of(username)
            .and_then(|seat| game.player_mut(seat))
        else {
            return false;
        };

        if player.connection_id() != Some(conn_id) {
            debug!(
                "[LOBBY] Ignoring close of stale connection #{} for '{}'",
                conn_id, username
            );
            return false;
        }

        player.detach(Instant::now());
        self.logger.player_leave(username, Some(&game_id));
        info!("[LOBBY] '{}' disconnected from game {}", username, game_id);
        true
    }

    /// 以新連線回到原本的遊戲
    pub fn reconnect(&self, username: &str, connection: Connection) -> Result<GameId, SessionError> {
        let mut reg = self.write();
        let game_id = reg
            .player_games
            .get(username)
            .cloned()
            .ok_or(SessionError::NoActiveGame)?;

        let Some(game) = reg.games.get_mut(&game_id) else {
            reg.player_games.remove(username);
            return Err(SessionError::GameNotFound(game_id));
        };
        if game.status != GameStatus::Playing {
            return Err(SessionError::NoActiveGame);
        }

        self.reconnect_seat(game, username, connection)?;
        info!("[LOBBY] '{}' reconnected to game {}", username, game_id);
        Ok(game_id)
    }

    /// 原地替換座位上的連線並送出完整狀態
    fn reconnect_seat(
        &self,
        game: &mut Game,
        username: &str,
        connection: Connection,
    ) -> Result<(), SessionError> {
        let seat = game.seat_of(username).ok_or(SessionError::NoActiveGame)?;
        let msg = ServerMessage::Reconnected {
            game_id: game.id.clone(),
            seat,
            player_number: seat.number(),
            opponent: game.username(seat.other()).to_string(),
            state: game.state_view(),
        };

        let player = game.player_mut(seat).ok_or(SessionError::NoActiveGame)?;
        player.attach(connection, Instant::now());
        player.send(&msg);
        self.logger.player_reconnect(username, &game.id);
        Ok(())
    }

    // === 清理 ===

    pub fn cleanup_sweep(&self) -> usize {
        self.cleanup_sweep_at(Instant::now())
    }

    /// 斷線超過 timeout 的一方判負，回傳結束了幾局
    pub fn cleanup_sweep_at(&self, now: Instant) -> usize {
        let mut reg = self.write();
        let timeout = self.config.disconnect_timeout;

        let expired: Vec<(GameId, Seat)> = reg
            .games
            .values()
            .filter(|g| g.status == GameStatus::Playing)
            .filter_map(|g| {
                [Seat::A, Seat::B]
                    .into_iter()
                    .find(|&seat| {
                        g.player(seat)
                            .is_some_and(|p| p.offline_at_least(timeout, now))
                    })
                    .map(|loser| (g.id.clone(), loser))
            })
            .collect();

        for (game_id, loser) in &expired {
            let Some(game) = reg.games.get_mut(game_id) else {
                continue;
            };
            game.forfeit(*loser);
            let loser_name = game.username(*loser).to_string();

            let update = ServerMessage::GameUpdate {
                game_id: game.id.clone(),
                state: game.state_view(),
            };
            game.broadcast(&update);

            self.logger.forfeit(game_id, &loser_name);
            info!(
                "[CLEANUP] Game {} forfeited by '{}' after {:?} offline",
                game_id, loser_name, timeout
            );
            self.finalize(&mut reg, game_id);
        }

        expired.len()
    }

    /// 結束收尾：存檔、戰績、事件、清索引，最後移出 registry
    fn finalize(&self, reg: &mut Registry, game_id: &str) {
        let Some(game) = reg.games.get(game_id) else {
            return;
        };

        self.dispatcher.save_game(GameRecord::from_game(game));
        for player in game.players().filter(|p| !p.is_bot) {
            let outcome = match game.winner {
                Winner::Draw | Winner::None => Outcome::Draw,
                w if w.seat() == Some(player.seat) => Outcome::Win,
                _ => Outcome::Loss,
            };
            self.dispatcher.update_stats(player.username.clone(), outcome);
        }
        self.dispatcher.publish(LifecycleEvent::game_end(game));

        let result = match game.winner_name() {
            Some(name) => format!("{} wins", name),
            None => "draw".to_string(),
        };
        self.logger.game_end(game_id, &result, game.move_count);
        info!(
            "[GAME] Game {} finished: {} ({} moves, {}s)",
            game_id,
            result,
            game.move_count,
            game.duration().as_secs()
        );

        let humans: Vec<String> = game
            .players()
            .filter(|p| !p.is_bot)
            .map(|p| p.username.clone())
            .collect();
        for username in humans {
            if reg.player_games.get(&username).map(String::as_str) == Some(game_id) {
                reg.player_games.remove(&username);
            }
        }
        reg.games.remove(game_id);
    }

    // === 查詢 ===

    pub fn metrics(&self) -> Metrics {
        let reg = self.read();
        Metrics {
            active_games: reg.games.len(),
            waiting_players: reg.waiting.len(),
            indexed_players: reg.player_games.len(),
        }
    }

    pub fn list_games(&self) -> Vec<GameSummary> {
        let reg = self.read();
        let mut games: Vec<GameSummary> = reg
            .games
            .values()
            .map(|g| GameSummary {
                id: g.id.clone(),
                player1: g.username(Seat::A).to_string(),
                player2: g.username(Seat::B).to_string(),
                status: g.status,
                current_turn: g.current_turn,
                move_count: g.move_count,
                has_bot: g.has_bot(),
                connected: (
                    g.player(Seat::A).is_some_and(|p| p.connected),
                    g.player(Seat::B).is_some_and(|p| p.connected),
                ),
            })
            .collect();
        games.sort_by(|a, b| a.id.cmp(&b.id));
        games
    }

    /// 等待中的玩家名稱 (FIFO 順序)
    pub fn waiting_usernames(&self) -> Vec<String> {
        self.read().waiting.iter().map(|w| w.username.clone()).collect()
    }
}

/// 輪到 bot 時產生工作
fn bot_job(game: &Game) -> Option<BotJob> {
    game.is_bot_turn().then(|| BotJob {
        game_id: game.id.clone(),
        seat: game.current_turn,
        board: game.board,
        move_count: game.move_count,
    })
}
