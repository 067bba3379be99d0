//! 協作者的背景工作執行緒
//!
//! Registry 在持鎖期間只把工作丟進通道，實際的儲存與事件 I/O
//! 在這條執行緒上依提交順序執行。

use super::events::{EventSink, LifecycleEvent};
use super::store::{GameRecord, GameStore, Outcome};
use log::{debug, error, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

enum Job {
    Publish(LifecycleEvent),
    SaveGame(GameRecord),
    UpdateStats(String, Outcome),
    Flush(Sender<()>),
}

/// 儲存與事件工作的分派器
pub struct Dispatcher {
    tx: Mutex<Sender<Job>>,
    store: Arc<dyn GameStore>,
}

impl Dispatcher {
    /// 建立並啟動工作執行緒
    pub fn spawn(store: Arc<dyn GameStore>, sink: Arc<dyn EventSink>) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker_store = Arc::clone(&store);
        if let Err(e) = thread::Builder::new()
            .name("collab-dispatch".to_string())
            .spawn(move || run_worker(rx, worker_store, sink))
        {
            error!("[STORE] Failed to spawn dispatcher thread: {}", e);
        }

        Self {
            tx: Mutex::new(tx),
            store,
        }
    }

    /// 讀取端直接查詢 store (排行榜、個人戰績)
    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    pub fn publish(&self, event: LifecycleEvent) {
        self.submit(Job::Publish(event));
    }

    pub fn save_game(&self, record: GameRecord) {
        self.submit(Job::SaveGame(record));
    }

    pub fn update_stats(&self, username: impl Into<String>, outcome: Outcome) {
        self.submit(Job::UpdateStats(username.into(), outcome));
    }

    /// 等待先前提交的工作全部完成 (最多等 2 秒)
    pub fn flush(&self) -> bool {
        let (done_tx, done_rx) = mpsc::channel();
        self.submit(Job::Flush(done_tx));
        done_rx.recv_timeout(FLUSH_TIMEOUT).is_ok()
    }

    fn submit(&self, job: Job) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if tx.send(job).is_err() {
            warn!("[STORE] Dispatcher worker is gone, dropping job");
        }
    }
}

fn run_worker(rx: Receiver<Job>, store: Arc<dyn GameStore>, sink: Arc<dyn EventSink>) {
    for job in rx {
        match job {
            Job::Publish(event) => {
                if let Err(e) = sink.publish(&event) {
                    warn!(
                        "[EVENT] Failed to publish {:?} for game {}: {}",
                        event.event_type, event.game_id, e
                    );
                }
            }
            Job::SaveGame(record) => match store.save_game(&record) {
                Ok(()) => debug!("[STORE] Saved game {}", record.id),
                Err(e) => error!("[STORE] Failed to save game {}: {}", record.id, e),
            },
            Job::UpdateStats(username, outcome) => {
                if let Err(e) = store.update_stats(&username, outcome) {
                    error!("[STORE] Failed to update stats for '{}': {}", username, e);
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("[STORE] Dispatcher worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::events::{LifecycleKind, MemorySink};
    use crate::collab::store::{MemoryStore, PlayerStats, StoreError};
    use crate::game::{Game, Player, Seat};
    use crate::net::Connection;

    /// 每次寫入都失敗的 store
    struct BrokenStore;

    impl GameStore for BrokenStore {
        fn save_game(&self, _: &GameRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk on fire".into()))
        }
        fn update_stats(&self, _: &str, _: Outcome) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk on fire".into()))
        }
        fn leaderboard(&self, _: usize) -> Result<Vec<PlayerStats>, StoreError> {
            Ok(Vec::new())
        }
        fn player_stats(&self, name: &str) -> Result<PlayerStats, StoreError> {
            Err(StoreError::NotFound(name.to_string()))
        }
    }

    fn finished_game() -> Game {
        let mut game = Game::new("g-dispatch");
        let (alice, _rx) = Connection::open();
        let (bob, _rx) = Connection::open();
        game.start(
            Player::human("alice", Seat::A, alice),
            Player::human("bob", Seat::B, bob),
        );
        game.forfeit(Seat::B);
        game
    }

    #[test]
    fn test_jobs_run_in_submission_order() {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(MemorySink::default());
        let dispatcher = Dispatcher::spawn(store.clone(), sink.clone());
        let game = finished_game();

        dispatcher.publish(LifecycleEvent::game_start(&game));
        dispatcher.save_game(GameRecord::from_game(&game));
        dispatcher.update_stats("alice", Outcome::Win);
        dispatcher.update_stats("bob", Outcome::Loss);
        dispatcher.publish(LifecycleEvent::game_end(&game));
        assert!(dispatcher.flush());

        assert_eq!(
            sink.kinds(),
            vec![LifecycleKind::GameStart, LifecycleKind::GameEnd]
        );
        assert!(store.game("g-dispatch").is_some());
        assert_eq!(store.player_stats("alice").unwrap().games_won, 1);
        assert_eq!(dispatcher.store().player_stats("bob").unwrap().games_lost, 1);
    }

    #[test]
    fn test_store_failure_is_swallowed() {
        let sink = Arc::new(MemorySink::default());
        let dispatcher = Dispatcher::spawn(Arc::new(BrokenStore), sink.clone());
        let game = finished_game();

        dispatcher.save_game(GameRecord::from_game(&game));
        dispatcher.update_stats("alice", Outcome::Win);
        dispatcher.publish(LifecycleEvent::game_end(&game));

        assert!(dispatcher.flush());
        assert_eq!(sink.kinds(), vec![LifecycleKind::GameEnd]);
    }
}
