//! 背景定時掃描 (配對、斷線清理)
//!
//! 兩條掃描各自一條執行緒，只透過 [`GameServer`] 的公開入口操作狀態。

use super::registry::GameServer;
use log::{debug, error, info};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 停止旗標的檢查粒度
const STOP_POLL: Duration = Duration::from_millis(50);

/// 執行中的掃描執行緒
pub struct Sweepers {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Sweepers {
    /// 通知停止並等待兩條執行緒結束
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        for handle in self.handles {
            if handle.join().is_err() {
                error!("[SERVER] Sweeper thread panicked");
            }
        }
    }
}

/// 啟動配對與清理掃描
pub fn spawn_sweepers(server: &Arc<GameServer>) -> io::Result<Sweepers> {
    let stop = Arc::new(AtomicBool::new(false));
    let config = server.config().clone();

    let matchmaker = {
        let server = Arc::clone(server);
        spawn_periodic("matchmaking", config.matchmaking_interval, &stop, move || {
            let started = server.matchmaking_sweep();
            if started > 0 {
                debug!("[MATCH] Sweep started {} game(s)", started);
            }
        })?
    };

    let cleaner = {
        let server = Arc::clone(server);
        spawn_periodic("cleanup", config.cleanup_interval, &stop, move || {
            let forfeited = server.cleanup_sweep();
            if forfeited > 0 {
                info!("[CLEANUP] Forfeited {} game(s)", forfeited);
            }
        })?
    };

    info!(
        "[SERVER] Sweepers started (matchmaking every {:?}, cleanup every {:?})",
        config.matchmaking_interval, config.cleanup_interval
    );

    Ok(Sweepers {
        stop,
        handles: vec![matchmaker, cleaner],
    })
}

fn spawn_periodic<F>(
    name: &str,
    interval: Duration,
    stop: &Arc<AtomicBool>,
    mut tick: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    let stop = Arc::clone(stop);
    thread::Builder::new()
        .name(format!("sweep-{}", name))
        .spawn(move || {
            let mut next = Instant::now() + interval;
            while !stop.load(Ordering::SeqCst) {
                let now = Instant::now();
                if now >= next {
                    tick();
                    next = now + interval;
                } else {
                    thread::sleep(STOP_POLL.min(next - now));
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::GameLogger;
    use crate::ai::MoveOracle;
    use crate::collab::{Dispatcher, MemorySink, MemoryStore};
    use crate::config::SessionConfig;
    use crate::net::Connection;
    use crate::protocol::ServerMessage;

    #[test]
    fn test_sweepers_pair_waiting_players() {
        let config = SessionConfig {
            matchmaking_interval: Duration::from_millis(20),
            cleanup_interval: Duration::from_millis(20),
            bot_delay_ms: 0..=0,
            ..SessionConfig::default()
        };
        let dispatcher = Dispatcher::spawn(
            Arc::new(MemoryStore::new()),
            Arc::new(MemorySink::default()),
        );
        let server = GameServer::new(
            config,
            Arc::new(MoveOracle::new(1)),
            dispatcher,
            GameLogger::new(),
        );

        let (alice, alice_rx) = Connection::open();
        let (bob, _bob_rx) = Connection::open();
        server.join("alice", alice).unwrap();
        server.join("bob", bob).unwrap();

        let sweepers = spawn_sweepers(&server).unwrap();
        // WAITING 之後應在幾個掃描週期內收到 GAME_START
        let started = (0..2).any(|_| {
            matches!(
                alice_rx.recv_timeout(Duration::from_secs(5)),
                Ok(ServerMessage::GameStart { .. })
            )
        });
        sweepers.shutdown();

        assert!(started);
        assert_eq!(server.metrics().active_games, 1);
    }
}
