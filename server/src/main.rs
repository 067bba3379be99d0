use four_in_a_row::admin::{spawn_admin_server, AdminConfig, GameLogger};
use four_in_a_row::ai::MoveOracle;
use four_in_a_row::collab::{Dispatcher, EventSink, FileSink, LogSink, MemoryStore};
use four_in_a_row::config::ServerConfig;
use four_in_a_row::lobby::{spawn_sweepers, GameServer};
use four_in_a_row::net::{accept_loop, create_tcp_listener};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("[SERVER] {}", e);
            process::exit(1);
        }
    };

    let sink: Arc<dyn EventSink> = match &config.event_log_path {
        Some(path) => match FileSink::open(path) {
            Ok(sink) => {
                info!("[EVENT] Writing lifecycle events to {}", path.display());
                Arc::new(sink)
            }
            Err(e) => {
                warn!(
                    "[EVENT] Failed to open {}: {} (falling back to log output)",
                    path.display(),
                    e
                );
                Arc::new(LogSink)
            }
        },
        None => Arc::new(LogSink),
    };

    let dispatcher = Dispatcher::spawn(Arc::new(MemoryStore::new()), sink);
    let server = GameServer::new(
        config.session.clone(),
        Arc::new(MoveOracle::new(config.bot_search_depth)),
        dispatcher,
        GameLogger::new(),
    );

    // 背景掃描跟著行程一起結束，不需要保留 handle
    let _sweepers = match spawn_sweepers(&server) {
        Ok(s) => s,
        Err(e) => {
            error!("[SERVER] Failed to start sweepers: {}", e);
            process::exit(1);
        }
    };

    let admin_config = AdminConfig {
        auth_token: config.admin_auth_token.clone(),
        addr: SocketAddr::from(([0, 0, 0, 0], config.admin_port)),
    };
    match spawn_admin_server(admin_config, Arc::clone(&server)) {
        Ok(addr) => info!("[SERVER] Admin console on {}", addr),
        Err(e) => warn!(
            "[SERVER] Failed to start admin server: {} (continuing without admin)",
            e
        ),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match create_tcp_listener(addr) {
        Ok(l) => l,
        Err(e) => {
            error!("[SERVER] Failed to create listener: {}", e);
            process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(local) => info!("[SERVER] Listening on {}", local),
        Err(e) => warn!("[SERVER] Listening on {} ({})", addr, e),
    }

    accept_loop(listener, server);
}
