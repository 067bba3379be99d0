use super::connection::{ClientReceiver, Connection, ConnectionId};
use crate::lobby::{GameServer, JoinOutcome};
use crate::protocol::{ClientMessage, Codec, ServerMessage};
use log::{debug, error, info, warn};
use std::io;
use std::net::TcpStream;
use std::sync::mpsc::TryRecvError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Connection handler - 處理單一連線的讀寫
///
/// 讀到的訊息直接交給 [`GameServer`]；要送給 client 的訊息
/// 從 channel 取出後寫入 socket。
pub struct ConnectionHandler {
    connection: Connection,
    codec: Codec,
    client_rx: ClientReceiver,
    server: Arc<GameServer>,
    username: Option<String>,
}

impl ConnectionHandler {
    /// 建立新的 connection handler
    pub fn new(stream: TcpStream, server: Arc<GameServer>) -> io::Result<Self> {
        // 設定 timeout 以便檢查 client_rx
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let codec = Codec::new(stream)?;
        let (connection, client_rx) = Connection::open();

        Ok(Self {
            connection,
            codec,
            client_rx,
            server,
            username: None,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// 執行 handler 主迴圈
    pub fn run(mut self) {
        let conn_id = self.id();

        loop {
            match self.codec.read_message() {
                Ok(Some(msg)) => {
                    debug!("[HANDLER] Connection #{} received: {:?}", conn_id, msg);
                    self.dispatch(msg);
                }
                Ok(None) => {
                    info!("[HANDLER] Connection #{} EOF", conn_id);
                    break;
                }
                Err(e) => match e.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                        // Timeout - 繼續檢查 client_rx
                    }
                    io::ErrorKind::InvalidData => {
                        warn!("[HANDLER] Connection #{} sent bad line: {}", conn_id, e);
                        self.reply(ServerMessage::error("Invalid message format"));
                    }
                    _ => {
                        warn!("[HANDLER] Connection #{} read error: {}", conn_id, e);
                        break;
                    }
                },
            }

            if !self.flush_outbound() {
                break;
            }
        }

        // 通知 registry 連線已斷開 (若仍是座位上的連線)
        if let Some(username) = self.username.take() {
            self.server.disconnect(&username, conn_id);
        }
    }

    /// 把 channel 內待送的訊息寫入 socket，寫入失敗時回傳 false
    fn flush_outbound(&mut self) -> bool {
        loop {
            match self.client_rx.try_recv() {
                Ok(msg) => {
                    if let Err(e) = self.codec.send_message(&msg) {
                        warn!("[HANDLER] Connection #{} send error: {}", self.id(), e);
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// 回覆只經過同一條 channel，與廣播維持順序
    fn reply(&self, msg: ServerMessage) {
        let _ = self.connection.send(msg);
    }

    fn dispatch(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::Ping => self.reply(ServerMessage::Pong),

            ClientMessage::Join { username } => {
                match self.server.join(&username, self.connection.clone()) {
                    // 只有真正佔到佇列位置或座位的連線才綁定名稱
                    Ok(JoinOutcome::Queued) | Ok(JoinOutcome::Rejoined(_)) => {
                        self.bind_username(username)
                    }
                    Ok(JoinOutcome::AlreadyWaiting) | Ok(JoinOutcome::Dropped) => {
                        debug!("[HANDLER] Connection #{} duplicate join '{}'", self.id(), username);
                    }
                    Err(e) => self.reply(ServerMessage::error(e.to_string())),
                }
            }

            ClientMessage::Move { column } => {
                let Some(username) = self.username.as_deref() else {
                    self.reply(ServerMessage::error("Join a game first"));
                    return;
                };
                if let Err(e) = self.server.handle_move_request(username, column) {
                    self.reply(ServerMessage::error(e.to_string()));
                }
            }

            ClientMessage::Reconnect { username } => {
                match self.server.reconnect(&username, self.connection.clone()) {
                    Ok(_) => self.bind_username(username),
                    Err(e) => self.reply(ServerMessage::error(e.to_string())),
                }
            }
        }
    }

    /// 換名稱時先讓舊名稱離開
    fn bind_username(&mut self, username: String) {
        if let Some(previous) = self.username.replace(username) {
            if Some(previous.as_str()) != self.username.as_deref() {
                self.server.disconnect(&previous, self.id());
            }
        }
    }
}

/// 在新執行緒中啟動 connection handler
pub fn spawn_handler(stream: TcpStream, server: Arc<GameServer>) -> io::Result<ConnectionId> {
    let handler = ConnectionHandler::new(stream, server)?;
    let conn_id = handler.id();

    thread::Builder::new()
        .name(format!("conn-{}", conn_id))
        .spawn(move || handler.run())?;

    Ok(conn_id)
}

/// 接受連線並為每條連線開一個 handler 執行緒
pub fn accept_loop(listener: std::net::TcpListener, server: Arc<GameServer>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let peer_addr = stream
                    .peer_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|_| "unknown".to_string());

                match spawn_handler(stream, Arc::clone(&server)) {
                    Ok(conn_id) => info!("[ACCEPT] New connection #{} from {}", conn_id, peer_addr),
                    Err(e) => warn!("[ACCEPT] Failed to spawn handler for {}: {}", peer_addr, e),
                }
            }
            Err(e) => {
                error!("[ACCEPT] Accept error: {}", e);
            }
        }
    }
}
