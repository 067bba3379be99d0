use crate::protocol::ServerMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

/// 連線 ID 類型
pub type ConnectionId = u64;

/// 全域連線 ID 計數器
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 產生新的連線 ID
pub fn next_connection_id() -> ConnectionId {
    CONNECTION_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// 用於發送訊息給特定 client 的 sender
pub type ClientSender = mpsc::Sender<ServerMessage>;

/// 用於接收訊息的 receiver (connection handler 持有)
pub type ClientReceiver = mpsc::Receiver<ServerMessage>;

/// 建立 client 的訊息通道
pub fn create_client_channel() -> (ClientSender, ClientReceiver) {
    mpsc::channel()
}

/// 對端 handler 已結束，訊息無法送達
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection #{0} closed")]
pub struct ConnectionClosed(pub ConnectionId);

/// 座位持有的連線 handle
///
/// 只是一個 outbound 通道加上連線 ID；實際的 socket 寫入由
/// connection handler 執行緒負責，所以在 registry lock 內送訊息不會卡在 I/O。
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    sender: ClientSender,
}

impl Connection {
    pub fn new(id: ConnectionId, sender: ClientSender) -> Self {
        Self { id, sender }
    }

    /// 配發新 ID 並建立通道，回傳 handle 與接收端
    pub fn open() -> (Self, ClientReceiver) {
        let (tx, rx) = create_client_channel();
        (Self::new(next_connection_id(), tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// 送出訊息 (不阻塞)
    pub fn send(&self, msg: ServerMessage) -> Result<(), ConnectionClosed> {
        self.sender.send(msg).map_err(|_| ConnectionClosed(self.id))
    }
}
