pub mod connection;
pub mod handler;
pub mod listener;

pub use connection::{
    create_client_channel, next_connection_id, ClientReceiver, ClientSender, Connection,
    ConnectionClosed, ConnectionId,
};
pub use handler::{accept_loop, spawn_handler};
pub use listener::create_tcp_listener;
