pub mod handshake;
pub mod registry;
pub mod sweeper;

pub use handshake::{validate_username, UsernameError};
pub use registry::{GameServer, GameSummary, JoinOutcome, Metrics, SessionError};
pub use sweeper::{spawn_sweepers, Sweepers};
