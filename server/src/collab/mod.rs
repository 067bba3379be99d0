//! 外部協作者 - 戰績儲存與生命週期事件

pub mod dispatch;
pub mod events;
pub mod store;

pub use dispatch::Dispatcher;
#[cfg(test)]
pub use events::MemorySink;
pub use events::{EventSink, FileSink, LifecycleEvent, LifecycleKind, LogSink, SinkError};
pub use store::{GameRecord, GameStore, MemoryStore, Outcome, PlayerStats, StoreError};
