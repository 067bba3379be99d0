pub mod board;
pub mod state;

pub use board::{Board, DropError, Seat, SimulatedDrop, COLS, ROWS, WIN_LENGTH};
pub use state::{AppliedMove, Game, GameId, GameStatus, MoveError, MoveOutcome, Player, Winner};
