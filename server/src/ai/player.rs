//! Bot 玩家定義

use super::oracle::MoveStrategy;
use crate::game::{Board, Player, Seat};
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Bot 的固定名稱 (不進入 username 索引，也不記戰績)
pub const BOT_USERNAME: &str = "BOT";

/// 內建 bot 玩家
///
/// 與真人玩家不同，bot 沒有連線，
/// 它的每一步由 server 端的 [`MoveStrategy`] 決定。
#[derive(Debug, Clone)]
pub struct BotPlayer {
    pub seat: Seat,
    /// 模擬思考時間的範圍 (毫秒)
    pub delay_ms: RangeInclusive<u64>,
}

impl BotPlayer {
    pub fn new(seat: Seat, delay_ms: RangeInclusive<u64>) -> Self {
        Self { seat, delay_ms }
    }

    /// 建立可入座的 Player
    pub fn seat_player(&self) -> Player {
        Player::bot(BOT_USERNAME, self.seat)
    }

    /// 隨機思考時間
    pub fn think_delay(&self) -> Duration {
        let (min, max) = (*self.delay_ms.start(), *self.delay_ms.end());
        if min >= max {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// 對盤面快照選步
    pub fn choose_column(&self, strategy: &dyn MoveStrategy, board: &Board) -> Option<usize> {
        strategy.select_move(board, self.seat)
    }
}
