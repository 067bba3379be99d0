//! Bot 選步
//!
//! 三層策略：
//! 1. 能直接獲勝就下 (由左至右第一個)
//! 2. 對手下一步能獲勝就擋
//! 3. 否則以 alpha-beta 剪枝的 minimax 搜尋固定深度

use super::heuristic::evaluate;
use crate::game::{Board, Seat, COLS};

/// 預設搜尋深度 (ply)
pub const DEFAULT_SEARCH_DEPTH: u32 = 5;
/// 搜尋中找到勝利的基準分數
pub const WIN_SCORE: i32 = 10_000;

/// 選步策略
pub trait MoveStrategy: Send + Sync {
    /// 選擇要下的欄位；沒有合法步時回傳 None
    fn select_move(&self, board: &Board, seat: Seat) -> Option<usize>;
}

/// Minimax 選步器
#[derive(Debug, Clone)]
pub struct MoveOracle {
    depth: u32,
}

impl MoveOracle {
    pub fn new(depth: u32) -> Self {
        Self { depth: depth.max(1) }
    }

    /// 第一個能讓 `seat` 立即連線的欄位
    fn immediate_win(board: &mut Board, legal: &[usize], seat: Seat) -> Option<usize> {
        legal
            .iter()
            .copied()
            .find(|&col| board.simulate_drop(col, seat).is_ok_and(|d| d.wins))
    }

    /// 搜尋根節點：同分取最左，沒有任何步高於初始值時退回中央欄
    fn search(&self, board: &mut Board, seat: Seat, legal: &[usize]) -> usize {
        let mut best_move = if legal.contains(&(COLS / 2)) {
            COLS / 2
        } else {
            legal[legal.len() / 2]
        };
        let mut best_score = i32::MIN;
        let mut alpha = i32::MIN;
        let beta = i32::MAX;

        for &col in legal {
            let Ok(row) = board.drop_piece(col, seat) else {
                continue;
            };
            let score = self.minimax(board, self.depth, false, alpha, beta, seat);
            board.lift_piece(row, col);

            if score > best_score {
                best_score = score;
                best_move = col;
            }
            alpha = alpha.max(best_score);
        }

        best_move
    }

    /// 勝利分數扣掉深度 (偏好最快的勝利)，失敗分數加上深度 (盡量拖延)
    fn minimax(
        &self,
        board: &mut Board,
        depth: u32,
        maximizing: bool,
        mut alpha: i32,
        mut beta: i32,
        seat: Seat,
    ) -> i32 {
        if depth == 0 {
            return evaluate(board, seat);
        }
        if board.is_full() {
            return 0;
        }

        let plies = (self.depth - depth) as i32;
        let mover = if maximizing { seat } else { seat.other() };
        let mut best = if maximizing { i32::MIN } else { i32::MAX };

        for col in board.legal_moves() {
            let Ok(row) = board.drop_piece(col, mover) else {
                continue;
            };

            if board.check_win(row, col, mover) {
                board.lift_piece(row, col);
                return if maximizing {
                    WIN_SCORE - plies
                } else {
                    -WIN_SCORE + plies
                };
            }

            let score = self.minimax(board, depth - 1, !maximizing, alpha, beta, seat);
            board.lift_piece(row, col);

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            if beta <= alpha {
                break;
            }
        }

        best
    }
}

impl Default for MoveOracle {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEPTH)
    }
}

impl MoveStrategy for MoveOracle {
    fn select_move(&self, board: &Board, seat: Seat) -> Option<usize> {
        // 在副本上搜尋，呼叫端的盤面不會被動到
        let mut scratch = *board;
        let legal = scratch.legal_moves();
        if legal.is_empty() {
            return None;
        }

        if let Some(col) = Self::immediate_win(&mut scratch, &legal, seat) {
            return Some(col);
        }
        if let Some(col) = Self::immediate_win(&mut scratch, &legal, seat.other()) {
            return Some(col);
        }

        let col = self.search(&mut scratch, seat, &legal);
        debug_assert_eq!(scratch, *board);
        Some(col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_no_move_on_full_board() {
        let board = Board::from_rows(&[
            "AABBAAB", "BBAABBA", "AABBAAB", "BBAABBA", "AABBAAB", "BBAABBA",
        ]);
        assert_eq!(MoveOracle::default().select_move(&board, Seat::A), None);
    }

    #[test]
    fn test_takes_immediate_win() {
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".......",
            ".......",
            ".....B.",
            ".AAA.B.",
        ]);
        // 第 0 欄與第 4 欄都能連成四子，取掃描順序的第一個
        assert_eq!(MoveOracle::default().select_move(&board, Seat::A), Some(0));
    }

    #[test]
    fn test_prefers_win_over_block() {
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".......",
            "......A",
            "B.....A",
            "BBB...A",
        ]);
        // B 可在第 3 欄連成水平四連，但 A 在第 6 欄就能直接贏
        assert_eq!(MoveOracle::new(1).select_move(&board, Seat::A), Some(6));
    }

    #[test]
    fn test_blocks_opponent_win() {
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".......",
            ".A.....",
            ".A.....",
            ".A..BB.",
        ]);
        assert_eq!(MoveOracle::new(2).select_move(&board, Seat::B), Some(1));
    }

    #[test]
    fn test_vertical_three_wins_on_top() {
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".......",
            "..B....",
            "..B.A..",
            "..B.AA.",
        ]);
        assert_eq!(MoveOracle::default().select_move(&board, Seat::B), Some(2));
    }

    #[test]
    fn test_select_move_leaves_board_untouched() {
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".......",
            "...B...",
            "..BA...",
            ".AAB...",
        ]);
        let before = board;
        let oracle = MoveOracle::new(4);
        let first = oracle.select_move(&board, Seat::A);
        assert_eq!(board, before);
        assert_eq!(oracle.select_move(&board, Seat::A), first);
    }

    #[test]
    fn test_search_avoids_handing_over_a_win() {
        // A 若下第 3 欄，B 疊在上面就完成水平四連
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".......",
            ".......",
            "BBB...A",
            "ABA...A",
        ]);
        let col = MoveOracle::new(1).select_move(&board, Seat::A).unwrap();
        assert_ne!(col, 3);
        assert!(board.legal_moves().contains(&col));
    }

    /// `seat` 先下 `col`，再從對手的回應開始搜尋
    fn score_after(oracle: &MoveOracle, board: &Board, col: usize, seat: Seat) -> i32 {
        let mut board = *board;
        board.drop_piece(col, seat).unwrap();
        oracle.minimax(&mut board, oracle.depth, false, i32::MIN, i32::MAX, seat)
    }

    #[test]
    fn test_search_prefers_faster_forced_win() {
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".......",
            ".......",
            "......B",
            ".AA...B",
        ]);
        let oracle = MoveOracle::new(3);

        // 第 3 欄造成兩端開放的三連，下一手必勝；第 0 欄只有單一威脅會被擋
        assert_eq!(score_after(&oracle, &board, 3, Seat::A), WIN_SCORE - 1);
        assert!(score_after(&oracle, &board, 0, Seat::A) < WIN_SCORE - 1);
        assert_eq!(oracle.select_move(&board, Seat::A), Some(3));
    }

    #[test]
    fn test_search_delays_unavoidable_loss() {
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".AA....",
            ".AA....",
            ".BB....",
            "BBB.A..",
        ]);
        let oracle = MoveOracle::new(3);

        // 不擋第 3 欄立刻輸；擋了之後 B 疊在上面做出雙威脅，晚兩手才輸
        assert_eq!(score_after(&oracle, &board, 3, Seat::A), -WIN_SCORE + 2);
        for col in [0, 1, 2, 4, 5, 6] {
            assert_eq!(score_after(&oracle, &board, col, Seat::A), -WIN_SCORE, "column {}", col);
        }

        let mut scratch = board;
        let legal = scratch.legal_moves();
        assert_eq!(oracle.search(&mut scratch, Seat::A, &legal), 3);
        assert_eq!(scratch, board);
    }

    #[test]
    fn test_always_returns_legal_column() {
        let mut rng = StdRng::seed_from_u64(42);
        let oracle = MoveOracle::new(2);

        for _ in 0..30 {
            let mut board = Board::new();
            let mut seat = Seat::A;
            let plies = rng.gen_range(0..30);
            for _ in 0..plies {
                let legal = board.legal_moves();
                if legal.is_empty() {
                    break;
                }
                let col = legal[rng.gen_range(0..legal.len())];
                board.drop_piece(col, seat).unwrap();
                seat = seat.other();
            }

            match oracle.select_move(&board, seat) {
                Some(col) => assert!(board.legal_moves().contains(&col)),
                None => assert!(board.is_full()),
            }
        }
    }
}
