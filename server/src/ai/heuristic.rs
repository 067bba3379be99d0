//! 盤面評估
//!
//! 對每顆棋子沿四個軸向計算連子數與開放端，
//! 連子越長、越開放分數越高，對手的分數對稱扣除。

use crate::game::board::DIRECTIONS;
use crate::game::{Board, Seat, COLS, ROWS, WIN_LENGTH};

/// 四連 (已分勝負)
pub const RUN_FOUR: i32 = 1000;
/// 開放三連
pub const OPEN_THREE: i32 = 100;
/// 開放二連
pub const OPEN_TWO: i32 = 10;
/// 兩端皆空的單子
pub const OPEN_SINGLE: i32 = 1;
/// 中央欄每顆棋子的加分
pub const CENTER_BONUS: i32 = 3;

const CENTER_COL: usize = COLS / 2;

/// 以 `seat` 的角度評估盤面
pub fn evaluate(board: &Board, seat: Seat) -> i32 {
    let mut score = 0;

    for row in 0..ROWS {
        for col in 0..COLS {
            match board.get(row, col) {
                Some(owner) if owner == seat => score += position_score(board, row, col, owner),
                Some(owner) => score -= position_score(board, row, col, owner),
                None => {}
            }
        }
    }

    for row in 0..ROWS {
        match board.get(row, CENTER_COL) {
            Some(owner) if owner == seat => score += CENTER_BONUS,
            Some(_) => score -= CENTER_BONUS,
            None => {}
        }
    }

    score
}

/// 單顆棋子在四個軸向上的分數
pub fn position_score(board: &Board, row: usize, col: usize, seat: Seat) -> i32 {
    DIRECTIONS
        .iter()
        .map(|&(dr, dc)| {
            let mut count = 1;
            let mut open_ends = 0;

            for sign in [1isize, -1] {
                for step in 1..WIN_LENGTH as isize {
                    let r = row as isize + dr * sign * step;
                    let c = col as isize + dc * sign * step;
                    if r < 0 || c < 0 || r as usize >= ROWS || c as usize >= COLS {
                        break;
                    }
                    match board.get(r as usize, c as usize) {
                        Some(owner) if owner == seat => count += 1,
                        Some(_) => break,
                        None => {
                            open_ends += 1;
                            break;
                        }
                    }
                }
            }

            run_weight(count, open_ends)
        })
        .sum()
}

fn run_weight(count: usize, open_ends: u32) -> i32 {
    match (count, open_ends) {
        (c, _) if c >= WIN_LENGTH => RUN_FOUR,
        (3, o) if o > 0 => OPEN_THREE,
        (2, o) if o > 0 => OPEN_TWO,
        (1, o) if o > 1 => OPEN_SINGLE,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_board_is_neutral() {
        let board = Board::new();
        assert_eq!(evaluate(&board, Seat::A), 0);
        assert_eq!(evaluate(&board, Seat::B), 0);
    }

    #[test]
    fn test_center_piece_beats_edge_piece() {
        let mut center = Board::new();
        center.drop_piece(3, Seat::A).unwrap();
        let mut edge = Board::new();
        edge.drop_piece(0, Seat::A).unwrap();

        assert_eq!(evaluate(&center, Seat::A), OPEN_SINGLE + CENTER_BONUS);
        assert_eq!(evaluate(&edge, Seat::A), 0);
    }

    #[test]
    fn test_scores_are_symmetric() {
        let board = Board::from_rows(&[
            ".......",
            ".......",
            ".......",
            "...B...",
            "..BA...",
            ".AAAB..",
        ]);
        assert_eq!(evaluate(&board, Seat::A), -evaluate(&board, Seat::B));
    }

    #[test]
    fn test_longer_open_runs_weigh_more() {
        let two = Board::from_rows(&[
            ".......", ".......", ".......", ".......", ".......", "AA.....",
        ]);
        let three = Board::from_rows(&[
            ".......", ".......", ".......", ".......", ".......", "AAA....",
        ]);
        assert_eq!(position_score(&two, 5, 0, Seat::A), OPEN_TWO);
        assert_eq!(position_score(&three, 5, 0, Seat::A), OPEN_THREE);
        assert!(evaluate(&three, Seat::A) > evaluate(&two, Seat::A));
    }

    #[test]
    fn test_blocked_run_scores_nothing() {
        let board = Board::from_rows(&[
            ".......", ".......", ".......", ".......", ".......", "AAB....",
        ]);
        // 水平被 B 擋住，左側是邊界
        assert_eq!(run_weight(2, 0), 0);
        assert_eq!(position_score(&board, 5, 0, Seat::A), 0);
    }
}
