use serde::{Deserialize, Serialize};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;
/// 連成一線所需的棋子數
pub const WIN_LENGTH: usize = 4;

/// 四個檢查軸向 (row 差, col 差)：水平、垂直、兩條對角線
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// 座位 (先手 A，後手 B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    A,
    B,
}

impl Seat {
    /// 對手座位
    pub fn other(self) -> Seat {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }

    /// 協議中使用的玩家編號 (1 或 2)
    pub fn number(self) -> u8 {
        match self {
            Seat::A => 1,
            Seat::B => 2,
        }
    }
}

/// 落子錯誤
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DropError {
    #[error("invalid column (must be 0-{})", COLS - 1)]
    InvalidColumn,
    #[error("column {0} is full")]
    ColumnFull(usize),
}

/// 模擬落子的結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedDrop {
    pub row: usize,
    pub wins: bool,
}

/// 6x7 棋盤，row 0 為最上排
///
/// 重力不變量：非空格子的下方 (row 較大) 必定全為非空。
/// 唯一的修改入口是 [`Board::drop_piece`]，搜尋用的 [`Board::lift_piece`] 只能撤回剛落下的子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [[Option<Seat>; COLS]; ROWS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// 讀取格子內容，超出範圍時回傳 None
    pub fn get(&self, row: usize, col: usize) -> Option<Seat> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// 以帶號座標讀取，越界視為空格
    fn get_signed(&self, row: isize, col: isize) -> Option<Seat> {
        if row < 0 || col < 0 {
            return None;
        }
        self.get(row as usize, col as usize)
    }

    fn in_bounds(row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < ROWS && (col as usize) < COLS
    }

    /// 該欄最低的空位
    pub fn lowest_empty_row(&self, col: usize) -> Option<usize> {
        if col >= COLS {
            return None;
        }
        (0..ROWS).rev().find(|&row| self.cells[row][col].is_none())
    }

    /// 在指定欄落子，回傳落點 row
    pub fn drop_piece(&mut self, col: usize, seat: Seat) -> Result<usize, DropError> {
        if col >= COLS {
            return Err(DropError::InvalidColumn);
        }
        let row = self.lowest_empty_row(col).ok_or(DropError::ColumnFull(col))?;
        self.cells[row][col] = Some(seat);
        Ok(row)
    }

    /// 撤回 (row, col) 上的棋子；只允許撤回該欄最上面的一顆，以維持重力不變量
    pub(crate) fn lift_piece(&mut self, row: usize, col: usize) {
        debug_assert!(row < ROWS && col < COLS);
        debug_assert!(row == 0 || self.cells[row - 1][col].is_none());
        self.cells[row][col] = None;
    }

    /// 經過 (row, col) 的任一軸向是否有 >= 4 顆同座位的連線
    pub fn check_win(&self, row: usize, col: usize, seat: Seat) -> bool {
        if row >= ROWS || col >= COLS || self.cells[row][col] != Some(seat) {
            return false;
        }

        DIRECTIONS
            .iter()
            .any(|&(dr, dc)| self.run_length(row, col, seat, dr, dc) >= WIN_LENGTH)
    }

    /// 經過 (row, col) 沿 (dr, dc) 兩個方向的連續同色長度 (含自身)
    pub fn run_length(&self, row: usize, col: usize, seat: Seat, dr: isize, dc: isize) -> usize {
        let mut count = 1;
        for sign in [1, -1] {
            let mut r = row as isize + dr * sign;
            let mut c = col as isize + dc * sign;
            while Self::in_bounds(r, c) && self.get_signed(r, c) == Some(seat) {
                count += 1;
                r += dr * sign;
                c += dc * sign;
            }
        }
        count
    }

    /// 最上排沒有空位即為滿盤 (重力保證整欄已滿)
    pub fn is_full(&self) -> bool {
        self.cells[0].iter().all(|cell| cell.is_some())
    }

    /// 合法的落子欄位，由左至右
    pub fn legal_moves(&self) -> Vec<usize> {
        (0..COLS).filter(|&col| self.cells[0][col].is_none()).collect()
    }

    /// 試下一子並檢查是否連線，結束前一定還原棋盤
    pub fn simulate_drop(&mut self, col: usize, seat: Seat) -> Result<SimulatedDrop, DropError> {
        let row = self.drop_piece(col, seat)?;
        let wins = self.check_win(row, col, seat);
        self.lift_piece(row, col);
        Ok(SimulatedDrop { row, wins })
    }

    /// 已落子數
    pub fn piece_count(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.is_some()).count()
    }

    /// 協議用的數字盤面 (0 = 空, 1 = A, 2 = B)
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.map_or(0, Seat::number)).collect())
            .collect()
    }

    /// 檢查重力不變量
    pub fn satisfies_gravity(&self) -> bool {
        (0..COLS).all(|col| {
            (0..ROWS - 1).all(|row| self.cells[row][col].is_none() || self.cells[row + 1][col].is_some())
        })
    }

    /// 由文字盤面建立 (最上排在前)，'A' / 'B' 為棋子，其他字元為空
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        assert_eq!(rows.len(), ROWS);
        let mut board = Board::new();
        for (row, line) in rows.iter().enumerate() {
            assert_eq!(line.len(), COLS, "row {} has wrong width", row);
            for (col, ch) in line.chars().enumerate() {
                board.cells[row][col] = match ch {
                    'A' => Some(Seat::A),
                    'B' => Some(Seat::B),
                    _ => None,
                };
            }
        }
        board
    }
}
