use crate::random::RandomGenerator;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Side length of the square grid.
pub const SIZE: usize = 4;
/// Number of cells on the grid.
pub const CELLS: usize = SIZE * SIZE;
/// Probability that a freshly spawned tile is a 4 rather than a 2.
pub const FOUR_PROBABILITY: f64 = 0.1;
/// Bonus added by `Board::heuristic` for every empty cell.
pub const EMPTY_CELL_BONUS: f64 = 8.0;

/// Largest tile that can still merge; two `2^31` tiles would overflow `u32`.
const MAX_MERGEABLE: u32 = 1 << 30;

/// Cell indices of every line, ordered from the edge the tiles slide towards.
const LEFT_LINES: [[usize; SIZE]; SIZE] = [[0, 1, 2, 3], [4, 5, 6, 7], [8, 9, 10, 11], [12, 13, 14, 15]];
const RIGHT_LINES: [[usize; SIZE]; SIZE] = [[3, 2, 1, 0], [7, 6, 5, 4], [11, 10, 9, 8], [15, 14, 13, 12]];
const UP_LINES: [[usize; SIZE]; SIZE] = [[0, 4, 8, 12], [1, 5, 9, 13], [2, 6, 10, 14], [3, 7, 11, 15]];
const DOWN_LINES: [[usize; SIZE]; SIZE] = [[12, 8, 4, 0], [13, 9, 5, 1], [14, 10, 6, 2], [15, 11, 7, 3]];

/// Errors raised while building or growing a board.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum BoardError {
    /// Every cell is occupied, so no tile can be spawned.
    #[error("board is full, no empty cell to spawn a tile")]
    Full,
    /// A cell holds a value that is neither zero nor a power of two.
    #[error("tile value {0} is not a power of two")]
    InvalidTile(u32),
}

/// A direction in which all tiles slide.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord)]
pub enum Move {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Move {
    /// All moves in enumeration order. Expansion and tie-breaking follow this order.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    fn lines(self) -> &'static [[usize; SIZE]; SIZE] {
        match self {
            Move::Up => &UP_LINES,
            Move::Down => &DOWN_LINES,
            Move::Left => &LEFT_LINES,
            Move::Right => &RIGHT_LINES,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        };
        f.write_str(name)
    }
}

impl FromStr for Move {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Move::Up),
            "down" | "d" => Ok(Move::Down),
            "left" | "l" => Ok(Move::Left),
            "right" | "r" => Ok(Move::Right),
            other => Err(format!("unknown move '{other}'")),
        }
    }
}

/// The result of sliding a board in one direction.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct MoveOutcome {
    /// The board after sliding and merging. Identical to the input when `moved` is false.
    pub board: Board,
    /// Sum of the values of all tiles created by merges.
    pub gained: u64,
    /// Whether anything changed. A move that changes nothing is illegal.
    pub moved: bool,
}

/// An immutable 4x4 position of the 2048 game.
///
/// Cells are stored row-major, `0` marks an empty cell and every other value is a
/// power of two. Transitions return new boards and never touch the receiver, so
/// search nodes can hold boards independently of each other.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Default)]
pub struct Board {
    cells: [u32; CELLS],
}

impl Board {
    /// A board without any tiles.
    pub const EMPTY: Board = Board { cells: [0; CELLS] };

    /// Builds a board from row-major cell values.
    pub fn from_cells(cells: [u32; CELLS]) -> Result<Self, BoardError> {
        if let Some(&bad) = cells.iter().find(|&&v| v != 0 && (v == 1 || !v.is_power_of_two())) {
            return Err(BoardError::InvalidTile(bad));
        }
        Ok(Board { cells })
    }

    /// Builds a board from four rows, top to bottom.
    pub fn from_rows(rows: [[u32; SIZE]; SIZE]) -> Result<Self, BoardError> {
        let mut cells = [0; CELLS];
        for (row, values) in rows.iter().enumerate() {
            cells[row * SIZE..(row + 1) * SIZE].copy_from_slice(values);
        }
        Board::from_cells(cells)
    }

    /// The standard opening position: an empty grid with two spawned tiles.
    pub fn new_game<K: RandomGenerator>(rng: &mut K) -> Self {
        let mut board = Board::EMPTY;
        for _ in 0..2 {
            if let Ok(next) = board.spawn_tile(rng) {
                board = next;
            }
        }
        board
    }

    /// Returns the grid as rows, top to bottom.
    pub fn rows(&self) -> [[u32; SIZE]; SIZE] {
        let mut rows = [[0; SIZE]; SIZE];
        for (i, row) in rows.iter_mut().enumerate() {
            row.copy_from_slice(&self.cells[i * SIZE..(i + 1) * SIZE]);
        }
        rows
    }

    /// Value at the given row and column, `0` when empty.
    pub fn cell(&self, row: usize, col: usize) -> u32 {
        self.cells[row * SIZE + col]
    }

    /// Number of empty cells.
    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        CELLS - self.empty_cells()
    }

    /// Highest tile on the board, `0` for an empty board.
    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Sum of all tile values. Merges preserve it; only spawns increase it.
    pub fn tile_sum(&self) -> u64 {
        self.cells.iter().map(|&v| u64::from(v)).sum()
    }

    /// Slides every tile towards `mv`, merging equal neighbours at most once per tile.
    pub fn apply_move(&self, mv: Move) -> MoveOutcome {
        let mut cells = self.cells;
        let mut gained = 0;
        for &line in mv.lines() {
            let values = line.map(|i| self.cells[i]);
            let (slid, line_gain) = slide_line(values);
            for (&i, v) in line.iter().zip(slid) {
                cells[i] = v;
            }
            gained += line_gain;
        }

        let moved = cells != self.cells;
        MoveOutcome {
            board: Board { cells },
            gained,
            moved,
        }
    }

    /// Places a 2 (90%) or a 4 (10%) on a uniformly chosen empty cell.
    pub fn spawn_tile<K: RandomGenerator>(&self, rng: &mut K) -> Result<Board, BoardError> {
        let empty: Vec<usize> = (0..CELLS).filter(|&i| self.cells[i] == 0).collect();
        let &index = rng.get_random_from_slice(&empty).ok_or(BoardError::Full)?;
        let value = if rng.next_f64() < FOUR_PROBABILITY { 4 } else { 2 };

        let mut cells = self.cells;
        cells[index] = value;
        Ok(Board { cells })
    }

    /// Moves that change the board, in `Move::ALL` order.
    pub fn legal_moves(&self) -> Vec<Move> {
        Move::ALL
            .into_iter()
            .filter(|&mv| self.apply_move(mv).moved)
            .collect()
    }

    /// A board is terminal when no move changes it.
    pub fn is_terminal(&self) -> bool {
        Move::ALL.into_iter().all(|mv| !self.apply_move(mv).moved)
    }

    /// Estimated merge score of the position.
    ///
    /// A tile of value `v` built purely from merges of 2s accounts for `v * (log2(v) - 1)`
    /// points of merged value, so the sum over all tiles never decreases along a game.
    pub fn score(&self) -> f64 {
        self.cells
            .iter()
            .filter(|&&v| v >= 4)
            .map(|&v| f64::from(v) * f64::from(v.trailing_zeros() - 1))
            .sum()
    }

    /// Static evaluation: `score()` plus a bonus for each empty cell.
    pub fn heuristic(&self) -> f64 {
        self.score() + EMPTY_CELL_BONUS * self.empty_cells() as f64
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "+------+------+------+------+";
        writeln!(f, "{separator}")?;
        for row in self.rows() {
            for value in row {
                if value == 0 {
                    write!(f, "|      ")?;
                } else {
                    write!(f, "|{value:^6}")?;
                }
            }
            writeln!(f, "|")?;
            writeln!(f, "{separator}")?;
        }
        Ok(())
    }
}

/// Slides one line towards index 0. A tile produced by a merge does not merge again.
fn slide_line(line: [u32; SIZE]) -> ([u32; SIZE], u64) {
    let mut out = [0; SIZE];
    let mut gained = 0;
    let mut pos = 0;
    let mut pending: Option<u32> = None;

    for value in line.into_iter().filter(|&v| v != 0) {
        match pending {
            Some(p) if p == value && p <= MAX_MERGEABLE => {
                out[pos] = p * 2;
                gained += u64::from(p * 2);
                pos += 1;
                pending = None;
            }
            Some(p) => {
                out[pos] = p;
                pos += 1;
                pending = Some(value);
            }
            None => pending = Some(value),
        }
    }
    if let Some(p) = pending {
        out[pos] = p;
    }

    (out, gained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandomGenerator;
    use proptest::prelude::*;

    fn board(rows: [[u32; 4]; 4]) -> Board {
        Board::from_rows(rows).unwrap()
    }

    fn locked_board() -> Board {
        board([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]])
    }

    #[test]
    fn merges_pair_to_the_left() {
        // arrange
        let b = board([[2, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);

        // act
        let outcome = b.apply_move(Move::Left);

        // assert
        assert!(outcome.moved);
        assert_eq!(outcome.gained, 4);
        assert_eq!(
            outcome.board,
            board([[4, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]])
        );
    }

    #[test]
    fn merged_tile_does_not_merge_again() {
        let b = board([[2, 2, 4, 0], [2, 2, 2, 2], [4, 2, 2, 0], [0, 0, 0, 0]]);

        let outcome = b.apply_move(Move::Left);

        assert_eq!(
            outcome.board,
            board([[4, 4, 0, 0], [4, 4, 0, 0], [4, 4, 0, 0], [0, 0, 0, 0]])
        );
        assert_eq!(outcome.gained, 4 + 8 + 4);
    }

    #[test]
    fn slides_in_every_direction() {
        let b = board([[0, 0, 0, 0], [0, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);

        assert_eq!(b.apply_move(Move::Up).board.cell(0, 1), 2);
        assert_eq!(b.apply_move(Move::Down).board.cell(3, 1), 2);
        assert_eq!(b.apply_move(Move::Left).board.cell(1, 0), 2);
        assert_eq!(b.apply_move(Move::Right).board.cell(1, 3), 2);
    }

    #[test]
    fn down_merges_from_the_bottom() {
        let b = board([[2, 0, 0, 0], [2, 0, 0, 0], [2, 0, 0, 0], [0, 0, 0, 0]]);

        let outcome = b.apply_move(Move::Down);

        assert_eq!(outcome.board.cell(3, 0), 4);
        assert_eq!(outcome.board.cell(2, 0), 2);
        assert_eq!(outcome.board.cell(1, 0), 0);
    }

    #[test]
    fn illegal_move_reports_not_moved() {
        let b = board([[2, 4, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);

        let outcome = b.apply_move(Move::Left);

        assert!(!outcome.moved);
        assert_eq!(outcome.board, b);
        assert_eq!(outcome.gained, 0);
        assert!(!b.legal_moves().contains(&Move::Left));
        assert!(b.legal_moves().contains(&Move::Right));
    }

    #[test]
    fn locked_board_is_terminal() {
        let b = locked_board();

        assert!(b.legal_moves().is_empty());
        assert!(b.is_terminal());
    }

    #[test]
    fn full_board_with_pair_is_not_terminal() {
        let b = board([[2, 2, 4, 8], [4, 8, 16, 32], [8, 16, 32, 64], [16, 32, 64, 128]]);

        assert!(!b.is_terminal());
        assert_eq!(b.legal_moves(), vec![Move::Left, Move::Right]);
    }

    #[test]
    fn spawn_on_full_board_fails() {
        let mut rng = SeededRandomGenerator::new(1);

        assert_eq!(locked_board().spawn_tile(&mut rng), Err(BoardError::Full));
    }

    #[test]
    fn spawn_fills_exactly_one_empty_cell() {
        let mut rng = SeededRandomGenerator::new(7);
        let b = board([[2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);

        let spawned = b.spawn_tile(&mut rng).unwrap();

        assert_eq!(spawned.occupied_cells(), 2);
        assert_eq!(spawned.cell(0, 0), 2);
        let added = spawned.tile_sum() - b.tile_sum();
        assert!(added == 2 || added == 4);
    }

    #[test]
    fn spawned_fours_are_rare() {
        let mut rng = SeededRandomGenerator::new(2048);
        let samples = 10_000;

        let fours = (0..samples)
            .filter(|_| Board::EMPTY.spawn_tile(&mut rng).unwrap().tile_sum() == 4)
            .count();

        let ratio = fours as f64 / samples as f64;
        assert!(ratio > 0.07 && ratio < 0.13, "ratio of fours was {ratio}");
    }

    #[test]
    fn new_game_has_two_tiles() {
        let mut rng = SeededRandomGenerator::new(3);

        let b = Board::new_game(&mut rng);

        assert_eq!(b.occupied_cells(), 2);
        assert!(!b.is_terminal());
    }

    #[test]
    fn largest_tiles_do_not_overflow() {
        let top = 1 << 31;
        let b = board([[top, top, 0, 0], [1 << 30, 1 << 30, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);

        let outcome = b.apply_move(Move::Left);

        assert_eq!(outcome.board.rows()[0], [top, top, 0, 0]);
        assert_eq!(outcome.board.rows()[1], [top, 0, 0, 0]);
        assert_eq!(outcome.gained, u64::from(top));
        assert!(outcome.moved);
    }

    #[test]
    fn rejects_values_that_are_not_powers_of_two() {
        let result = Board::from_rows([[3, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);

        assert_eq!(result, Err(BoardError::InvalidTile(3)));
        assert!(Board::from_cells([1; CELLS]).is_err());
    }

    #[test]
    fn score_counts_merged_value() {
        let b = board([[2, 4, 8, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);

        // 4 * 1 + 8 * 2
        assert_eq!(b.score(), 20.0);
        assert_eq!(b.heuristic(), 20.0 + 13.0 * EMPTY_CELL_BONUS);
    }

    #[test]
    fn parses_moves() {
        assert_eq!("Left".parse::<Move>(), Ok(Move::Left));
        assert_eq!("u".parse::<Move>(), Ok(Move::Up));
        assert!("sideways".parse::<Move>().is_err());
        assert_eq!(Move::Down.to_string(), "down");
    }

    fn any_board() -> impl Strategy<Value = Board> {
        let cell = prop_oneof![3 => Just(0u32), 2 => (1u32..12).prop_map(|e| 1 << e)];
        prop::array::uniform16(cell).prop_map(|cells| Board::from_cells(cells).unwrap())
    }

    proptest! {
        #[test]
        fn no_op_moves_leave_board_unchanged(b in any_board()) {
            for mv in Move::ALL {
                let outcome = b.apply_move(mv);
                if !outcome.moved {
                    prop_assert_eq!(outcome.board, b);
                    prop_assert_eq!(outcome.gained, 0);
                }
            }
        }

        #[test]
        fn moves_preserve_tile_mass(b in any_board()) {
            for mv in b.legal_moves() {
                let outcome = b.apply_move(mv);
                prop_assert_eq!(outcome.board.tile_sum(), b.tile_sum());
                prop_assert!(outcome.board.occupied_cells() <= b.occupied_cells());
                prop_assert!(outcome.board.score() >= b.score());
            }
        }

        #[test]
        fn terminal_iff_no_legal_moves(b in any_board()) {
            prop_assert_eq!(b.legal_moves().is_empty(), b.is_terminal());
        }
    }
}
