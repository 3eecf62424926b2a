//! Gomoku game rules: board state, legal moves, the terminal test and the
//! feature encoding consumed by the evaluator.

use std::fmt;

use board_game_traits::{Color, GameResult, Position as PositionTrait};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::search::ActionIndex;

/// A location on the board, stored as a row-major cell index.
///
/// The same index is used as the action id exchanged with the external
/// evaluator, so a `Square` is also the move type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Square(u16);

impl Square {
    pub fn from_index(index: usize) -> Self {
        Square(index as u16)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn from_row_col(row: usize, col: usize, size: usize) -> Self {
        debug_assert!(row < size && col < size);
        Square((row * size + col) as u16)
    }

    pub fn row(self, size: usize) -> usize {
        self.index() / size
    }

    pub fn col(self, size: usize) -> usize {
        self.index() % size
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ActionIndex for Square {
    fn from_action(action: usize) -> Self {
        Square::from_index(action)
    }

    fn action(self) -> usize {
        self.index()
    }
}

/// The integer encoding of a player used by the training pipeline:
/// player 0 moves first.
pub fn player_index(color: Color) -> i32 {
    match color {
        Color::White => 0,
        Color::Black => 1,
    }
}

/// The integer encoding of a finished game: the winning player's index,
/// or -1 for a draw.
pub fn winner_index(result: GameResult) -> i32 {
    match result {
        GameResult::WhiteWin => 0,
        GameResult::BlackWin => 1,
        GameResult::Draw => -1,
    }
}

/// Pure board state: stones, side to move and the move history.
///
/// The board knows nothing about the winning condition; that lives in
/// [`Game`].
#[derive(PartialEq, Eq, Debug)]
pub struct Board {
    size: usize,
    cells: Box<[Option<Color>]>,
    to_move: Color,
    history: Vec<Square>,
}

impl Clone for Board {
    fn clone(&self) -> Self {
        Board {
            size: self.size,
            cells: self.cells.clone(),
            to_move: self.to_move,
            history: self.history.clone(),
        }
    }

    /// Reuses the existing allocations when the board sizes match. The
    /// search restores its scratch board from a snapshot on every
    /// simulation, so this path must not allocate.
    fn clone_from(&mut self, source: &Self) {
        if self.size == source.size {
            self.cells.copy_from_slice(&source.cells);
        } else {
            self.size = source.size;
            self.cells = source.cells.clone();
        }
        self.to_move = source.to_move;
        self.history.clone_from(&source.history);
    }
}

impl Board {
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![None; size * size].into_boxed_slice(),
            to_move: Color::White,
            history: vec![],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_cells(&self) -> usize {
        self.size * self.size
    }

    pub fn side_to_move(&self) -> Color {
        self.to_move
    }

    pub fn history(&self) -> &[Square] {
        &self.history
    }

    pub fn get(&self, square: Square) -> Option<Color> {
        self.cells[square.index()]
    }

    /// Places a stone for the side to move. The cell must be empty.
    pub fn step(&mut self, square: Square) {
        assert!(
            self.cells[square.index()].is_none(),
            "Cell {} is already occupied",
            square
        );
        self.cells[square.index()] = Some(self.to_move);
        self.to_move = !self.to_move;
        self.history.push(square);
    }

    /// Adds every empty cell, in row-major order.
    pub fn legal_actions(&self, actions: &mut Vec<Square>) {
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.is_none() {
                actions.push(Square::from_index(index));
            }
        }
    }

    /// Encodes the position into `2 * num_player_planes + 1` binary planes.
    ///
    /// Planes `0..P` hold player 0's stones, planes `P..2P` player 1's, where
    /// plane `i` sees the board as it was before the last `2i` half-moves.
    /// The final plane is constant, equal to the side to move.
    pub fn encode(&self, num_player_planes: usize) -> Vec<i32> {
        let area = self.num_cells();
        let mut encoded = vec![0; (2 * num_player_planes + 1) * area];
        let mut cells = self.cells.to_vec();
        let mut remaining = self.history.len();
        for plane in 0..num_player_planes {
            if plane > 0 {
                // Rewind one full move: un-place the two most recent stones
                for _ in 0..2 {
                    if remaining == 0 {
                        break;
                    }
                    remaining -= 1;
                    cells[self.history[remaining].index()] = None;
                }
            }
            for (index, cell) in cells.iter().enumerate() {
                match cell {
                    Some(Color::White) => encoded[plane * area + index] = 1,
                    Some(Color::Black) => {
                        encoded[(num_player_planes + plane) * area + index] = 1
                    }
                    None => (),
                }
            }
        }
        let side = player_index(self.to_move);
        for index in 0..area {
            encoded[2 * num_player_planes * area + index] = side;
        }
        encoded
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Player: {}", player_index(self.to_move))?;
        for row in 0..self.size {
            for col in 0..self.size {
                match self.cells[row * self.size + col] {
                    None => write!(f, " -")?,
                    Some(Color::White) => write!(f, " O")?,
                    Some(Color::Black) => write!(f, " X")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// The four scan directions for the win check. Together with their
/// reflections they cover every line on the board.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 1), (1, 0), (1, -1)];

/// A [`Board`] together with the winning condition and the cached outcome.
#[derive(PartialEq, Eq, Debug)]
pub struct Game {
    board: Board,
    win_length: usize,
    result: Option<GameResult>,
}

impl Clone for Game {
    fn clone(&self) -> Self {
        Game {
            board: self.board.clone(),
            win_length: self.win_length,
            result: self.result,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.board.clone_from(&source.board);
        self.win_length = source.win_length;
        self.result = source.result;
    }
}

impl Game {
    pub fn new(board_size: usize, win_length: usize) -> Self {
        Game {
            board: Board::new(board_size),
            win_length,
            result: None,
        }
    }

    pub fn reset(&mut self) {
        self.board = Board::new(self.board.size);
        self.result = None;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Takes an immutable copy of the board, suitable for [`Game::restore`].
    pub fn snapshot(&self) -> Board {
        self.board.clone()
    }

    pub fn restore(&mut self, stat: &Board) {
        self.board = stat.clone();
        self.result = None;
    }

    pub fn step(&mut self, square: Square) {
        self.board.step(square);
    }

    pub fn legal_actions(&self, actions: &mut Vec<Square>) {
        self.board.legal_actions(actions);
    }

    pub fn encode(&self, num_player_planes: usize) -> Vec<i32> {
        self.board.encode(num_player_planes)
    }

    /// Runs the terminal test and caches the outcome. Must not be called
    /// again once the game has finished.
    pub fn check_finished(&mut self) -> Option<GameResult> {
        assert!(
            self.result.is_none(),
            "Terminal test called on a finished game"
        );
        self.result = self.scan_result();
        self.result
    }

    /// Scans every occupied cell for a run of `win_length` stones along the
    /// four forward directions.
    fn scan_result(&self) -> Option<GameResult> {
        let size = self.board.size as isize;
        let mut blank_count = 0;
        for row in 0..size {
            for col in 0..size {
                let Some(color) = self.board.cells[(row * size + col) as usize] else {
                    blank_count += 1;
                    continue;
                };
                for (dx, dy) in DIRECTIONS {
                    let (mut x, mut y, mut count) = (row, col, 0);
                    while x >= 0
                        && x < size
                        && y >= 0
                        && y < size
                        && self.board.cells[(x * size + y) as usize] == Some(color)
                    {
                        count += 1;
                        x += dx;
                        y += dy;
                    }
                    if count >= self.win_length {
                        return Some(match color {
                            Color::White => GameResult::WhiteWin,
                            Color::Black => GameResult::BlackWin,
                        });
                    }
                }
            }
        }
        if blank_count == 0 {
            Some(GameResult::Draw)
        } else {
            None
        }
    }
}

impl PositionTrait for Game {
    type Move = Square;
    type ReverseMove = Square;
    type Settings = ();

    /// The standard 15x15 game with five in a row to win.
    fn start_position() -> Self {
        Game::new(15, 5)
    }

    fn start_position_with_settings(_settings: &Self::Settings) -> Self {
        Game::new(15, 5)
    }

    fn side_to_move(&self) -> Color {
        self.board.to_move
    }

    fn generate_moves<E: Extend<Self::Move>>(&self, moves: &mut E) {
        let mut buf = Vec::new();
        self.board.legal_actions(&mut buf);
        moves.extend(buf);
    }

    fn do_move(&mut self, mv: Self::Move) -> Self::ReverseMove {
        self.board.step(mv);
        mv
    }

    fn reverse_move(&mut self, reverse_move: Self::ReverseMove) {
        let last = self.board.history.pop();
        debug_assert_eq!(last, Some(reverse_move));
        self.board.cells[reverse_move.index()] = None;
        self.board.to_move = !self.board.to_move;
        self.result = None;
    }

    fn game_result(&self) -> Option<GameResult> {
        self.result.or_else(|| self.scan_result())
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.board, f)
    }
}
