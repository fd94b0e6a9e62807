//! Tic-tac-toe game logic - Board, turn order and win detection.
//!
//! Cells are numbered 0..9 row by row. The challenger plays `X` and moves first.

use std::fmt;
use thiserror::Error;

/// A player's mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// First player
    X,
    /// Second player
    O,
}

impl Mark {
    /// The other mark.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "❌"),
            Self::O => write!(f, "⭕"),
        }
    }
}

/// Rejected moves.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// The user is not one of the two players
    #[error("you're not playing in this game")]
    NotAPlayer,
    /// The other player is to move
    #[error("it's not your turn")]
    NotYourTurn,
    /// Cell already marked
    #[error("that cell is already taken")]
    CellTaken,
    /// Cell index outside the board
    #[error("cell {0} is not on the board")]
    OutOfRange(usize),
    /// The game already ended
    #[error("the game is already over")]
    GameOver,
}

/// Game state after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Waiting for this mark to move
    InProgress {
        /// Mark to move next
        next: Mark,
    },
    /// Three in a row
    Won {
        /// Winning mark
        winner: Mark,
        /// The winning line's cells
        line: [usize; 3],
    },
    /// Board full without a winner
    Draw,
}

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A 3x3 board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Mark>; 9],
}

impl Board {
    /// Mark at a cell.
    #[must_use]
    pub fn get(&self, cell: usize) -> Option<Mark> {
        self.cells.get(cell).copied().flatten()
    }

    /// The winning mark and line, if any.
    #[must_use]
    pub fn winner(&self) -> Option<(Mark, [usize; 3])> {
        LINES.iter().find_map(|&line| {
            let [a, b, c] = line;
            match (self.cells[a], self.cells[b], self.cells[c]) {
                (Some(m), Some(n), Some(o)) if m == n && n == o => Some((m, line)),
                _ => None,
            }
        })
    }

    /// Whether every cell is marked.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

/// A game between two users.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    players: [u64; 2],
    status: GameStatus,
}

impl Game {
    /// Starts a game; `challenger` plays `X`.
    #[must_use]
    pub fn new(challenger: u64, opponent: u64) -> Self {
        Self {
            board: Board::default(),
            players: [challenger, opponent],
            status: GameStatus::InProgress { next: Mark::X },
        }
    }

    /// Current board.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    /// User playing `mark`.
    #[must_use]
    pub const fn player(&self, mark: Mark) -> u64 {
        match mark {
            Mark::X => self.players[0],
            Mark::O => self.players[1],
        }
    }

    /// Whether the user is one of the players.
    #[must_use]
    pub fn is_player(&self, user_id: u64) -> bool {
        self.players.contains(&user_id)
    }

    /// Marks `cell` for `user_id` and advances the game.
    pub fn play(&mut self, user_id: u64, cell: usize) -> Result<GameStatus, MoveError> {
        let GameStatus::InProgress { next } = self.status else {
            return Err(MoveError::GameOver);
        };
        if !self.is_player(user_id) {
            return Err(MoveError::NotAPlayer);
        }
        if self.player(next) != user_id {
            return Err(MoveError::NotYourTurn);
        }
        if cell >= self.board.cells.len() {
            return Err(MoveError::OutOfRange(cell));
        }
        if self.board.cells[cell].is_some() {
            return Err(MoveError::CellTaken);
        }

        self.board.cells[cell] = Some(next);
        self.status = match self.board.winner() {
            Some((winner, line)) => GameStatus::Won { winner, line },
            None if self.board.is_full() => GameStatus::Draw,
            None => GameStatus::InProgress {
                next: next.opponent(),
            },
        };
        Ok(self.status)
    }
}
