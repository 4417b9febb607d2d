//! Playing a whole game: ask the engine, apply the move, spawn a tile, repeat.

use crate::board::{Board, Move};
use crate::mcts::{Decision, MonteCarloTreeSearch, SearchResult};
use crate::random::RandomGenerator;
use tracing::info;

/// A game in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    score: u64,
    moves: u32,
}

/// Final state of a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub board: Board,
    /// Sum of all merged tile values.
    pub score: u64,
    pub moves: u32,
    pub max_tile: u32,
}

impl Game {
    /// Starts a game on the standard two-tile opening.
    pub fn new<K: RandomGenerator>(rng: &mut K) -> Self {
        Game::from_board(Board::new_game(rng))
    }

    pub fn from_board(board: Board) -> Self {
        Game {
            board,
            score: 0,
            moves: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn is_over(&self) -> bool {
        self.board.is_terminal()
    }

    /// Plays `mv` and spawns a tile. Returns false, leaving the game untouched, when the
    /// move is illegal.
    pub fn step<K: RandomGenerator>(&mut self, mv: Move, rng: &mut K) -> bool {
        let outcome = self.board.apply_move(mv);
        if !outcome.moved {
            return false;
        }
        self.score += outcome.gained;
        self.moves += 1;
        self.board = outcome.board.spawn_tile(rng).unwrap_or(outcome.board);
        true
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            board: self.board,
            score: self.score,
            moves: self.moves,
            max_tile: self.board.max_tile(),
        }
    }
}

/// Lets the engine play `game` until no move is left or `max_moves` moves were made.
///
/// `observer` is called after every move with the game, the move and the search result.
pub fn play<K, R, F>(
    engine: &mut MonteCarloTreeSearch<K>,
    mut game: Game,
    rng: &mut R,
    max_moves: Option<u32>,
    mut observer: F,
) -> GameSummary
where
    K: RandomGenerator,
    R: RandomGenerator,
    F: FnMut(&Game, Move, &SearchResult),
{
    info!(
        iterations = engine.config().iterations,
        rollout = ?engine.config().rollout,
        "starting game"
    );

    while max_moves.is_none_or(|cap| game.moves() < cap) {
        let result = match engine.select_move(game.board()) {
            Decision::Move(result) => result,
            Decision::GameOver => break,
        };
        if !game.step(result.chosen, rng) {
            break;
        }
        observer(&game, result.chosen, &result);
    }

    let summary = game.summary();
    info!(
        score = summary.score,
        moves = summary.moves,
        max_tile = summary.max_tile,
        "game over"
    );
    summary
}
