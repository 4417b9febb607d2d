//! A Monte Carlo tree search player for the 2048 sliding tile puzzle.
//!
//! The crate is split into the game model and the search. [`board`] holds the immutable
//! 4x4 position and its pure transition function; [`search_tree`], [`rollout`] and
//! [`mcts`] implement the selection, expansion, simulation and backpropagation loop that
//! picks each move. [`game`] plays whole games on top of the engine.
//!
//! # Example
//!
//! ```rust
//! use mcts_2048::board::Board;
//! use mcts_2048::config::MctsConfig;
//! use mcts_2048::mcts::{Decision, MonteCarloTreeSearch};
//! use mcts_2048::random::SeededRandomGenerator;
//!
//! // Create the opening position from a seeded generator
//! let mut rng = SeededRandomGenerator::new(42);
//! let board = Board::new_game(&mut rng);
//!
//! // Create and configure a new search engine
//! let config = MctsConfig::default().with_iterations(500).with_seed(7);
//! let mut mcts = MonteCarloTreeSearch::new(config).unwrap();
//!
//! // Search and read the most visited move
//! match mcts.select_move(&board) {
//!     Decision::Move(result) => println!("The best move is: {}", result.chosen),
//!     Decision::GameOver => println!("No move left"),
//! }
//! ```

/// The 2048 position, moves and the transition function.
pub mod board;
/// Search configuration and its validation.
pub mod config;
/// Whole-game driver on top of the search engine.
pub mod game;
/// The core module of the library, containing the `MonteCarloTreeSearch` engine.
pub mod mcts;
/// Contains the `MctsNode` struct, which represents a node in the search tree.
pub mod mcts_node;
/// Contains traits and implementations for random number generation.
pub mod random;
pub mod rollout;
pub mod search_tree;

pub use board::{Board, BoardError, Move, MoveOutcome};
pub use config::{ConfigError, MctsConfig, RolloutKind};
pub use mcts::{Decision, MonteCarloTreeSearch, SearchResult};
pub use search_tree::{MoveStatistics, SearchTree};
