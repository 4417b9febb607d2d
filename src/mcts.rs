use crate::board::{Board, Move};
use crate::config::{ConfigError, MctsConfig};
use crate::random::{RandomGenerator, SeededRandomGenerator};
use crate::rollout::{RewardScale, RolloutPolicy};
use crate::search_tree::{MoveStatistics, SearchTree};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on the nodes preallocated for one tree. Larger trees grow on demand.
pub const DEFAULT_NODE_CAPACITY: usize = 65_536;

fn node_capacity(iterations: u32) -> usize {
    (iterations as usize).min(DEFAULT_NODE_CAPACITY) + 1
}

/// What one search decided, with the root statistics it was based on.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The most visited root move.
    pub chosen: Move,
    /// Visit and reward totals of every expanded root move, in `Move::ALL` order.
    pub statistics: Vec<MoveStatistics>,
    /// Iterations run by this decision.
    pub iterations: u32,
    /// Root visits, including those inherited from a reused tree.
    pub root_visits: u32,
    /// Nodes in the tree (summed over workers).
    pub nodes: usize,
    pub elapsed: Duration,
}

/// The outcome of `MonteCarloTreeSearch::select_move`.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A legal move was found.
    Move(SearchResult),
    /// The board has no legal move; the game is over.
    GameOver,
}

impl Decision {
    pub fn chosen_move(&self) -> Option<Move> {
        match self {
            Decision::Move(result) => Some(result.chosen),
            Decision::GameOver => None,
        }
    }
}

/// The main struct for running the Monte Carlo Tree Search algorithm.
///
/// It holds the validated configuration and the random number generator. A fresh search
/// tree is built for every decision unless tree reuse is enabled.
pub struct MonteCarloTreeSearch<K: RandomGenerator = SeededRandomGenerator> {
    config: MctsConfig,
    random: K,
    retained: Option<SearchTree>,
}

/// A builder for creating instances of `MonteCarloTreeSearch`.
pub struct MonteCarloTreeSearchBuilder<K: RandomGenerator> {
    config: MctsConfig,
    random_generator: K,
}

impl<K: RandomGenerator> MonteCarloTreeSearchBuilder<K> {
    pub fn new(config: MctsConfig) -> Self {
        Self {
            config,
            random_generator: K::default(),
        }
    }

    /// Sets the random number generator for the search.
    pub fn with_random_generator(mut self, rg: K) -> Self {
        self.random_generator = rg;
        self
    }

    /// Validates the configuration and builds the engine.
    pub fn build(self) -> Result<MonteCarloTreeSearch<K>, ConfigError> {
        self.config.validate()?;
        Ok(MonteCarloTreeSearch {
            config: self.config,
            random: self.random_generator,
            retained: None,
        })
    }
}

impl MonteCarloTreeSearch<SeededRandomGenerator> {
    /// Builds an engine seeded from `config.random_seed`, or from the operating system
    /// when no seed is set.
    pub fn new(config: MctsConfig) -> Result<Self, ConfigError> {
        let random = match config.random_seed {
            Some(seed) => SeededRandomGenerator::new(seed),
            None => SeededRandomGenerator::from_entropy(),
        };
        MonteCarloTreeSearchBuilder::new(config)
            .with_random_generator(random)
            .build()
    }
}

impl<K: RandomGenerator> MonteCarloTreeSearch<K> {
    /// Returns a new builder for `MonteCarloTreeSearch`.
    pub fn builder(config: MctsConfig) -> MonteCarloTreeSearchBuilder<K> {
        MonteCarloTreeSearchBuilder::new(config)
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Root board of the subtree kept for the next decision, when tree reuse is on.
    pub fn retained_board(&self) -> Option<&Board> {
        self.retained.as_ref().map(|tree| &tree.root().board)
    }

    /// Searches from `board` and returns the most visited root move.
    pub fn select_move(&mut self, board: &Board) -> Decision {
        if board.is_terminal() {
            self.retained = None;
            return Decision::GameOver;
        }

        let started = Instant::now();
        let deadline = self.config.time_budget().map(|budget| started + budget);
        let scale = RewardScale::for_root(board, self.config.rollout_max_depth);
        let rollout = RolloutPolicy::new(self.config.rollout, self.config.rollout_max_depth, scale);

        let (statistics, iterations, root_visits, nodes) = if self.config.workers > 1 {
            self.search_parallel(board, &rollout, deadline)
        } else {
            self.search_single(board, &rollout, deadline)
        };

        let Some(chosen) = most_visited(&statistics) else {
            return Decision::GameOver;
        };

        if self.config.reuse_tree {
            self.retained = self.retained.take().and_then(|tree| tree.reroot(chosen));
        }

        let elapsed = started.elapsed();
        debug!(
            %chosen,
            iterations,
            root_visits,
            nodes,
            elapsed_ms = elapsed.as_millis() as u64,
            "selected move"
        );

        Decision::Move(SearchResult {
            chosen,
            statistics,
            iterations,
            root_visits,
            nodes,
            elapsed,
        })
    }

    fn search_single(
        &mut self,
        board: &Board,
        rollout: &RolloutPolicy,
        deadline: Option<Instant>,
    ) -> (Vec<MoveStatistics>, u32, u32, usize) {
        let mut tree = match self.retained.take() {
            Some(tree) if tree.root().board == *board => {
                debug!(nodes = tree.node_count(), "reusing retained subtree");
                tree
            }
            Some(_) => {
                debug!("retained subtree does not match the board, starting fresh");
                SearchTree::with_capacity(*board, node_capacity(self.config.iterations))
            }
            None => SearchTree::with_capacity(*board, node_capacity(self.config.iterations)),
        };

        let iterations = run_iterations(
            &mut tree,
            self.config.iterations,
            self.config.exploration_constant,
            rollout,
            deadline,
            &mut self.random,
        );

        let result = (
            tree.root_statistics(),
            iterations,
            tree.root().visits,
            tree.node_count(),
        );
        if self.config.reuse_tree {
            self.retained = Some(tree);
        }
        result
    }

    /// Root-parallel search: independent trees on the rayon pool, merged by root move.
    fn search_parallel(
        &mut self,
        board: &Board,
        rollout: &RolloutPolicy,
        deadline: Option<Instant>,
    ) -> (Vec<MoveStatistics>, u32, u32, usize) {
        let workers = self.config.workers.min(self.config.iterations as usize) as u32;
        let base = self.config.iterations / workers;
        let extra = self.config.iterations % workers;
        let exploration_constant = self.config.exploration_constant;

        let jobs: Vec<(u32, SeededRandomGenerator)> = (0..workers)
            .map(|i| {
                let share = base + u32::from(i < extra);
                (share, SeededRandomGenerator::fork(&mut self.random))
            })
            .collect();

        let results: Vec<(Vec<MoveStatistics>, u32, usize)> = jobs
            .into_par_iter()
            .map(|(share, mut rng)| {
                let mut tree = SearchTree::with_capacity(*board, node_capacity(share));
                let done = run_iterations(
                    &mut tree,
                    share,
                    exploration_constant,
                    rollout,
                    deadline,
                    &mut rng,
                );
                (tree.root_statistics(), done, tree.node_count())
            })
            .collect();

        let iterations = results.iter().map(|(_, done, _)| done).sum();
        let nodes = results.iter().map(|(_, _, nodes)| nodes).sum();
        let statistics = merge_statistics(results.iter().map(|(stats, _, _)| stats.as_slice()));
        (statistics, iterations, iterations, nodes)
    }
}

/// Runs up to `iterations` select/expand/simulate/backpropagate rounds and returns how
/// many ran. At least one round runs; the deadline is checked after every round.
fn run_iterations<K: RandomGenerator>(
    tree: &mut SearchTree,
    iterations: u32,
    exploration_constant: f64,
    rollout: &RolloutPolicy,
    deadline: Option<Instant>,
    rng: &mut K,
) -> u32 {
    let mut done = 0;
    while done < iterations {
        let mut path = tree.select(exploration_constant);
        let Some(&leaf) = path.last() else {
            break;
        };

        let target = match tree.expand(leaf, rng) {
            Some(child) => {
                path.push(child);
                child
            }
            None => leaf,
        };

        let reward = match tree.node(target) {
            Some(node) => {
                let board = node.board;
                rollout.simulate(&board, rng)
            }
            None => 0.0,
        };
        tree.backpropagate(&path, reward);
        done += 1;

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
    }
    done
}

/// Sums per-worker root statistics move by move.
fn merge_statistics<'a>(per_worker: impl Iterator<Item = &'a [MoveStatistics]>) -> Vec<MoveStatistics> {
    let mut merged: Vec<MoveStatistics> = Vec::new();
    for statistics in per_worker {
        for s in statistics {
            match merged.iter_mut().find(|m| m.mv == s.mv) {
                Some(m) => {
                    m.visits += s.visits;
                    m.total_reward += s.total_reward;
                }
                None => merged.push(*s),
            }
        }
    }
    merged.sort_by_key(|s| s.mv);
    merged
}

/// The move with the most visits; ties go to the higher mean reward, then to the move
/// that comes first in `Move::ALL`.
pub fn most_visited(statistics: &[MoveStatistics]) -> Option<Move> {
    let mut best: Option<&MoveStatistics> = None;
    for s in statistics {
        let better = match best {
            None => true,
            Some(b) => {
                s.visits > b.visits
                    || (s.visits == b.visits && s.mean_reward() > b.mean_reward())
                    || (s.visits == b.visits && s.mean_reward() == b.mean_reward() && s.mv < b.mv)
            }
        };
        if better {
            best = Some(s);
        }
    }
    best.map(|s| s.mv)
}
