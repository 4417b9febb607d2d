//! Tree-free playouts used to estimate the value of a leaf.

use crate::board::{Board, Move};
use crate::config::RolloutKind;
use crate::random::RandomGenerator;

/// Maps raw playout outcomes onto a bounded reward.
///
/// Built once per decision from the root board so that every iteration of that decision
/// is scored on the same scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardScale {
    baseline: f64,
    span: f64,
}

impl RewardScale {
    pub fn for_root(root: &Board, rollout_max_depth: u32) -> Self {
        let max_tile = f64::from(root.max_tile().max(4));
        Self {
            baseline: root.score(),
            span: f64::from(rollout_max_depth.max(1)) * max_tile / 2.0,
        }
    }

    /// Reward in `[0, 1)` for a playout that ended on `outcome`.
    pub fn normalize(&self, outcome: &Board) -> f64 {
        let delta = (outcome.score() - self.baseline).max(0.0);
        delta / (delta + self.span)
    }
}

/// Plays a board forward without building a tree.
#[derive(Debug, Clone, Copy)]
pub struct RolloutPolicy {
    kind: RolloutKind,
    max_depth: u32,
    scale: RewardScale,
}

impl RolloutPolicy {
    pub fn new(kind: RolloutKind, max_depth: u32, scale: RewardScale) -> Self {
        Self {
            kind,
            max_depth,
            scale,
        }
    }

    pub fn kind(&self) -> RolloutKind {
        self.kind
    }

    /// Plays from `board` until it is terminal or `max_depth` moves were made and
    /// returns the normalized reward of the final position.
    pub fn simulate<K: RandomGenerator>(&self, board: &Board, rng: &mut K) -> f64 {
        let final_board = self.play_out(board, rng);
        self.scale.normalize(&final_board)
    }

    /// The final board of one playout.
    pub fn play_out<K: RandomGenerator>(&self, board: &Board, rng: &mut K) -> Board {
        let mut current = *board;
        for _ in 0..self.max_depth {
            let Some(mv) = self.choose_move(&current, rng) else {
                break;
            };
            let slid = current.apply_move(mv).board;
            current = match slid.spawn_tile(rng) {
                Ok(next) => next,
                Err(_) => slid,
            };
        }
        current
    }

    fn choose_move<K: RandomGenerator>(&self, board: &Board, rng: &mut K) -> Option<Move> {
        match self.kind {
            RolloutKind::Random => rng.get_random_from_slice(&board.legal_moves()).copied(),
            RolloutKind::Greedy => {
                let mut best: Option<(Move, f64)> = None;
                for mv in Move::ALL {
                    let outcome = board.apply_move(mv);
                    if !outcome.moved {
                        continue;
                    }
                    let value = outcome.board.heuristic();
                    if best.is_none_or(|(_, best_value)| value > best_value) {
                        best = Some((mv, value));
                    }
                }
                best.map(|(mv, _)| mv)
            }
        }
    }
}
