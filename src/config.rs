//! Search configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Rejections raised before any search runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("iterations must be positive")]
    ZeroIterations,

    #[error("rollout max depth must be positive")]
    ZeroRolloutDepth,

    #[error("time budget must be positive when set")]
    ZeroTimeBudget,

    #[error("exploration constant must be finite and non-negative, got {0}")]
    InvalidExplorationConstant(f64),

    #[error("at least one worker is required")]
    ZeroWorkers,

    #[error("tree reuse requires a single worker, got {0}")]
    TreeReuseWithWorkers(usize),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Move selection policy used during rollouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutKind {
    /// Uniformly random legal move.
    #[default]
    Random,
    /// Legal move with the best static heuristic after sliding.
    Greedy,
}

/// Configuration for one `select_move` decision.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Iterations per decision. Always a hard upper bound.
    pub iterations: u32,

    /// Optional wall-clock budget per decision in milliseconds.
    /// Checked between iterations, so a decision may overrun it by one iteration.
    pub time_budget_ms: Option<u64>,

    /// The `C` in `mean + C * sqrt(ln(N) / n)`.
    pub exploration_constant: f64,

    /// Maximum number of moves played by a single rollout.
    pub rollout_max_depth: u32,

    pub rollout: RolloutKind,

    /// Seed for the search. `None` seeds from the operating system.
    pub random_seed: Option<u64>,

    /// Independent root-parallel searches. `1` searches on the calling thread.
    pub workers: usize,

    /// Keep the chosen child's subtree for the next decision.
    /// Results then depend on earlier decisions, not only on the current board.
    ///
    /// The kept subtree holds one sampled tile spawn. It is only reused when the next
    /// board matches it exactly, which in a real game happens for a small share of
    /// moves, so this rarely saves much work.
    pub reuse_tree: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iterations: 200,
            time_budget_ms: None,
            exploration_constant: std::f64::consts::SQRT_2,
            rollout_max_depth: 50,
            rollout: RolloutKind::Random,
            random_seed: None,
            workers: 1,
            reuse_tree: false,
        }
    }
}

impl MctsConfig {
    /// Parses and validates a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MctsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading search config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Checks every option. Called by the engine builder before any search.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.rollout_max_depth == 0 {
            return Err(ConfigError::ZeroRolloutDepth);
        }
        if self.time_budget_ms == Some(0) {
            return Err(ConfigError::ZeroTimeBudget);
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(ConfigError::InvalidExplorationConstant(
                self.exploration_constant,
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.reuse_tree && self.workers > 1 {
            return Err(ConfigError::TreeReuseWithWorkers(self.workers));
        }
        Ok(())
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    pub fn with_iterations(mut self, n: u32) -> Self {
        self.iterations = n;
        self
    }

    /// Sets the time budget. Budgets below one millisecond round up to one; only
    /// `Duration::ZERO` is rejected by `validate`.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        let ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self.time_budget_ms = Some(if budget.is_zero() { 0 } else { ms.max(1) });
        self
    }

    pub fn with_exploration_constant(mut self, c: f64) -> Self {
        self.exploration_constant = c;
        self
    }

    pub fn with_rollout_max_depth(mut self, depth: u32) -> Self {
        self.rollout_max_depth = depth;
        self
    }

    pub fn with_rollout(mut self, kind: RolloutKind) -> Self {
        self.rollout = kind;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_tree_reuse(mut self, reuse: bool) -> Self {
        self.reuse_tree = reuse;
        self
    }
}
