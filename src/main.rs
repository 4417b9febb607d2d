use anyhow::Result;
use clap::{Parser, ValueEnum};
use mcts_2048::config::{MctsConfig, RolloutKind};
use mcts_2048::game::{self, Game};
use mcts_2048::mcts::MonteCarloTreeSearch;
use mcts_2048::random::SeededRandomGenerator;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RolloutArg {
    Random,
    Greedy,
}

impl From<RolloutArg> for RolloutKind {
    fn from(arg: RolloutArg) -> Self {
        match arg {
            RolloutArg::Random => RolloutKind::Random,
            RolloutArg::Greedy => RolloutKind::Greedy,
        }
    }
}

/// Plays 2048 with Monte Carlo tree search.
///
/// Options given on the command line override the ones read from `--config`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with search options.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Search iterations per move.
    #[arg(short, long)]
    iterations: Option<u32>,

    /// Wall-clock budget per move in milliseconds.
    #[arg(long)]
    time_budget_ms: Option<u64>,

    /// Exploration constant C of the UCT formula.
    #[arg(long)]
    exploration: Option<f64>,

    /// Maximum moves played by one rollout.
    #[arg(long)]
    rollout_depth: Option<u32>,

    /// Move choice during rollouts.
    #[arg(long, value_enum)]
    rollout: Option<RolloutArg>,

    /// Seed for a reproducible game.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Root-parallel search workers.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Keep the chosen subtree between moves.
    #[arg(long)]
    reuse_tree: bool,

    /// Stop after this many moves.
    #[arg(long)]
    max_moves: Option<u32>,

    /// Do not print the board after every move.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn search_config(&self) -> Result<MctsConfig> {
        let mut config = match &self.config {
            Some(path) => MctsConfig::load(path)?,
            None => MctsConfig::default(),
        };
        if let Some(n) = self.iterations {
            config = config.with_iterations(n);
        }
        if let Some(ms) = self.time_budget_ms {
            config = config.with_time_budget(Duration::from_millis(ms));
        }
        if let Some(c) = self.exploration {
            config = config.with_exploration_constant(c);
        }
        if let Some(depth) = self.rollout_depth {
            config = config.with_rollout_max_depth(depth);
        }
        if let Some(kind) = self.rollout {
            config = config.with_rollout(kind.into());
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.reuse_tree {
            config = config.with_tree_reuse(true);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.search_config()?;
    info!(?config, "search configuration");

    // tile spawns use their own stream so the search seed does not shift them
    let mut spawns = match config.random_seed {
        Some(seed) => SeededRandomGenerator::new(seed.wrapping_add(1)),
        None => SeededRandomGenerator::from_entropy(),
    };
    let mut engine = MonteCarloTreeSearch::new(config)?;
    let opening = Game::new(&mut spawns);

    if !args.quiet {
        println!("{}", opening.board());
    }
    let summary = game::play(&mut engine, opening, &mut spawns, args.max_moves, |game, mv, result| {
        if !args.quiet {
            println!(
                "move {} {} (score {}, {} iterations)",
                game.moves(),
                mv,
                game.score(),
                result.iterations
            );
            println!("{}", game.board());
        }
    });

    println!("{}", summary.board);
    println!(
        "Game over: score {}, {} moves, max tile {}",
        summary.score, summary.moves, summary.max_tile
    );
    Ok(())
}
