//! CFR (Counterfactual Regret Minimization) Solver Module.
//!
//! This module computes approximate Nash equilibria of two-player zero-sum
//! extensive-form games given as explicit trees.
//!
//! # Overview
//!
//! CFR is an iterative algorithm that converges to Nash equilibrium by:
//! 1. Computing counterfactual regret for each action at each information set
//! 2. Updating strategies to minimize regret over time
//! 3. Averaging strategies across iterations to converge to equilibrium
//!
//! # Supported Variants
//!
//! - **Vanilla CFR**: full tree traversal with exact expectations
//! - **Opponent-sampling MCCFR**: one sampled path of nature and opponent
//!   actions per iteration, shared by both players' updates
//!
//! Either engine can run over an [`Abstraction`] that merges information sets
//! and reorders their actions.
//!
//! # Usage
//!
//! 1. Build or load a [`GameTree`](crate::tree::GameTree)
//! 2. Create a `CFRSolver` with the tree and a configuration
//! 3. Call `run_iterations()`
//! 4. Read `average_strategy()`, `value_of_game()` and `exploitability()`
//!
//! # Example
//!
//! ```
//! use tree_cfr::cfr::{CFRConfig, CFRSolver};
//! use tree_cfr::games::kuhn::kuhn_poker;
//! use tree_cfr::tree::Player;
//!
//! let config = CFRConfig::sampling().with_seed(42);
//! let mut solver = CFRSolver::new(kuhn_poker()?, None, config)?;
//!
//! let stats = solver.run_iterations(1_000)?;
//! println!("Trained {} info sets in {:.2}s", stats.info_sets, stats.elapsed_seconds);
//!
//! let strategy = solver.average_strategy(Player::One);
//! assert_eq!(strategy.len(), 6);
//! # Ok::<(), tree_cfr::cfr::SolverError>(())
//! ```
//!
//! # Theory
//!
//! **Regret**: the difference between the value of an action and the value
//! of the current strategy, weighted by the probability that nature and the
//! opponent lead to the information set.
//! ```text
//! Regret(a) += π₋ᵢ · (Value(a) - Value(current_strategy))
//! ```
//!
//! **Regret Matching**: set strategy proportional to positive regrets.
//! ```text
//! Strategy(a) = max(0, Regret(a)) / sum(max(0, Regret(a')))
//! ```
//!
//! **Convergence**: average regret decreases as O(1/sqrt(T)), and the average
//! strategy converges to Nash equilibrium.
//!
//! # References
//!
//! - Zinkevich, M., et al. "Regret Minimization in Games with Incomplete Information" (2007)
//! - Lanctot, M., et al. "Monte Carlo Sampling for Regret Minimization in Extensive Games" (2009)

pub mod abstraction;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod evaluate;
pub mod game;
pub mod sampling;
pub mod solver;
pub mod state;
pub mod storage;
mod vanilla;

// Re-export main types for convenient access
pub use abstraction::{Abstraction, PlayerAbstraction};
pub use config::{CFRConfig, CFRStats, ExploitabilityPoint, Variant};
pub use error::{
    ConfigurationError, InvalidStateError, NumericDriftWarning, SolverError, SolverResult,
};
pub use game::Game;
pub use solver::{CFRSolver, SolverState};
pub use state::{Actor, Descent, GameState, Position, SampleKey, Step};
pub use storage::{InfoSetTable, PlayerTables, StrategyTables};
