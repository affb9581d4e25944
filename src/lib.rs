//! # Tree CFR
//!
//! Counterfactual Regret Minimization for two-player zero-sum
//! extensive-form games given as explicit trees.
//!
//! ## Features
//!
//! - **Explicit game trees**: nature, decision and leaf nodes with
//!   information sets, validated once at construction
//! - **Two engines**: vanilla CFR and opponent-sampling MCCFR
//! - **Abstraction**: merge information sets and remap actions
//! - **Evaluation**: game value, best response and exploitability
//! - **Checkpointing**: save and resume solver state
//! - **Seed ensembles**: independent sampling runs in parallel
//!
//! ## Quick Start
//!
//! ```
//! use tree_cfr::cfr::{CFRConfig, CFRSolver};
//! use tree_cfr::tree::{Player, TreeBuilder};
//!
//! // 1. Describe the game
//! let mut builder = TreeBuilder::new();
//! let hh = builder.leaf(1.0);
//! let ht = builder.leaf(-1.0);
//! let th = builder.leaf(-1.0);
//! let tt = builder.leaf(1.0);
//! let heads = builder.decision(Player::Two, 0, [("Heads", hh), ("Tails", ht)]);
//! let tails = builder.decision(Player::Two, 0, [("Heads", th), ("Tails", tt)]);
//! let root = builder.decision(Player::One, 0, [("Heads", heads), ("Tails", tails)]);
//! let tree = builder.build(root)?;
//!
//! // 2. Create a solver and train
//! let mut solver = CFRSolver::new(tree, None, CFRConfig::default())?;
//! solver.run_iterations(1_000)?;
//!
//! // 3. Get strategies
//! let strategy = solver.average_strategy(Player::One);
//! assert!((strategy[0][0] - 0.5).abs() < 0.05);
//! # Ok::<(), tree_cfr::cfr::SolverError>(())
//! ```
//!
//! ## Modules
//!
//! - [`tree`]: game tree representation and validation
//! - [`cfr`]: engines, strategy tables and the solver handle
//! - [`games`]: reference games (matching pennies, Kuhn Poker)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         CFRSolver                            │
//! │  - Vanilla / opponent-sampling   - Strategy tables           │
//! │  - Evaluation                    - Checkpointing             │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ Game: tree + abstraction
//!                               ▼
//!                    ┌─────────────────────┐
//!                    │  GameTreeProvider   │
//!                    └─────────────────────┘
//!                               │
//!         ┌─────────────────────┼─────────────────────┐
//!         ▼                     ▼                     ▼
//!    ┌─────────┐         ┌────────────┐        ┌────────────┐
//!    │  Kuhn   │         │  Matching  │        │  External  │
//!    │  Poker  │         │  Pennies   │        │  loaders   │
//!    └─────────┘         └────────────┘        └────────────┘
//! ```

#![warn(missing_docs)]

/// CFR (Counterfactual Regret Minimization) solver module.
///
/// Engines, strategy tables, evaluation and the solver handle.
pub mod cfr;

/// Game implementations module.
///
/// Contains reference games for testing and validation.
pub mod games;

/// Game tree representation.
pub mod tree;

// Re-export commonly used types at crate root for convenience
pub use cfr::{Abstraction, CFRConfig, CFRSolver, CFRStats, SolverError, Variant};
pub use tree::{GameTree, GameTreeProvider, NodeId, Player, TreeBuilder};
