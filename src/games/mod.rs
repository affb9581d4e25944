//! Reference games for the CFR solver.
//!
//! These serve as:
//!
//! 1. **Validation**: games with known Nash equilibria verify that the CFR
//!    implementation is correct.
//!
//! 2. **Examples**: show how to describe a game with a
//!    [`TreeBuilder`](crate::tree::TreeBuilder).
//!
//! 3. **Benchmarks**: provide standardized games for performance testing.
//!
//! ## Available Games
//!
//! - [`matching_pennies`]: matching pennies and a biased variant
//! - [`kuhn`]: Kuhn Poker, a 3-card poker game with a known Nash equilibrium

pub mod kuhn;
pub mod matching_pennies;
