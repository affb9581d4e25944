//! Error types for tree validation, cursor misuse and numeric drift.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::{NodeId, Player};

/// A malformed tree, abstraction, configuration or checkpoint.
///
/// Detected when a solver is constructed (or a checkpoint imported) and never
/// recovered from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// The tree has no nodes.
    #[error("game tree is empty")]
    EmptyTree,

    /// The root id does not name a node in the tree.
    #[error("root {0} is not a node of the tree")]
    MissingRoot(NodeId),

    /// A node's id does not match its position in the node table.
    #[error("node stored at index {index} carries id {id}")]
    MisplacedNode {
        /// Position in the node table.
        index: usize,
        /// Id stored on the node.
        id: NodeId,
    },

    /// A nature or decision node has no actions.
    #[error("non-leaf node {0} has no actions")]
    NoActions(NodeId),

    /// A leaf payoff is NaN or infinite.
    #[error("leaf {node} has non-finite payoff {payoff}")]
    NonFinitePayoff {
        /// The leaf.
        node: NodeId,
        /// The offending payoff.
        payoff: f64,
    },

    /// An action points outside the node table.
    #[error("action {action} of node {node} points to missing child {child}")]
    DanglingChild {
        /// Parent node.
        node: NodeId,
        /// Action index.
        action: usize,
        /// Missing child id.
        child: NodeId,
    },

    /// A node is the child of more than one action, or the child of an action
    /// while also being the root.
    #[error("node {0} has more than one parent")]
    SharedChild(NodeId),

    /// A node cannot be reached from the root.
    #[error("node {0} is unreachable from the root")]
    Unreachable(NodeId),

    /// Two sibling actions share a name.
    #[error("node {node} has duplicate action name {name:?}")]
    DuplicateActionName {
        /// Parent node.
        node: NodeId,
        /// Repeated name.
        name: String,
    },

    /// A nature action probability is outside (0, 1] or missing.
    #[error("nature node {node} action {action} has invalid probability {probability:?}")]
    InvalidProbability {
        /// Nature node.
        node: NodeId,
        /// Action index.
        action: usize,
        /// The probability, or `None` if absent.
        probability: Option<f64>,
    },

    /// A decision action carries a probability.
    #[error("decision node {node} action {action} carries a nature probability")]
    UnexpectedProbability {
        /// Decision node.
        node: NodeId,
        /// Action index.
        action: usize,
    },

    /// Nature probabilities at a node do not sum to one.
    #[error("nature node {node} probabilities sum to {total}")]
    ProbabilitySum {
        /// Nature node.
        node: NodeId,
        /// Actual sum.
        total: f64,
    },

    /// Nodes of one information set expose different action counts.
    #[error("{player} information set {info_set} has nodes with {expected} and {found} actions")]
    InfoSetActionCount {
        /// Owning player.
        player: Player,
        /// Original information set.
        info_set: usize,
        /// Count seen first.
        expected: usize,
        /// Conflicting count.
        found: usize,
    },

    /// Information set ids are not consecutive from zero.
    #[error("{player} information set {info_set} is never used")]
    UnusedInfoSet {
        /// Owning player.
        player: Player,
        /// The gap.
        info_set: usize,
    },

    /// An information set id exceeds the count the provider reports.
    #[error("{player} information set {info_set} exceeds the reported count {count}")]
    InfoSetOutOfRange {
        /// Owning player.
        player: Player,
        /// Offending id.
        info_set: usize,
        /// Reported count.
        count: usize,
    },

    /// Abstraction tables do not cover the tree's information sets.
    #[error("{player} abstraction maps {found} information sets, tree has {expected}")]
    AbstractionSize {
        /// Owning player.
        player: Player,
        /// Information sets in the tree.
        expected: usize,
        /// Information sets in the mapping.
        found: usize,
    },

    /// An action map is not a permutation of the original actions.
    #[error("{player} information set {info_set} action map {mapping:?} is not a permutation")]
    ActionMapping {
        /// Owning player.
        player: Player,
        /// Original information set.
        info_set: usize,
        /// The offending map.
        mapping: Vec<usize>,
    },

    /// Information sets merged into one abstract set disagree on action count.
    #[error(
        "{player} abstract information set {abstract_info_set} merges sets \
         with {expected} and {found} actions"
    )]
    AbstractActionCount {
        /// Owning player.
        player: Player,
        /// Abstract information set.
        abstract_info_set: usize,
        /// Count seen first.
        expected: usize,
        /// Conflicting count.
        found: usize,
    },

    /// A solver configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A checkpoint does not fit the solver's tables.
    #[error("checkpoint does not match solver tables: {0}")]
    CheckpointMismatch(String),
}

/// A cursor query issued in a position that does not support it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidStateError {
    /// Nature-only query away from a nature node.
    #[error("node {0} is not a nature node")]
    NotNature(NodeId),

    /// Decision-only query away from a decision node.
    #[error("node {0} is not a decision node")]
    NotDecision(NodeId),

    /// Payoff query away from a leaf.
    #[error("node {0} is not a leaf")]
    NotLeaf(NodeId),

    /// Action query at a leaf.
    #[error("leaf {0} has no actions")]
    AtLeaf(NodeId),

    /// Action index past the end of the node's actions.
    #[error("node {node} has {available} actions, action {action} requested")]
    ActionOutOfRange {
        /// Current node.
        node: NodeId,
        /// Requested action.
        action: usize,
        /// Actions available.
        available: usize,
    },

    /// No table exists for an abstract information set.
    #[error("no strategy table for {player} abstract information set {info_set}")]
    MissingTable {
        /// Owning player.
        player: Player,
        /// Abstract information set.
        info_set: usize,
    },
}

/// A regret-matching pass produced a strategy that does not sum to one.
///
/// Not fatal. Recorded in [`CFRStats`](crate::cfr::CFRStats) and logged so an
/// upstream invariant violation is visible to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericDriftWarning {
    /// Owning player.
    pub player: Player,
    /// Abstract information set.
    pub info_set: usize,
    /// Sum of the resulting strategy.
    pub sum: f64,
    /// Iteration in which the drift was observed.
    pub iteration: u64,
}

impl NumericDriftWarning {
    /// A warning if `sum` deviates from 1 by more than `tolerance`.
    pub(crate) fn check(
        player: Player,
        info_set: usize,
        sum: f64,
        iteration: u64,
        tolerance: f64,
    ) -> Option<Self> {
        if (sum - 1.0).abs() <= tolerance {
            return None;
        }
        let warning = Self {
            player,
            info_set,
            sum,
            iteration,
        };
        log::warn!("numeric drift: {}", warning);
        Some(warning)
    }
}

impl std::fmt::Display for NumericDriftWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} information set {} strategy sums to {} at iteration {}",
            self.player, self.info_set, self.sum, self.iteration
        )
    }
}

/// Any failure surfaced by the solver.
#[derive(Error, Debug)]
pub enum SolverError {
    /// See [`ConfigurationError`].
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// See [`InvalidStateError`].
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    /// Checkpoint (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the solver API.
pub type SolverResult<T> = Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_check_respects_tolerance() {
        let warning = NumericDriftWarning::check(Player::Two, 3, 1.1, 42, 1e-8).unwrap();
        assert_eq!(warning.player, Player::Two);
        assert_eq!(warning.info_set, 3);
        assert_eq!(warning.iteration, 42);
        assert!(warning.to_string().contains("sums to 1.1"), "{}", warning);

        assert!(NumericDriftWarning::check(Player::One, 0, 1.0 + 1e-10, 1, 1e-8).is_none());
        assert!(NumericDriftWarning::check(Player::One, 0, f64::NAN, 1, 1e-8).is_some());
    }

    #[test]
    fn test_errors_convert_into_solver_error() {
        let err: SolverError = ConfigurationError::EmptyTree.into();
        assert!(matches!(err, SolverError::Configuration(_)));
        let err: SolverError = InvalidStateError::NotLeaf(NodeId(4)).into();
        assert!(err.to_string().contains("#4"), "{}", err);
    }
}
