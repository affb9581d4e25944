//! Bottom-up construction of [`GameTree`]s.
//!
//! Children are added before their parents, so every constructor returns the
//! id the parent will point at:
//!
//! ```
//! use tree_cfr::tree::{Player, TreeBuilder};
//!
//! let mut builder = TreeBuilder::new();
//! let win = builder.leaf(1.0);
//! let lose = builder.leaf(-1.0);
//! let root = builder.decision(Player::One, 0, [("win", win), ("lose", lose)]);
//! let tree = builder.build(root).unwrap();
//! # use tree_cfr::tree::GameTreeProvider;
//! assert_eq!(tree.num_nodes(), 3);
//! ```

use super::{Action, GameTree, Node, NodeId, NodeKind, Player};
use crate::cfr::error::ConfigurationError;

/// Accumulates nodes and validates them on [`build`](TreeBuilder::build).
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Add a leaf paying `payoff` to player one.
    pub fn leaf(&mut self, payoff: f64) -> NodeId {
        self.push(NodeKind::Leaf { payoff })
    }

    /// Add a nature node from `(name, probability, child)` outcomes.
    pub fn nature<S, I>(&mut self, outcomes: I) -> NodeId
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, f64, NodeId)>,
    {
        let actions = outcomes
            .into_iter()
            .map(|(name, probability, child)| Action::chance(name, child, probability))
            .collect();
        self.push(NodeKind::Nature { actions })
    }

    /// Add a decision node for `player` in `info_set` from `(name, child)` actions.
    pub fn decision<S, I>(&mut self, player: Player, info_set: usize, actions: I) -> NodeId
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, NodeId)>,
    {
        let actions = actions
            .into_iter()
            .map(|(name, child)| Action::decision(name, child))
            .collect();
        self.push(NodeKind::Decision {
            player,
            info_set,
            actions,
        })
    }

    /// Number of nodes added so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate and freeze the tree rooted at `root`.
    pub fn build(self, root: NodeId) -> Result<GameTree, ConfigurationError> {
        GameTree::new(self.nodes, root)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { id, kind });
        id
    }
}
