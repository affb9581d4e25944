//! Immutable extensive-form game trees.
//!
//! A tree is built once (by an external loader, the [`TreeBuilder`], or one of
//! the reference games) and only read afterwards. Solvers reach it through the
//! [`GameTreeProvider`] trait, so a loader can hand over its own representation
//! as long as it honours the same invariants:
//!
//! - every non-leaf node has at least one action, every leaf a finite payoff
//! - actions form a tree: no cycles, no shared children, all nodes reachable
//! - nature probabilities lie in (0, 1] and sum to one within a tolerance
//! - all nodes of one information set expose the same number of actions
//! - information sets are numbered consecutively from zero per player

pub mod builder;
pub mod node;

pub use builder::TreeBuilder;
pub use node::{Action, Node, NodeId, NodeKind, Player, Turn};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::cfr::error::ConfigurationError;

/// Default tolerance on nature probability sums.
pub const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// Read-only access to a game tree.
///
/// This is the only coupling between the solvers and whatever produced the
/// tree.
pub trait GameTreeProvider {
    /// The root node id.
    fn root(&self) -> NodeId;

    /// Look up a node.
    ///
    /// `id` must be the root or the child of an action of this tree.
    fn node(&self, id: NodeId) -> &Node;

    /// Total number of nodes.
    fn num_nodes(&self) -> usize;

    /// Number of original information sets owned by `player`.
    fn num_info_sets(&self, player: Player) -> usize;
}

impl<T: GameTreeProvider + ?Sized> GameTreeProvider for &T {
    fn root(&self) -> NodeId {
        (**self).root()
    }

    fn node(&self, id: NodeId) -> &Node {
        (**self).node(id)
    }

    fn num_nodes(&self) -> usize {
        (**self).num_nodes()
    }

    fn num_info_sets(&self, player: Player) -> usize {
        (**self).num_info_sets(player)
    }
}

/// A validated game tree stored as a flat node table.
///
/// Deserialization goes through [`GameTree::new`], so a tree read from JSON
/// is held to the same invariants as one built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGameTree")]
pub struct GameTree {
    nodes: Vec<Node>,
    root: NodeId,
    one_info_sets: usize,
    two_info_sets: usize,
}

/// Unchecked wire form of [`GameTree`]. Stored info-set counts are ignored
/// and recomputed.
#[derive(Deserialize)]
struct RawGameTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl TryFrom<RawGameTree> for GameTree {
    type Error = ConfigurationError;

    fn try_from(raw: RawGameTree) -> Result<Self, Self::Error> {
        GameTree::new(raw.nodes, raw.root)
    }
}

impl GameTree {
    /// Validate `nodes` as a tree rooted at `root`.
    ///
    /// `nodes[i].id` must equal `NodeId(i)`.
    pub fn new(nodes: Vec<Node>, root: NodeId) -> Result<Self, ConfigurationError> {
        Self::with_tolerance(nodes, root, PROBABILITY_TOLERANCE)
    }

    /// Like [`GameTree::new`] with a custom nature probability tolerance.
    pub fn with_tolerance(
        nodes: Vec<Node>,
        root: NodeId,
        tolerance: f64,
    ) -> Result<Self, ConfigurationError> {
        if nodes.is_empty() {
            return Err(ConfigurationError::EmptyTree);
        }
        if root.index() >= nodes.len() {
            return Err(ConfigurationError::MissingRoot(root));
        }

        let mut parents = vec![0u32; nodes.len()];
        parents[root.index()] = 1;
        for (index, node) in nodes.iter().enumerate() {
            if node.id.index() != index {
                return Err(ConfigurationError::MisplacedNode { index, id: node.id });
            }
            check_node(node, tolerance)?;
            for (action, edge) in node.actions().iter().enumerate() {
                let Some(count) = parents.get_mut(edge.child.index()) else {
                    return Err(ConfigurationError::DanglingChild {
                        node: node.id,
                        action,
                        child: edge.child,
                    });
                };
                *count += 1;
                if *count > 1 {
                    return Err(ConfigurationError::SharedChild(edge.child));
                }
            }
        }

        let mut reached = vec![false; nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            reached[id.index()] = true;
            stack.extend(nodes[id.index()].actions().iter().map(|a| a.child));
        }
        if let Some(index) = reached.iter().position(|&r| !r) {
            return Err(ConfigurationError::Unreachable(NodeId(index)));
        }

        let one_info_sets = count_info_sets(&nodes, Player::One)?;
        let two_info_sets = count_info_sets(&nodes, Player::Two)?;

        Ok(Self {
            nodes,
            root,
            one_info_sets,
            two_info_sets,
        })
    }

    /// Look up a node, `None` if the id is out of range.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// All nodes, indexed by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl GameTreeProvider for GameTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn num_info_sets(&self, player: Player) -> usize {
        match player {
            Player::One => self.one_info_sets,
            Player::Two => self.two_info_sets,
        }
    }
}

/// Action counts per original information set of `player`, found by walking
/// the tree from the root. Sets never reached report zero.
pub fn info_set_action_counts<T: GameTreeProvider>(tree: &T, player: Player) -> Vec<usize> {
    let mut counts = vec![0; tree.num_info_sets(player)];
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let node = tree.node(id);
        if let NodeKind::Decision {
            player: owner,
            info_set,
            actions,
        } = &node.kind
        {
            if *owner == player {
                if let Some(count) = counts.get_mut(*info_set) {
                    *count = actions.len();
                }
            }
        }
        stack.extend(node.actions().iter().map(|a| a.child));
    }
    counts
}

/// Check the invariants local to one node.
pub(crate) fn check_node(node: &Node, tolerance: f64) -> Result<(), ConfigurationError> {
    match &node.kind {
        NodeKind::Leaf { payoff } => {
            if !payoff.is_finite() {
                return Err(ConfigurationError::NonFinitePayoff {
                    node: node.id,
                    payoff: *payoff,
                });
            }
            return Ok(());
        }
        NodeKind::Nature { actions } => {
            let mut total = 0.0;
            for (action, edge) in actions.iter().enumerate() {
                match edge.probability {
                    Some(p) if p > 0.0 && p <= 1.0 => total += p,
                    probability => {
                        return Err(ConfigurationError::InvalidProbability {
                            node: node.id,
                            action,
                            probability,
                        })
                    }
                }
            }
            if !actions.is_empty() && (total - 1.0).abs() > tolerance {
                return Err(ConfigurationError::ProbabilitySum {
                    node: node.id,
                    total,
                });
            }
        }
        NodeKind::Decision { actions, .. } => {
            if let Some(action) = actions.iter().position(|a| a.probability.is_some()) {
                return Err(ConfigurationError::UnexpectedProbability {
                    node: node.id,
                    action,
                });
            }
        }
    }

    let actions = node.actions();
    if actions.is_empty() {
        return Err(ConfigurationError::NoActions(node.id));
    }
    let mut names = FxHashSet::default();
    for edge in actions {
        if !names.insert(edge.name.as_str()) {
            return Err(ConfigurationError::DuplicateActionName {
                node: node.id,
                name: edge.name.clone(),
            });
        }
    }
    Ok(())
}

fn count_info_sets(nodes: &[Node], player: Player) -> Result<usize, ConfigurationError> {
    let mut counts: Vec<Option<usize>> = Vec::new();
    for node in nodes {
        let NodeKind::Decision {
            player: owner,
            info_set,
            actions,
        } = &node.kind
        else {
            continue;
        };
        if *owner != player {
            continue;
        }
        if *info_set >= counts.len() {
            counts.resize(info_set + 1, None);
        }
        match counts[*info_set] {
            Some(expected) if expected != actions.len() => {
                return Err(ConfigurationError::InfoSetActionCount {
                    player,
                    info_set: *info_set,
                    expected,
                    found: actions.len(),
                });
            }
            _ => counts[*info_set] = Some(actions.len()),
        }
    }
    if let Some(info_set) = counts.iter().position(Option::is_none) {
        return Err(ConfigurationError::UnusedInfoSet { player, info_set });
    }
    Ok(counts.len())
}
