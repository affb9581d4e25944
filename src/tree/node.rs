//! Nodes, actions and player identities of an extensive-form game tree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position in the node table.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the two strategic players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    /// Player one. Leaf payoffs are stated from this player's perspective.
    One,
    /// Player two.
    Two,
}

impl Player {
    /// Both players, in update order.
    pub const BOTH: [Player; 2] = [Player::One, Player::Two];

    /// `+1` for player one, `-1` for player two.
    pub fn sign(self) -> f64 {
        match self {
            Player::One => 1.0,
            Player::Two => -1.0,
        }
    }

    /// The other player.
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "player 1"),
            Player::Two => write!(f, "player 2"),
        }
    }
}

/// Who moves at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Turn {
    /// Chance move with fixed probabilities.
    Nature,
    /// A strategic player's decision.
    Player(Player),
    /// Terminal node; nobody moves.
    Leaf,
}

/// An edge from a node to one child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Name, unique among siblings.
    pub name: String,
    /// The node this action leads to.
    pub child: NodeId,
    /// Fixed probability, present only on nature actions.
    pub probability: Option<f64>,
}

impl Action {
    /// A decision action.
    pub fn decision(name: impl Into<String>, child: NodeId) -> Self {
        Self {
            name: name.into(),
            child,
            probability: None,
        }
    }

    /// A nature action taken with `probability`.
    pub fn chance(name: impl Into<String>, child: NodeId, probability: f64) -> Self {
        Self {
            name: name.into(),
            child,
            probability: Some(probability),
        }
    }
}

/// What kind of node this is, with the data that kind carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Terminal node with a player-one payoff. Player two receives the negation.
    Leaf {
        /// Payoff to player one.
        payoff: f64,
    },
    /// Chance node.
    Nature {
        /// Outcomes, each with a probability.
        actions: Vec<Action>,
    },
    /// Decision node owned by a player.
    Decision {
        /// Acting player.
        player: Player,
        /// Original information set of `player`.
        info_set: usize,
        /// Available actions, in the order shared by the information set.
        actions: Vec<Action>,
    },
}

/// A node of the game tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identity, equal to the node's index in its tree.
    pub id: NodeId,
    /// Kind and payload.
    pub kind: NodeKind,
}

impl Node {
    /// Who moves here.
    pub fn turn(&self) -> Turn {
        match self.kind {
            NodeKind::Leaf { .. } => Turn::Leaf,
            NodeKind::Nature { .. } => Turn::Nature,
            NodeKind::Decision { player, .. } => Turn::Player(player),
        }
    }

    /// Outgoing actions; empty for leaves.
    pub fn actions(&self) -> &[Action] {
        match &self.kind {
            NodeKind::Leaf { .. } => &[],
            NodeKind::Nature { actions } | NodeKind::Decision { actions, .. } => actions,
        }
    }

    /// Information set, for decision nodes.
    pub fn info_set(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Decision { info_set, .. } => Some(info_set),
            _ => None,
        }
    }

    /// Player-one payoff, for leaves.
    pub fn payoff(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Leaf { payoff } => Some(payoff),
            _ => None,
        }
    }

    /// Whether this node is terminal.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_sign_and_opponent() {
        assert_eq!(Player::One.sign(), 1.0);
        assert_eq!(Player::Two.sign(), -1.0);
        assert_eq!(Player::One.opponent(), Player::Two);
        assert_eq!(Player::Two.opponent(), Player::One);
    }

    #[test]
    fn test_node_accessors() {
        let leaf = Node {
            id: NodeId(0),
            kind: NodeKind::Leaf { payoff: 2.5 },
        };
        assert_eq!(leaf.turn(), Turn::Leaf);
        assert!(leaf.actions().is_empty());
        assert_eq!(leaf.payoff(), Some(2.5));
        assert_eq!(leaf.info_set(), None);

        let decision = Node {
            id: NodeId(1),
            kind: NodeKind::Decision {
                player: Player::Two,
                info_set: 3,
                actions: vec![Action::decision("fold", NodeId(0))],
            },
        };
        assert_eq!(decision.turn(), Turn::Player(Player::Two));
        assert_eq!(decision.info_set(), Some(3));
        assert_eq!(decision.actions().len(), 1);
        assert!(!decision.is_leaf());
    }
}
