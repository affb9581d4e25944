//! Traversal cursor threaded through the recursive tree walks.
//!
//! A [`GameState`] tracks the path from the root to the current node, one
//! stack of `(action, probability)` steps per actor (nature, player one,
//! player two) for reach probabilities, and the per-iteration memo the
//! sampling engine uses to replay its draws.
//!
//! Steps are only pushed through [`Game::apply`](crate::cfr::game::Game::apply),
//! which hands back a [`Descent`] guard. Dropping the guard undoes the step,
//! so every push is paired with exactly one pop.

use std::ops::{Deref, DerefMut};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cfr::error::InvalidStateError;
use crate::tree::{NodeId, Player, Turn};

/// What the cursor sees at the current node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Terminal node.
    Leaf {
        /// Player-one payoff.
        payoff: f64,
    },
    /// Chance node.
    Nature {
        /// Number of outcomes.
        actions: usize,
    },
    /// Decision node.
    Decision {
        /// Acting player.
        player: Player,
        /// Original information set.
        info_set: usize,
        /// Information set after abstraction.
        abstract_info_set: usize,
        /// Number of actions.
        actions: usize,
    },
}

impl Position {
    /// Who moves here.
    pub fn turn(&self) -> Turn {
        match *self {
            Position::Leaf { .. } => Turn::Leaf,
            Position::Nature { .. } => Turn::Nature,
            Position::Decision { player, .. } => Turn::Player(player),
        }
    }

    /// Number of actions, zero at a leaf.
    pub fn num_actions(&self) -> usize {
        match *self {
            Position::Leaf { .. } => 0,
            Position::Nature { actions } | Position::Decision { actions, .. } => actions,
        }
    }
}

/// Owner of a probability stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    /// Chance.
    Nature,
    /// A strategic player.
    Player(Player),
}

/// One action taken on the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Action index at the parent node.
    pub action: usize,
    /// Probability the actor assigned to the action.
    pub probability: f64,
    /// Product of this actor's probabilities up to and including this step.
    pub reach: f64,
}

/// Memo key for a sampled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKey {
    /// Nature outcome at a specific node.
    Nature(NodeId),
    /// A player's action at an original information set.
    Decision(Player, usize),
}

/// Path state of one traversal.
#[derive(Debug, Clone)]
pub struct GameState {
    nature: Vec<Step>,
    one: Vec<Step>,
    two: Vec<Step>,
    path: Vec<NodeId>,
    trail: Vec<Position>,
    position: Position,
    samples: FxHashMap<SampleKey, usize>,
    matched: FxHashSet<(Player, usize)>,
    averaged: FxHashSet<(Player, usize)>,
}

impl GameState {
    /// A cursor positioned at `root`.
    pub(crate) fn new(root: NodeId, position: Position) -> Self {
        Self {
            nature: Vec::new(),
            one: Vec::new(),
            two: Vec::new(),
            path: vec![root],
            trail: Vec::new(),
            position,
            samples: FxHashMap::default(),
            matched: FxHashSet::default(),
            averaged: FxHashSet::default(),
        }
    }

    /// The node the cursor stands on.
    pub fn current_node(&self) -> NodeId {
        self.path[self.path.len() - 1]
    }

    /// What the cursor sees at the current node.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Who moves at the current node.
    pub fn current_turn(&self) -> Turn {
        self.position.turn()
    }

    /// Whether the current node is terminal.
    pub fn is_leaf(&self) -> bool {
        matches!(self.position, Position::Leaf { .. })
    }

    /// Player-one payoff of the current leaf.
    pub fn payoff(&self) -> Result<f64, InvalidStateError> {
        match self.position {
            Position::Leaf { payoff } => Ok(payoff),
            _ => Err(InvalidStateError::NotLeaf(self.current_node())),
        }
    }

    /// Acting player and original information set of the current decision node.
    pub fn info_set(&self) -> Result<(Player, usize), InvalidStateError> {
        match self.position {
            Position::Decision {
                player, info_set, ..
            } => Ok((player, info_set)),
            _ => Err(InvalidStateError::NotDecision(self.current_node())),
        }
    }

    /// Acting player and abstract information set of the current decision node.
    pub fn abstract_info_set(&self) -> Result<(Player, usize), InvalidStateError> {
        match self.position {
            Position::Decision {
                player,
                abstract_info_set,
                ..
            } => Ok((player, abstract_info_set)),
            _ => Err(InvalidStateError::NotDecision(self.current_node())),
        }
    }

    /// Node ids from the root to the current node.
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// Number of actions taken since the root.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Steps taken by `actor` on the path.
    pub fn steps(&self, actor: Actor) -> &[Step] {
        match actor {
            Actor::Nature => &self.nature,
            Actor::Player(Player::One) => &self.one,
            Actor::Player(Player::Two) => &self.two,
        }
    }

    /// Product of `actor`'s probabilities on the path.
    pub fn reach(&self, actor: Actor) -> f64 {
        self.steps(actor).last().map_or(1.0, |step| step.reach)
    }

    /// Reach probability contributed by everyone except `player`.
    pub fn reach_excluding(&self, player: Player) -> f64 {
        self.reach(Actor::Nature) * self.reach(Actor::Player(player.opponent()))
    }

    /// The action memoized under `key` this iteration, if any.
    pub fn sampled(&self, key: SampleKey) -> Option<usize> {
        self.samples.get(&key).copied()
    }

    /// The memoized action for `key`, drawing and storing one if absent.
    pub fn sample_or_insert_with<F>(&mut self, key: SampleKey, draw: F) -> usize
    where
        F: FnOnce() -> usize,
    {
        *self.samples.entry(key).or_insert_with(draw)
    }

    /// Forget every sampled action and per-iteration mark.
    pub fn reset_samples(&mut self) {
        self.samples.clear();
        self.matched.clear();
        self.averaged.clear();
    }

    /// Record that an abstract set was regret-matched this iteration.
    /// Returns `true` on the first call per iteration.
    pub(crate) fn mark_matched(&mut self, player: Player, info_set: usize) -> bool {
        self.matched.insert((player, info_set))
    }

    /// Record that an abstract set was averaged this sub-pass.
    /// Returns `true` on the first call per sub-pass.
    pub(crate) fn mark_averaged(&mut self, player: Player, info_set: usize) -> bool {
        self.averaged.insert((player, info_set))
    }

    pub(crate) fn clear_averaged(&mut self) {
        self.averaged.clear();
    }

    /// Move to `child` via `action`, taken with `probability` by the actor of
    /// the current node. The caller has checked that the node is not a leaf.
    pub(crate) fn push(
        &mut self,
        child: NodeId,
        position: Position,
        action: usize,
        probability: f64,
    ) {
        let stack = match self.position {
            Position::Nature { .. } | Position::Leaf { .. } => &mut self.nature,
            Position::Decision {
                player: Player::One,
                ..
            } => &mut self.one,
            Position::Decision {
                player: Player::Two,
                ..
            } => &mut self.two,
        };
        let reach = stack.last().map_or(1.0, |step| step.reach) * probability;
        stack.push(Step {
            action,
            probability,
            reach,
        });
        self.path.push(child);
        self.trail.push(std::mem::replace(&mut self.position, position));
    }

    /// Undo the most recent [`push`](Self::push). No-op at the root.
    pub(crate) fn pop(&mut self) {
        let Some(parent) = self.trail.pop() else {
            return;
        };
        self.position = parent;
        self.path.pop();
        match parent {
            Position::Nature { .. } | Position::Leaf { .. } => self.nature.pop(),
            Position::Decision {
                player: Player::One,
                ..
            } => self.one.pop(),
            Position::Decision {
                player: Player::Two,
                ..
            } => self.two.pop(),
        };
    }
}

/// A step into a child node, undone when dropped.
#[derive(Debug)]
pub struct Descent<'s> {
    state: &'s mut GameState,
}

impl<'s> Descent<'s> {
    pub(crate) fn new(state: &'s mut GameState) -> Self {
        Self { state }
    }
}

impl Deref for Descent<'_> {
    type Target = GameState;

    fn deref(&self) -> &GameState {
        self.state
    }
}

impl DerefMut for Descent<'_> {
    fn deref_mut(&mut self) -> &mut GameState {
        self.state
    }
}

impl Drop for Descent<'_> {
    fn drop(&mut self) {
        self.state.pop();
    }
}
