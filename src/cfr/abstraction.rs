//! Information-set abstraction.
//!
//! An abstraction maps each player's original information sets onto a smaller
//! set of abstract ones. Original sets mapped to the same abstract set share
//! one regret/strategy table. Actions are mapped per original information set
//! so that merged sets can line up actions that appear in different orders.
//!
//! The identity abstraction maps every id to itself and behaves exactly like
//! no abstraction at all.

use serde::{Deserialize, Serialize};

use crate::cfr::error::ConfigurationError;
use crate::tree::{info_set_action_counts, GameTreeProvider, Player};

/// One player's mapping from original to abstract ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAbstraction {
    /// `info_sets[original] -> abstract`
    info_sets: Vec<usize>,
    /// `actions[original][original_action] -> abstract_action`
    actions: Vec<Vec<usize>>,
}

impl PlayerAbstraction {
    /// Build from explicit tables.
    pub fn new(info_sets: Vec<usize>, actions: Vec<Vec<usize>>) -> Self {
        Self { info_sets, actions }
    }

    /// Identity mapping for information sets with the given action counts.
    pub fn identity(action_counts: &[usize]) -> Self {
        Self {
            info_sets: (0..action_counts.len()).collect(),
            actions: action_counts.iter().map(|&n| (0..n).collect()).collect(),
        }
    }

    /// Map `original` onto abstract information set `into`.
    ///
    /// # Panics
    /// If `original` is not an information set of this mapping.
    pub fn with_merged(mut self, original: usize, into: usize) -> Self {
        self.info_sets[original] = into;
        self
    }

    /// Replace the action map of `original`.
    ///
    /// # Panics
    /// If `original` is not an information set of this mapping.
    pub fn with_action_map(mut self, original: usize, map: Vec<usize>) -> Self {
        self.actions[original] = map;
        self
    }

    /// Abstract information set of `original`.
    pub fn abstract_info_set(&self, original: usize) -> usize {
        self.info_sets[original]
    }

    /// Abstract action index of `action` at `original`.
    pub fn abstract_action(&self, original: usize, action: usize) -> usize {
        self.actions[original][action]
    }

    /// Whether `original` maps to a different id.
    pub fn is_abstracted(&self, original: usize) -> bool {
        self.info_sets[original] != original
    }

    /// Number of original information sets covered.
    pub fn len(&self) -> usize {
        self.info_sets.len()
    }

    /// Whether the mapping covers no information set.
    pub fn is_empty(&self) -> bool {
        self.info_sets.is_empty()
    }

    /// Action count per abstract information set, given the action count of
    /// every original one. `None` marks abstract ids no original set maps to.
    pub fn layout(
        &self,
        player: Player,
        action_counts: &[usize],
    ) -> Result<Vec<Option<usize>>, ConfigurationError> {
        if self.info_sets.len() != action_counts.len() || self.actions.len() != action_counts.len()
        {
            return Err(ConfigurationError::AbstractionSize {
                player,
                expected: action_counts.len(),
                found: self.info_sets.len().min(self.actions.len()),
            });
        }

        let mut layout: Vec<Option<usize>> = Vec::new();
        for (original, &count) in action_counts.iter().enumerate() {
            let map = &self.actions[original];
            if !is_permutation(map, count) {
                return Err(ConfigurationError::ActionMapping {
                    player,
                    info_set: original,
                    mapping: map.clone(),
                });
            }

            let target = self.info_sets[original];
            if target >= layout.len() {
                layout.resize(target + 1, None);
            }
            match layout[target] {
                Some(expected) if expected != count => {
                    return Err(ConfigurationError::AbstractActionCount {
                        player,
                        abstract_info_set: target,
                        expected,
                        found: count,
                    });
                }
                _ => layout[target] = Some(count),
            }
        }
        Ok(layout)
    }
}

fn is_permutation(map: &[usize], count: usize) -> bool {
    if map.len() != count {
        return false;
    }
    let mut seen = vec![false; count];
    for &slot in map {
        match seen.get_mut(slot) {
            Some(flag) if !*flag => *flag = true,
            _ => return false,
        }
    }
    true
}

/// Abstraction for both players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstraction {
    one: PlayerAbstraction,
    two: PlayerAbstraction,
}

impl Abstraction {
    /// Combine two per-player mappings.
    pub fn new(one: PlayerAbstraction, two: PlayerAbstraction) -> Self {
        Self { one, two }
    }

    /// The identity abstraction of `tree`.
    pub fn identity<T: GameTreeProvider>(tree: &T) -> Self {
        Self {
            one: PlayerAbstraction::identity(&info_set_action_counts(tree, Player::One)),
            two: PlayerAbstraction::identity(&info_set_action_counts(tree, Player::Two)),
        }
    }

    /// Mapping of one player.
    pub fn player(&self, player: Player) -> &PlayerAbstraction {
        match player {
            Player::One => &self.one,
            Player::Two => &self.two,
        }
    }

    /// Abstract information set of `player`'s `original` set.
    pub fn abstract_info_set(&self, player: Player, original: usize) -> usize {
        self.player(player).abstract_info_set(original)
    }

    /// Abstract action index of `action` at `player`'s `original` set.
    pub fn abstract_action(&self, player: Player, original: usize, action: usize) -> usize {
        self.player(player).abstract_action(original, action)
    }

    /// Whether `player`'s `original` set maps to a different id.
    pub fn is_abstracted(&self, player: Player, original: usize) -> bool {
        self.player(player).is_abstracted(original)
    }
}
