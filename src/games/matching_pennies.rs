//! Matching pennies and a biased variant.
//!
//! Player one picks Heads or Tails, then player two picks without seeing the
//! first choice: both of player two's nodes share information set 0. Player
//! one wins on a match.

use crate::cfr::error::ConfigurationError;
use crate::tree::{GameTree, Player, TreeBuilder};

/// Payoffs to player one for HH, HT, TH and TT.
fn pennies(payoffs: [f64; 4]) -> Result<GameTree, ConfigurationError> {
    let [hh, ht, th, tt] = payoffs;
    let mut builder = TreeBuilder::with_capacity(7);
    let hh = builder.leaf(hh);
    let ht = builder.leaf(ht);
    let th = builder.leaf(th);
    let tt = builder.leaf(tt);
    let after_heads = builder.decision(Player::Two, 0, [("Heads", hh), ("Tails", ht)]);
    let after_tails = builder.decision(Player::Two, 0, [("Heads", th), ("Tails", tt)]);
    let root = builder.decision(
        Player::One,
        0,
        [("Heads", after_heads), ("Tails", after_tails)],
    );
    builder.build(root)
}

/// Symmetric matching pennies: ±1. Equilibrium is (1/2, 1/2) for both
/// players with value 0.
pub fn matching_pennies() -> Result<GameTree, ConfigurationError> {
    pennies([1.0, -1.0, -1.0, 1.0])
}

/// Matching on Heads pays 2, on Tails 1, a mismatch costs 1.
///
/// Both players play Heads with probability 2/5 at equilibrium and the game
/// is worth 1/5 to player one.
pub fn biased_pennies() -> Result<GameTree, ConfigurationError> {
    pennies([2.0, -1.0, -1.0, 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{GameTreeProvider, NodeKind};

    #[test]
    fn test_shape() {
        let tree = matching_pennies().unwrap();
        assert_eq!(tree.num_nodes(), 7);
        assert_eq!(tree.num_info_sets(Player::One), 1);
        assert_eq!(tree.num_info_sets(Player::Two), 1);

        let root = tree.node(tree.root());
        assert!(matches!(
            root.kind,
            NodeKind::Decision { player: Player::One, info_set: 0, .. }
        ));
        let names: Vec<&str> = root.actions().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Heads", "Tails"]);
    }

    #[test]
    fn test_player_two_cannot_see_player_one() {
        let tree = biased_pennies().unwrap();
        for edge in tree.node(tree.root()).actions() {
            assert_eq!(tree.node(edge.child).info_set(), Some(0));
        }
    }
}
