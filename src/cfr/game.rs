//! The solver's view of a game: a tree provider plus its abstraction.
//!
//! [`Game`] is what the engines actually talk to. It answers cursor-level
//! questions (how many actions here, what is the probability of this nature
//! outcome), moves a [`GameState`] up and down the tree, and translates
//! original information sets and actions into abstract ones.

use crate::cfr::abstraction::Abstraction;
use crate::cfr::error::{ConfigurationError, InvalidStateError};
use crate::cfr::state::{Descent, GameState, Position};
use crate::tree::{check_node, GameTreeProvider, Node, NodeId, NodeKind, Player};

/// A validated tree together with the abstraction its solver uses.
#[derive(Debug, Clone)]
pub struct Game<T> {
    tree: T,
    abstraction: Abstraction,
    installed: bool,
    one_layout: Vec<Option<usize>>,
    two_layout: Vec<Option<usize>>,
}

impl<T: GameTreeProvider> Game<T> {
    /// Validate `tree` and `abstraction` together.
    ///
    /// Walks every node reachable from the root and checks the invariants the
    /// engines rely on. Without an abstraction the identity mapping is used.
    pub fn new(
        tree: T,
        abstraction: Option<Abstraction>,
        tolerance: f64,
    ) -> Result<Self, ConfigurationError> {
        let (one_counts, two_counts) = validate(&tree, tolerance)?;

        let installed = abstraction.is_some();
        let abstraction = match abstraction {
            Some(abstraction) => abstraction,
            None => Abstraction::identity(&tree),
        };
        let one_layout = abstraction
            .player(Player::One)
            .layout(Player::One, &one_counts)?;
        let two_layout = abstraction
            .player(Player::Two)
            .layout(Player::Two, &two_counts)?;

        Ok(Self {
            tree,
            abstraction,
            installed,
            one_layout,
            two_layout,
        })
    }

    /// The underlying tree.
    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// The abstraction in use (identity if none was supplied).
    pub fn abstraction(&self) -> &Abstraction {
        &self.abstraction
    }

    /// Whether an abstraction was supplied at construction.
    pub fn has_abstraction(&self) -> bool {
        self.installed
    }

    /// Root node id.
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> &Node {
        self.tree.node(id)
    }

    /// Number of original information sets of `player`.
    pub fn num_info_sets(&self, player: Player) -> usize {
        self.tree.num_info_sets(player)
    }

    /// Number of abstract information set ids of `player`, including ids no
    /// original set maps to.
    pub fn num_abstract_info_sets(&self, player: Player) -> usize {
        self.layout(player).len()
    }

    /// Action count per abstract information set of `player`.
    pub fn layout(&self, player: Player) -> &[Option<usize>] {
        match player {
            Player::One => &self.one_layout,
            Player::Two => &self.two_layout,
        }
    }

    /// Abstract information set of `player`'s `original` set.
    pub fn abstract_info_set(&self, player: Player, original: usize) -> usize {
        self.abstraction.abstract_info_set(player, original)
    }

    /// Abstract action index of `action` at `player`'s `original` set.
    pub fn abstract_action(&self, player: Player, original: usize, action: usize) -> usize {
        self.abstraction.abstract_action(player, original, action)
    }

    /// Whether `player`'s `original` set maps to a different id.
    pub fn is_abstracted(&self, player: Player, original: usize) -> bool {
        self.abstraction.is_abstracted(player, original)
    }

    /// What a cursor standing on `id` sees.
    pub fn position_of(&self, id: NodeId) -> Position {
        match &self.tree.node(id).kind {
            NodeKind::Leaf { payoff } => Position::Leaf { payoff: *payoff },
            NodeKind::Nature { actions } => Position::Nature {
                actions: actions.len(),
            },
            NodeKind::Decision {
                player,
                info_set,
                actions,
            } => Position::Decision {
                player: *player,
                info_set: *info_set,
                abstract_info_set: self.abstract_info_set(*player, *info_set),
                actions: actions.len(),
            },
        }
    }

    /// A fresh cursor at the root.
    pub fn start(&self) -> GameState {
        let root = self.root();
        GameState::new(root, self.position_of(root))
    }

    /// Number of actions at the cursor's nature node or information set.
    pub fn num_actions(&self, state: &GameState) -> Result<usize, InvalidStateError> {
        match state.position() {
            Position::Leaf { .. } => Err(InvalidStateError::AtLeaf(state.current_node())),
            position => Ok(position.num_actions()),
        }
    }

    /// Fixed probability of nature outcome `action` at the cursor.
    pub fn nature_probability(
        &self,
        state: &GameState,
        action: usize,
    ) -> Result<f64, InvalidStateError> {
        let node = state.current_node();
        let NodeKind::Nature { actions } = &self.tree.node(node).kind else {
            return Err(InvalidStateError::NotNature(node));
        };
        actions
            .get(action)
            .map(|edge| edge.probability.unwrap_or(0.0))
            .ok_or(InvalidStateError::ActionOutOfRange {
                node,
                action,
                available: actions.len(),
            })
    }

    /// Take `action` with `probability`, returning a guard positioned at the
    /// child. The step is undone when the guard drops.
    pub fn apply<'s>(
        &self,
        state: &'s mut GameState,
        action: usize,
        probability: f64,
    ) -> Result<Descent<'s>, InvalidStateError> {
        let node = state.current_node();
        let actions = self.tree.node(node).actions();
        if actions.is_empty() {
            return Err(InvalidStateError::AtLeaf(node));
        }
        let edge = actions
            .get(action)
            .ok_or(InvalidStateError::ActionOutOfRange {
                node,
                action,
                available: actions.len(),
            })?;
        let child = edge.child;
        state.push(child, self.position_of(child), action, probability);
        Ok(Descent::new(state))
    }
}

/// Walk the reachable tree, returning per-player action counts indexed by
/// original information set.
fn validate<T: GameTreeProvider>(
    tree: &T,
    tolerance: f64,
) -> Result<(Vec<usize>, Vec<usize>), ConfigurationError> {
    let total = tree.num_nodes();
    let root = tree.root();
    if root.index() >= total {
        return Err(ConfigurationError::MissingRoot(root));
    }

    let mut one: Vec<Option<usize>> = vec![None; tree.num_info_sets(Player::One)];
    let mut two: Vec<Option<usize>> = vec![None; tree.num_info_sets(Player::Two)];
    let mut seen = vec![false; total];
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if std::mem::replace(&mut seen[id.index()], true) {
            return Err(ConfigurationError::SharedChild(id));
        }
        let node = tree.node(id);
        check_node(node, tolerance)?;

        if let NodeKind::Decision {
            player,
            info_set,
            actions,
        } = &node.kind
        {
            let counts = match player {
                Player::One => &mut one,
                Player::Two => &mut two,
            };
            let available = counts.len();
            let slot = counts
                .get_mut(*info_set)
                .ok_or(ConfigurationError::InfoSetOutOfRange {
                    player: *player,
                    info_set: *info_set,
                    count: available,
                })?;
            match *slot {
                Some(expected) if expected != actions.len() => {
                    return Err(ConfigurationError::InfoSetActionCount {
                        player: *player,
                        info_set: *info_set,
                        expected,
                        found: actions.len(),
                    });
                }
                _ => *slot = Some(actions.len()),
            }
        }

        for (action, edge) in node.actions().iter().enumerate() {
            if edge.child.index() >= total {
                return Err(ConfigurationError::DanglingChild {
                    node: id,
                    action,
                    child: edge.child,
                });
            }
            stack.push(edge.child);
        }
    }

    Ok((settle(one, Player::One)?, settle(two, Player::Two)?))
}

fn settle(counts: Vec<Option<usize>>, player: Player) -> Result<Vec<usize>, ConfigurationError> {
    counts
        .into_iter()
        .enumerate()
        .map(|(info_set, count)| {
            count.ok_or(ConfigurationError::UnusedInfoSet { player, info_set })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::abstraction::PlayerAbstraction;
    use crate::games::kuhn::kuhn_poker;
    use crate::games::matching_pennies::matching_pennies;
    use crate::tree::{GameTree, TreeBuilder, Turn};

    #[test]
    fn test_game_layout_without_abstraction() {
        let game = Game::new(kuhn_poker().unwrap(), None, 1e-3).unwrap();
        assert!(!game.has_abstraction());
        assert_eq!(game.num_info_sets(Player::One), 6);
        assert_eq!(game.num_abstract_info_sets(Player::Two), 6);
        assert!(game.layout(Player::One).iter().all(|&n| n == Some(2)));
    }

    #[test]
    fn test_nature_probability_requires_nature_node() {
        let game = Game::new(kuhn_poker().unwrap(), None, 1e-3).unwrap();
        let mut state = game.start();
        assert_eq!(game.num_actions(&state).unwrap(), 6);
        let p = game.nature_probability(&state, 2).unwrap();
        assert!((p - 1.0 / 6.0).abs() < 1e-12);
        assert!(matches!(
            game.nature_probability(&state, 6),
            Err(InvalidStateError::ActionOutOfRange { .. })
        ));

        let deal = game.apply(&mut state, 0, p).unwrap();
        assert_eq!(deal.current_turn(), Turn::Player(Player::One));
        assert!(matches!(
            game.nature_probability(&deal, 0),
            Err(InvalidStateError::NotNature(_))
        ));
    }

    #[test]
    fn test_apply_at_leaf_fails() {
        let game = Game::new(matching_pennies().unwrap(), None, 1e-3).unwrap();
        let mut state = game.start();
        let mut heads = game.apply(&mut state, 0, 0.5).unwrap();
        let mut leaf = game.apply(&mut heads, 0, 0.5).unwrap();
        assert!(leaf.is_leaf());
        assert_eq!(leaf.payoff().unwrap(), 1.0);
        assert!(matches!(
            game.apply(&mut leaf, 0, 1.0),
            Err(InvalidStateError::AtLeaf(_))
        ));
        assert!(matches!(
            game.num_actions(&leaf),
            Err(InvalidStateError::AtLeaf(_))
        ));
    }

    #[test]
    fn test_abstraction_mismatch_rejected_at_construction() {
        let mut builder = TreeBuilder::new();
        let a = builder.leaf(1.0);
        let b = builder.leaf(0.0);
        let c = builder.leaf(1.0);
        let d = builder.leaf(0.0);
        let e = builder.leaf(-1.0);
        let small = builder.decision(Player::One, 0, [("x", a), ("y", b)]);
        let large = builder.decision(Player::One, 1, [("x", c), ("y", d), ("z", e)]);
        let root = builder.nature([("left", 0.5, small), ("right", 0.5, large)]);
        let tree: GameTree = builder.build(root).unwrap();

        let abstraction = Abstraction::new(
            PlayerAbstraction::identity(&[2, 3]).with_merged(1, 0),
            PlayerAbstraction::identity(&[]),
        );
        let err = Game::new(tree, Some(abstraction), 1e-3).unwrap_err();
        assert!(matches!(err, ConfigurationError::AbstractActionCount { .. }));
    }

    #[test]
    fn test_merged_info_sets_share_abstract_id() {
        let abstraction = Abstraction::new(
            PlayerAbstraction::identity(&[2; 6]).with_merged(1, 0),
            PlayerAbstraction::identity(&[2; 6]),
        );
        let game = Game::new(kuhn_poker().unwrap(), Some(abstraction), 1e-3).unwrap();
        assert!(game.has_abstraction());
        assert!(game.is_abstracted(Player::One, 1));
        assert_eq!(game.abstract_info_set(Player::One, 1), 0);
        assert_eq!(game.layout(Player::One)[1], None);
        assert_eq!(game.layout(Player::One)[0], Some(2));
    }
}
