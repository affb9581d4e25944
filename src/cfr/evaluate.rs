//! Evaluation of average strategies: expected value, best response and
//! exploitability.
//!
//! All functions read the tree through node ids and never touch a cursor.
//! Average strategies live in abstract information sets; they are mapped
//! back to each original information set's action order before use.
//! Information sets that were never reached play uniformly.

use rustc_hash::FxHashMap;

use crate::cfr::error::InvalidStateError;
use crate::cfr::game::Game;
use crate::cfr::storage::StrategyTables;
use crate::tree::{GameTreeProvider, NodeId, NodeKind, Player};

/// `player`'s average strategy at original information set `info_set`,
/// in original action order.
pub fn average_policy<T: GameTreeProvider>(
    game: &Game<T>,
    tables: &StrategyTables,
    player: Player,
    info_set: usize,
    num_actions: usize,
) -> Result<Vec<f64>, InvalidStateError> {
    let abstract_info_set = game.abstract_info_set(player, info_set);
    let average = tables.table(player, abstract_info_set)?.average_or_uniform();
    Ok((0..num_actions)
        .map(|a| average[game.abstract_action(player, info_set, a)])
        .collect())
}

/// Player-one value when both players follow their average strategies.
pub fn expected_value<T: GameTreeProvider>(
    game: &Game<T>,
    tables: &StrategyTables,
) -> Result<f64, InvalidStateError> {
    value_of(game, tables, game.root())
}

fn value_of<T: GameTreeProvider>(
    game: &Game<T>,
    tables: &StrategyTables,
    id: NodeId,
) -> Result<f64, InvalidStateError> {
    match &game.node(id).kind {
        NodeKind::Leaf { payoff } => Ok(*payoff),
        NodeKind::Nature { actions } => {
            actions
                .iter()
                .try_fold(0.0, |acc, edge| -> Result<f64, InvalidStateError> {
                    let p = edge.probability.unwrap_or(0.0);
                    Ok(acc + p * value_of(game, tables, edge.child)?)
                })
        }
        NodeKind::Decision {
            player,
            info_set,
            actions,
        } => {
            let policy = average_policy(game, tables, *player, *info_set, actions.len())?;
            actions
                .iter()
                .zip(&policy)
                .try_fold(0.0, |acc, (edge, &p)| -> Result<f64, InvalidStateError> {
                    Ok(acc + p * value_of(game, tables, edge.child)?)
                })
        }
    }
}

/// Decision nodes of one responder information set, each with the
/// probability that nature and the opponent lead there.
struct Frontier {
    depth: usize,
    nodes: Vec<(NodeId, f64)>,
}

/// Best response of `responder` against the other player's average strategy.
struct BestResponse<'a, T> {
    game: &'a Game<T>,
    tables: &'a StrategyTables,
    responder: Player,
    choice: FxHashMap<usize, usize>,
}

impl<'a, T: GameTreeProvider> BestResponse<'a, T> {
    fn new(game: &'a Game<T>, tables: &'a StrategyTables, responder: Player) -> Self {
        Self {
            game,
            tables,
            responder,
            choice: FxHashMap::default(),
        }
    }

    fn solve(mut self) -> Result<f64, InvalidStateError> {
        let mut frontiers: FxHashMap<usize, Frontier> = FxHashMap::default();
        self.collect(self.game.root(), 1.0, 0, &mut frontiers)?;

        let mut order: Vec<(usize, Frontier)> = frontiers.into_iter().collect();
        order.sort_by(|a, b| b.1.depth.cmp(&a.1.depth).then(a.0.cmp(&b.0)));

        for (info_set, frontier) in order {
            let Some(&(first, _)) = frontier.nodes.first() else {
                continue;
            };
            let children: Vec<Vec<NodeId>> = frontier
                .nodes
                .iter()
                .map(|&(id, _)| self.game.node(id).actions().iter().map(|e| e.child).collect())
                .collect();
            let num_actions = self.game.node(first).actions().len();

            let mut best = (0, f64::NEG_INFINITY);
            for action in 0..num_actions {
                let mut value = 0.0;
                for (&(_, weight), kids) in frontier.nodes.iter().zip(&children) {
                    if weight > 0.0 {
                        value += weight * self.value(kids[action])?;
                    }
                }
                if value > best.1 {
                    best = (action, value);
                }
            }
            self.choice.insert(info_set, best.0);
        }

        self.value(self.game.root())
    }

    /// Gather responder information sets, their depth in responder moves and
    /// the opponent-and-nature reach of each member node.
    fn collect(
        &self,
        id: NodeId,
        reach: f64,
        depth: usize,
        frontiers: &mut FxHashMap<usize, Frontier>,
    ) -> Result<(), InvalidStateError> {
        match &self.game.node(id).kind {
            NodeKind::Leaf { .. } => Ok(()),
            NodeKind::Nature { actions } => {
                for edge in actions {
                    let p = edge.probability.unwrap_or(0.0);
                    self.collect(edge.child, reach * p, depth, frontiers)?;
                }
                Ok(())
            }
            NodeKind::Decision {
                player,
                info_set,
                actions,
            } if *player == self.responder => {
                frontiers
                    .entry(*info_set)
                    .or_insert_with(|| Frontier {
                        depth,
                        nodes: Vec::new(),
                    })
                    .nodes
                    .push((id, reach));
                for edge in actions {
                    self.collect(edge.child, reach, depth + 1, frontiers)?;
                }
                Ok(())
            }
            NodeKind::Decision {
                player,
                info_set,
                actions,
            } => {
                let policy =
                    average_policy(self.game, self.tables, *player, *info_set, actions.len())?;
                for (edge, p) in actions.iter().zip(policy) {
                    self.collect(edge.child, reach * p, depth, frontiers)?;
                }
                Ok(())
            }
        }
    }

    /// Responder-perspective value of the subtree under `id`.
    ///
    /// Responder sets already resolved play their chosen action; any other
    /// responder node takes the locally best action.
    fn value(&self, id: NodeId) -> Result<f64, InvalidStateError> {
        match &self.game.node(id).kind {
            NodeKind::Leaf { payoff } => Ok(self.responder.sign() * payoff),
            NodeKind::Nature { actions } => {
                actions
                    .iter()
                    .try_fold(0.0, |acc, edge| -> Result<f64, InvalidStateError> {
                        let p = edge.probability.unwrap_or(0.0);
                        Ok(acc + p * self.value(edge.child)?)
                    })
            }
            NodeKind::Decision {
                player,
                info_set,
                actions,
            } if *player == self.responder => match self.choice.get(info_set) {
                Some(&action) => self.value(actions[action].child),
                None => actions.iter().try_fold(
                    f64::NEG_INFINITY,
                    |best: f64, edge| -> Result<f64, InvalidStateError> {
                        Ok(best.max(self.value(edge.child)?))
                    },
                ),
            },
            NodeKind::Decision {
                player,
                info_set,
                actions,
            } => {
                let policy =
                    average_policy(self.game, self.tables, *player, *info_set, actions.len())?;
                actions
                    .iter()
                    .zip(&policy)
                    .try_fold(0.0, |acc, (edge, &p)| -> Result<f64, InvalidStateError> {
                        Ok(acc + p * self.value(edge.child)?)
                    })
            }
        }
    }
}

/// `responder`'s value, in its own perspective, when it best-responds in the
/// original information sets to the other player's average strategy.
pub fn best_response_value<T: GameTreeProvider>(
    game: &Game<T>,
    tables: &StrategyTables,
    responder: Player,
) -> Result<f64, InvalidStateError> {
    BestResponse::new(game, tables, responder).solve()
}

/// Mean gain of the two best responses: `(br_one + br_two) / 2`.
///
/// Non-negative, and zero exactly at an equilibrium.
pub fn exploitability<T: GameTreeProvider>(
    game: &Game<T>,
    tables: &StrategyTables,
) -> Result<f64, InvalidStateError> {
    let one = best_response_value(game, tables, Player::One)?;
    let two = best_response_value(game, tables, Player::Two)?;
    Ok((one + two) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::kuhn::kuhn_poker;
    use crate::games::matching_pennies::{biased_pennies, matching_pennies};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_uniform_pennies_value_and_exploitability() {
        let game = Game::new(matching_pennies().unwrap(), None, 1e-3).unwrap();
        let tables = StrategyTables::new(&game);
        assert_abs_diff_eq!(expected_value(&game, &tables).unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(exploitability(&game, &tables).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_best_response_exploits_uniform_biased_pennies() {
        // Against a uniform opponent, player one's Heads earns 0.5 and player
        // two's Tails earns 0.5 (Heads costs -0.5).
        let game = Game::new(biased_pennies().unwrap(), None, 1e-3).unwrap();
        let tables = StrategyTables::new(&game);
        assert_abs_diff_eq!(expected_value(&game, &tables).unwrap(), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(
            best_response_value(&game, &tables, Player::One).unwrap(),
            0.5,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            best_response_value(&game, &tables, Player::Two).unwrap(),
            0.0,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(exploitability(&game, &tables).unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_best_response_dominates_expected_value() {
        let game = Game::new(kuhn_poker().unwrap(), None, 1e-3).unwrap();
        let tables = StrategyTables::new(&game);
        let value = expected_value(&game, &tables).unwrap();
        let one = best_response_value(&game, &tables, Player::One).unwrap();
        let two = best_response_value(&game, &tables, Player::Two).unwrap();
        assert!(one >= value - 1e-12);
        assert!(two >= -value - 1e-12);
        assert!(exploitability(&game, &tables).unwrap() > 0.0);
    }
}
