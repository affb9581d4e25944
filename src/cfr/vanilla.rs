//! Vanilla CFR: full-tree traversal with exact expected values.
//!
//! Each iteration walks the whole tree once. At a decision node every action
//! is explored under the current strategy, counterfactual regret is added
//! weighted by the reach probability of everyone but the acting player, and
//! the acting player's own reach is recorded for the average-strategy update.
//! A regret-matching sweep over all tables follows the traversal.

use crate::cfr::error::{InvalidStateError, NumericDriftWarning};
use crate::cfr::game::Game;
use crate::cfr::state::{Actor, GameState, Position};
use crate::cfr::storage::StrategyTables;
use crate::tree::{GameTreeProvider, Player};

/// One vanilla CFR iteration over borrowed tables.
pub(crate) struct VanillaCfr<'a, T> {
    game: &'a Game<T>,
    tables: &'a mut StrategyTables,
}

impl<'a, T: GameTreeProvider> VanillaCfr<'a, T> {
    pub(crate) fn new(game: &'a Game<T>, tables: &'a mut StrategyTables) -> Self {
        Self { game, tables }
    }

    /// Traverse the tree, then regret-match every information set.
    ///
    /// Returns the player-one value of the traversal under the current
    /// strategies together with any drift warnings.
    pub(crate) fn iterate(
        &mut self,
        iteration: u64,
        tolerance: f64,
    ) -> Result<(f64, Vec<NumericDriftWarning>), InvalidStateError> {
        let mut state = self.game.start();
        let value = self.walk(&mut state)?;
        Ok((value, self.match_regrets(iteration, tolerance)))
    }

    fn walk(&mut self, state: &mut GameState) -> Result<f64, InvalidStateError> {
        match state.position() {
            Position::Leaf { payoff } => Ok(payoff),
            Position::Nature { actions } => {
                let mut value = 0.0;
                for action in 0..actions {
                    let probability = self.game.nature_probability(state, action)?;
                    let mut child = self.game.apply(state, action, probability)?;
                    value += probability * self.walk(&mut child)?;
                }
                Ok(value)
            }
            Position::Decision {
                player,
                info_set,
                abstract_info_set,
                actions,
            } => self.walk_decision(state, player, info_set, abstract_info_set, actions),
        }
    }

    fn walk_decision(
        &mut self,
        state: &mut GameState,
        player: Player,
        info_set: usize,
        abstract_info_set: usize,
        actions: usize,
    ) -> Result<f64, InvalidStateError> {
        let strategy = self.tables.table(player, abstract_info_set)?.current().to_vec();
        let slots: Vec<usize> = (0..actions)
            .map(|a| self.game.abstract_action(player, info_set, a))
            .collect();

        let mut values = vec![0.0; actions];
        for (action, &slot) in slots.iter().enumerate() {
            let mut child = self.game.apply(state, action, strategy[slot])?;
            values[action] = self.walk(&mut child)?;
        }

        let node_value: f64 = slots
            .iter()
            .zip(&values)
            .map(|(&slot, &v)| strategy[slot] * v)
            .sum();

        let counterfactual = player.sign() * state.reach_excluding(player);
        let own = state.reach(Actor::Player(player));
        let table = self.tables.table_mut(player, abstract_info_set)?;
        for (&slot, &v) in slots.iter().zip(&values) {
            table.add_regret(slot, counterfactual * (v - node_value));
        }
        table.set_reach(own);

        Ok(node_value)
    }

    /// Fold the strategy just played into the average, weighted by the last
    /// recorded own reach, then regret-match.
    fn match_regrets(&mut self, iteration: u64, tolerance: f64) -> Vec<NumericDriftWarning> {
        let mut warnings = Vec::new();
        for player in Player::BOTH {
            for (info_set, table) in self.tables.player_mut(player).iter_mut() {
                table.accumulate_average(table.reach());
                let sum = table.regret_match();
                warnings.extend(NumericDriftWarning::check(
                    player, info_set, sum, iteration, tolerance,
                ));
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::matching_pennies::{biased_pennies, matching_pennies};
    use crate::tree::TreeBuilder;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_uniform_matching_pennies_has_no_regret() {
        let game = Game::new(matching_pennies().unwrap(), None, 1e-3).unwrap();
        let mut tables = StrategyTables::new(&game);
        let (value, warnings) = VanillaCfr::new(&game, &mut tables).iterate(1, 1e-8).unwrap();

        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-12);
        assert!(warnings.is_empty());
        for player in Player::BOTH {
            let table = tables.get(player, 0).unwrap();
            assert!(table.regrets().iter().all(|r| r.abs() < 1e-12));
            assert_eq!(table.current(), &[0.5, 0.5]);
            assert_abs_diff_eq!(table.reach(), 1.0);
        }
    }

    #[test]
    fn test_biased_pennies_first_iteration_regrets() {
        // Under uniform play, player one's Heads is worth (2 - 1) / 2 = 0.5 and
        // Tails (-1 + 1) / 2 = 0; the node value is 0.25.
        let game = Game::new(biased_pennies().unwrap(), None, 1e-3).unwrap();
        let mut tables = StrategyTables::new(&game);
        VanillaCfr::new(&game, &mut tables).iterate(1, 1e-8).unwrap();

        let one = tables.get(Player::One, 0).unwrap();
        assert_abs_diff_eq!(one.regrets()[0], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(one.regrets()[1], -0.25, epsilon = 1e-12);
        assert_eq!(one.current(), &[1.0, 0.0]);
        assert_eq!(one.average_strategy(), vec![0.5, 0.5]);

        // Player two: Heads costs 0.5 in total (both branches at reach 1/2),
        // Tails gains it back.
        let two = tables.get(Player::Two, 0).unwrap();
        assert_abs_diff_eq!(two.regrets()[0], -0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(two.regrets()[1], 0.25, epsilon = 1e-12);
        assert_eq!(two.current(), &[0.0, 1.0]);
    }

    #[test]
    fn test_nature_expectation_is_exact() {
        let mut builder = TreeBuilder::new();
        let a = builder.leaf(3.0);
        let b = builder.leaf(-1.0);
        let root = builder.nature([("a", 0.25, a), ("b", 0.75, b)]);
        let game = Game::new(builder.build(root).unwrap(), None, 1e-3).unwrap();
        let mut tables = StrategyTables::new(&game);
        let (value, _) = VanillaCfr::new(&game, &mut tables).iterate(1, 1e-8).unwrap();
        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-12);
    }
}
