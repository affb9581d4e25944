//! Opponent-sampling Monte Carlo CFR.
//!
//! Each iteration first walks one root-to-leaf path, drawing an action at
//! every nature and decision node and memoizing the draws in the cursor. Two
//! update passes follow, one per player, both replaying the same memo:
//!
//! - at the updating player's nodes every action is explored under the
//!   current strategy, which is regret-matched lazily on the first visit of
//!   the iteration, and `u[a] - u_σ` is added to regret
//! - at the other player's nodes the current strategy is folded into the
//!   average (once per information set per pass) and only the memoized
//!   action is followed
//! - at nature nodes only the memoized outcome is followed
//!
//! Values are kept in the updating player's perspective, so regret updates
//! need no sign flip.

use rand::Rng;

use crate::cfr::error::{InvalidStateError, NumericDriftWarning};
use crate::cfr::game::Game;
use crate::cfr::state::{GameState, Position, SampleKey};
use crate::cfr::storage::StrategyTables;
use crate::tree::{GameTreeProvider, Player};

/// Index of the first action whose cumulative probability exceeds `r`.
///
/// Falls back to the last action with positive probability when rounding
/// leaves the total below `r`.
pub fn sample_index(probabilities: &[f64], r: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, &p) in probabilities.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return i;
        }
    }
    probabilities
        .iter()
        .rposition(|&p| p > 0.0)
        .unwrap_or_else(|| probabilities.len().saturating_sub(1))
}

/// One opponent-sampling iteration over borrowed tables.
pub(crate) struct OpponentSampling<'a, T, R> {
    game: &'a Game<T>,
    tables: &'a mut StrategyTables,
    rng: &'a mut R,
    iteration: u64,
    tolerance: f64,
    warnings: Vec<NumericDriftWarning>,
}

impl<'a, T: GameTreeProvider, R: Rng> OpponentSampling<'a, T, R> {
    pub(crate) fn new(
        game: &'a Game<T>,
        tables: &'a mut StrategyTables,
        rng: &'a mut R,
        iteration: u64,
        tolerance: f64,
    ) -> Self {
        Self {
            game,
            tables,
            rng,
            iteration,
            tolerance,
            warnings: Vec::new(),
        }
    }

    /// Pre-sample, then update player one and player two.
    ///
    /// Returns each player's sampled value (in that player's perspective) and
    /// any drift warnings from the lazy regret-matching.
    pub(crate) fn iterate(
        mut self,
    ) -> Result<([f64; 2], Vec<NumericDriftWarning>), InvalidStateError> {
        let mut state = self.game.start();
        state.reset_samples();
        self.presample(&mut state)?;

        let mut values = [0.0; 2];
        for (slot, player) in Player::BOTH.into_iter().enumerate() {
            state.clear_averaged();
            values[slot] = self.walk(&mut state, player)?;
        }
        Ok((values, self.warnings))
    }

    /// Seed the memo along one path without touching any table.
    fn presample(&mut self, state: &mut GameState) -> Result<(), InvalidStateError> {
        if state.is_leaf() {
            return Ok(());
        }
        let action = self.draw(state)?;
        let probability = self.probability(state, action)?;
        let mut child = self.game.apply(state, action, probability)?;
        self.presample(&mut child)
    }

    fn walk(&mut self, state: &mut GameState, updating: Player) -> Result<f64, InvalidStateError> {
        match state.position() {
            Position::Leaf { payoff } => Ok(updating.sign() * payoff),
            Position::Decision {
                player,
                info_set,
                abstract_info_set,
                actions,
            } if player == updating => {
                self.walk_updating(state, player, info_set, abstract_info_set, actions)
            }
            Position::Decision {
                player,
                abstract_info_set,
                ..
            } => {
                if state.mark_averaged(player, abstract_info_set) {
                    self.tables
                        .table_mut(player, abstract_info_set)?
                        .accumulate_average(1.0);
                }
                self.follow(state, updating)
            }
            Position::Nature { .. } => self.follow(state, updating),
        }
    }

    /// Descend along the memoized action.
    fn follow(
        &mut self,
        state: &mut GameState,
        updating: Player,
    ) -> Result<f64, InvalidStateError> {
        let action = self.draw(state)?;
        let probability = self.probability(state, action)?;
        let mut child = self.game.apply(state, action, probability)?;
        self.walk(&mut child, updating)
    }

    fn walk_updating(
        &mut self,
        state: &mut GameState,
        player: Player,
        info_set: usize,
        abstract_info_set: usize,
        actions: usize,
    ) -> Result<f64, InvalidStateError> {
        if state.mark_matched(player, abstract_info_set) {
            let sum = self.tables.table_mut(player, abstract_info_set)?.regret_match();
            self.warnings.extend(NumericDriftWarning::check(
                player,
                abstract_info_set,
                sum,
                self.iteration,
                self.tolerance,
            ));
        }

        let strategy = self.tables.table(player, abstract_info_set)?.current().to_vec();
        let slots: Vec<usize> = (0..actions)
            .map(|a| self.game.abstract_action(player, info_set, a))
            .collect();

        let mut values = vec![0.0; actions];
        for (action, &slot) in slots.iter().enumerate() {
            let mut child = self.game.apply(state, action, strategy[slot])?;
            values[action] = self.walk(&mut child, player)?;
        }

        let node_value: f64 = slots
            .iter()
            .zip(&values)
            .map(|(&slot, &v)| strategy[slot] * v)
            .sum();

        let table = self.tables.table_mut(player, abstract_info_set)?;
        for (&slot, &v) in slots.iter().zip(&values) {
            table.add_regret(slot, v - node_value);
        }
        Ok(node_value)
    }

    /// Probability the acting party assigns to `action` at the cursor.
    fn probability(&self, state: &GameState, action: usize) -> Result<f64, InvalidStateError> {
        match state.position() {
            Position::Nature { .. } => self.game.nature_probability(state, action),
            Position::Decision {
                player,
                info_set,
                abstract_info_set,
                ..
            } => {
                let slot = self.game.abstract_action(player, info_set, action);
                Ok(self.tables.table(player, abstract_info_set)?.current()[slot])
            }
            Position::Leaf { .. } => Err(InvalidStateError::AtLeaf(state.current_node())),
        }
    }

    /// The memoized action at the cursor, drawing one on first request.
    fn draw(&mut self, state: &mut GameState) -> Result<usize, InvalidStateError> {
        let (key, probabilities) = match state.position() {
            Position::Nature { actions } => {
                let key = SampleKey::Nature(state.current_node());
                if let Some(action) = state.sampled(key) {
                    return Ok(action);
                }
                let probabilities = (0..actions)
                    .map(|a| self.game.nature_probability(state, a))
                    .collect::<Result<Vec<f64>, _>>()?;
                (key, probabilities)
            }
            Position::Decision {
                player,
                info_set,
                abstract_info_set,
                actions,
            } => {
                let key = SampleKey::Decision(player, info_set);
                if let Some(action) = state.sampled(key) {
                    return Ok(action);
                }
                let current = self.tables.table(player, abstract_info_set)?.current();
                let probabilities = (0..actions)
                    .map(|a| current[self.game.abstract_action(player, info_set, a)])
                    .collect::<Vec<f64>>();
                (key, probabilities)
            }
            Position::Leaf { .. } => return Err(InvalidStateError::AtLeaf(state.current_node())),
        };
        let r: f64 = self.rng.gen();
        Ok(state.sample_or_insert_with(key, || sample_index(&probabilities, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::kuhn::kuhn_poker;
    use crate::games::matching_pennies::matching_pennies;
    use crate::tree::TreeBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_index_cumulative_rule() {
        let p = [0.2, 0.5, 0.3];
        assert_eq!(sample_index(&p, 0.0), 0);
        assert_eq!(sample_index(&p, 0.19), 0);
        assert_eq!(sample_index(&p, 0.2), 1);
        assert_eq!(sample_index(&p, 0.69), 1);
        assert_eq!(sample_index(&p, 0.71), 2);
        assert_eq!(sample_index(&[0.5, 0.4999], 0.99995), 1);
        // Rounding shortfall never lands on an action that is never played
        assert_eq!(sample_index(&[0.3, 0.6999, 0.0], 0.99995), 1);
        assert_eq!(sample_index(&[0.0, 0.0], 0.5), 1);
    }

    #[test]
    fn test_presample_memo_is_replayed() {
        let game = Game::new(kuhn_poker().unwrap(), None, 1e-3).unwrap();
        let mut tables = StrategyTables::new(&game);
        let mut rng = StdRng::seed_from_u64(3);
        let mut sampler = OpponentSampling::new(&game, &mut tables, &mut rng, 1, 1e-8);

        let mut state = game.start();
        sampler.presample(&mut state).unwrap();
        assert_eq!(state.depth(), 0, "presample must undo its descent");

        let deal = sampler.draw(&mut state).unwrap();
        let key = SampleKey::Nature(state.current_node());
        assert_eq!(state.sampled(key), Some(deal));
        for _ in 0..20 {
            assert_eq!(sampler.draw(&mut state).unwrap(), deal);
        }

        let mut child = game.apply(&mut state, deal, 1.0 / 6.0).unwrap();
        let (player, info_set) = child.info_set().unwrap();
        let first = child.sampled(SampleKey::Decision(player, info_set));
        assert!(first.is_some(), "path below the deal was presampled");
        for _ in 0..20 {
            assert_eq!(Some(sampler.draw(&mut child).unwrap()), first);
        }
    }

    #[test]
    fn test_iteration_touches_only_one_regret_row_per_player_node() {
        let game = Game::new(matching_pennies().unwrap(), None, 1e-3).unwrap();
        let mut tables = StrategyTables::new(&game);
        let mut rng = StdRng::seed_from_u64(11);
        let (values, warnings) =
            OpponentSampling::new(&game, &mut tables, &mut rng, 1, 1e-8).iterate().unwrap();

        assert!(warnings.is_empty());
        // Against a sampled pure opponent action, the uniform strategy is
        // worth zero and the two actions are worth +1 and -1.
        assert_eq!(values, [0.0, 0.0]);
        for player in Player::BOTH {
            let table = tables.get(player, 0).unwrap();
            let mut regrets = table.regrets().to_vec();
            regrets.sort_by(|a, b| a.total_cmp(b));
            assert_eq!(regrets, vec![-1.0, 1.0]);
            assert_eq!(table.average_sum(), &[0.5, 0.5]);
        }
    }

    #[test]
    fn test_singleton_regret_stays_zero() {
        let mut builder = TreeBuilder::new();
        let a = builder.leaf(1.0);
        let b = builder.leaf(-1.0);
        let forced = builder.decision(Player::Two, 0, [("only", a)]);
        let root = builder.decision(Player::One, 0, [("go", forced), ("stop", b)]);
        let game = Game::new(builder.build(root).unwrap(), None, 1e-3).unwrap();
        let mut tables = StrategyTables::new(&game);
        let mut rng = StdRng::seed_from_u64(5);

        for iteration in 1..=50 {
            OpponentSampling::new(&game, &mut tables, &mut rng, iteration, 1e-8)
                .iterate()
                .unwrap();
            let forced = tables.get(Player::Two, 0).unwrap();
            assert_eq!(forced.current(), &[1.0]);
            assert_eq!(forced.regrets(), &[0.0]);
        }
    }
}
