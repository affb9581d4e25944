//! Storage for CFR regrets and strategies.
//!
//! Tables are dense: one [`InfoSetTable`] per abstract information set,
//! sized once from the game's abstract layout. Each holds the cumulative
//! regret, the current strategy, the cumulative (unnormalized) average
//! strategy and the owning player's last recorded reach probability.
//!
//! Nature never owns a table; the two players' tables are separate named
//! fields of [`StrategyTables`].

use serde::{Deserialize, Serialize};

use crate::cfr::error::{ConfigurationError, InvalidStateError};
use crate::cfr::game::Game;
use crate::tree::{GameTreeProvider, Player};

/// Regret matching: `out[a] = max(0, r[a]) / Σ max(0, r)`, or uniform if no
/// regret is positive.
///
/// Returns the sum of `out`, which should be 1.
pub fn regret_matching(regrets: &[f64], out: &mut [f64]) -> f64 {
    debug_assert_eq!(regrets.len(), out.len());
    let positive: f64 = regrets.iter().map(|&r| r.max(0.0)).sum();

    if positive > 0.0 {
        for (slot, &r) in out.iter_mut().zip(regrets) {
            *slot = r.max(0.0) / positive;
        }
    } else {
        let uniform = 1.0 / out.len() as f64;
        out.fill(uniform);
    }
    out.iter().sum()
}

/// Regret and strategy accumulators of one abstract information set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoSetTable {
    regret: Vec<f64>,
    current: Vec<f64>,
    average: Vec<f64>,
    reach: f64,
}

impl InfoSetTable {
    /// Zero regret, zero average, uniform current strategy.
    pub fn new(num_actions: usize) -> Self {
        Self {
            regret: vec![0.0; num_actions],
            current: vec![1.0 / num_actions as f64; num_actions],
            average: vec![0.0; num_actions],
            reach: 0.0,
        }
    }

    /// Number of abstract actions.
    pub fn num_actions(&self) -> usize {
        self.regret.len()
    }

    /// Cumulative regret per action.
    pub fn regrets(&self) -> &[f64] {
        &self.regret
    }

    /// Current (regret-matched) strategy.
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// Cumulative, unnormalized average strategy.
    pub fn average_sum(&self) -> &[f64] {
        &self.average
    }

    /// Own reach probability recorded at the last visit.
    pub fn reach(&self) -> f64 {
        self.reach
    }

    /// Normalized average strategy; all zeros if never accumulated.
    pub fn average_strategy(&self) -> Vec<f64> {
        let total: f64 = self.average.iter().sum();
        if total > 0.0 {
            self.average.iter().map(|&x| x / total).collect()
        } else {
            vec![0.0; self.average.len()]
        }
    }

    /// Average strategy, falling back to uniform when never accumulated.
    pub fn average_or_uniform(&self) -> Vec<f64> {
        let total: f64 = self.average.iter().sum();
        if total > 0.0 {
            self.average.iter().map(|&x| x / total).collect()
        } else {
            vec![1.0 / self.average.len() as f64; self.average.len()]
        }
    }

    /// Sum of positive regret.
    pub fn positive_regret(&self) -> f64 {
        self.regret.iter().map(|&r| r.max(0.0)).sum()
    }

    pub(crate) fn add_regret(&mut self, action: usize, delta: f64) {
        self.regret[action] += delta;
    }

    pub(crate) fn set_reach(&mut self, reach: f64) {
        self.reach = reach;
    }

    /// `average += weight * current`.
    pub(crate) fn accumulate_average(&mut self, weight: f64) {
        for (sum, &p) in self.average.iter_mut().zip(&self.current) {
            *sum += weight * p;
        }
    }

    /// Recompute the current strategy from regret. Singletons stay `[1.0]`.
    /// Returns the sum of the new strategy.
    pub(crate) fn regret_match(&mut self) -> f64 {
        if self.current.len() == 1 {
            return self.current[0];
        }
        regret_matching(&self.regret, &mut self.current)
    }
}

/// Tables of one player, indexed by abstract information set.
///
/// `None` marks abstract ids that no original information set maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTables {
    info_sets: Vec<Option<InfoSetTable>>,
}

impl PlayerTables {
    /// Allocate from per-abstract-set action counts.
    pub fn new(layout: &[Option<usize>]) -> Self {
        Self {
            info_sets: layout.iter().map(|n| n.map(InfoSetTable::new)).collect(),
        }
    }

    /// Number of abstract ids, used or not.
    pub fn len(&self) -> usize {
        self.info_sets.len()
    }

    /// Whether there are no abstract ids.
    pub fn is_empty(&self) -> bool {
        self.info_sets.is_empty()
    }

    /// Table of abstract set `info_set`.
    pub fn get(&self, info_set: usize) -> Option<&InfoSetTable> {
        self.info_sets.get(info_set).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, info_set: usize) -> Option<&mut InfoSetTable> {
        self.info_sets.get_mut(info_set).and_then(Option::as_mut)
    }

    /// Allocated tables with their abstract ids.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &InfoSetTable)> {
        self.info_sets
            .iter()
            .enumerate()
            .filter_map(|(id, table)| table.as_ref().map(|t| (id, t)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut InfoSetTable)> {
        self.info_sets
            .iter_mut()
            .enumerate()
            .filter_map(|(id, table)| table.as_mut().map(|t| (id, t)))
    }

    fn shape(&self) -> Vec<Option<usize>> {
        self.info_sets
            .iter()
            .map(|t| t.as_ref().map(InfoSetTable::num_actions))
            .collect()
    }
}

/// Regret, current strategy and average strategy tables of both players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTables {
    one: PlayerTables,
    two: PlayerTables,
}

impl StrategyTables {
    /// Zero-filled tables sized from `game`'s abstract layout.
    pub fn new<T: GameTreeProvider>(game: &Game<T>) -> Self {
        Self {
            one: PlayerTables::new(game.layout(Player::One)),
            two: PlayerTables::new(game.layout(Player::Two)),
        }
    }

    /// Tables of one player.
    pub fn player(&self, player: Player) -> &PlayerTables {
        match player {
            Player::One => &self.one,
            Player::Two => &self.two,
        }
    }

    pub(crate) fn player_mut(&mut self, player: Player) -> &mut PlayerTables {
        match player {
            Player::One => &mut self.one,
            Player::Two => &mut self.two,
        }
    }

    /// Table of `player`'s abstract set `info_set`, if allocated.
    pub fn get(&self, player: Player, info_set: usize) -> Option<&InfoSetTable> {
        self.player(player).get(info_set)
    }

    /// Table of `player`'s abstract set `info_set`.
    pub fn table(
        &self,
        player: Player,
        info_set: usize,
    ) -> Result<&InfoSetTable, InvalidStateError> {
        self.get(player, info_set)
            .ok_or(InvalidStateError::MissingTable { player, info_set })
    }

    pub(crate) fn table_mut(
        &mut self,
        player: Player,
        info_set: usize,
    ) -> Result<&mut InfoSetTable, InvalidStateError> {
        self.player_mut(player)
            .get_mut(info_set)
            .ok_or(InvalidStateError::MissingTable { player, info_set })
    }

    /// Normalized average strategy of every abstract set of `player`.
    ///
    /// Never-visited sets are all zeros; unused abstract ids are empty.
    pub fn average_strategy(&self, player: Player) -> Vec<Vec<f64>> {
        self.player(player)
            .info_sets
            .iter()
            .map(|t| t.as_ref().map(InfoSetTable::average_strategy).unwrap_or_default())
            .collect()
    }

    /// Number of allocated tables across both players.
    pub fn num_info_sets(&self) -> usize {
        self.one.iter().count() + self.two.iter().count()
    }

    /// Sum of positive regret across all tables.
    pub fn total_positive_regret(&self) -> f64 {
        Player::BOTH
            .iter()
            .flat_map(|&p| self.player(p).iter())
            .map(|(_, t)| t.positive_regret())
            .sum()
    }

    /// Approximate heap size of the tables in bytes.
    pub fn memory_usage(&self) -> usize {
        Player::BOTH
            .iter()
            .flat_map(|&p| self.player(p).iter())
            .map(|(_, t)| 3 * t.num_actions() * std::mem::size_of::<f64>())
            .sum()
    }

    /// Fail unless `other` has the same per-set action counts.
    pub(crate) fn check_shape(&self, other: &StrategyTables) -> Result<(), ConfigurationError> {
        for player in Player::BOTH {
            if self.player(player).shape() != other.player(player).shape() {
                return Err(ConfigurationError::CheckpointMismatch(format!(
                    "{} table layout differs",
                    player
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::kuhn::kuhn_poker;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_regret_matching_positive_part() {
        let mut out = [0.0; 3];
        let sum = regret_matching(&[3.0, -2.0, 1.0], &mut out);
        assert_abs_diff_eq!(out[0], 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_regret_matching_uniform_fallback() {
        let mut out = [0.0; 4];
        regret_matching(&[-1.0, 0.0, -3.0, 0.0], &mut out);
        assert!(out.iter().all(|&p| (p - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_new_table_is_uniform_and_zero() {
        let table = InfoSetTable::new(4);
        assert_eq!(table.current(), &[0.25; 4]);
        assert_eq!(table.regrets(), &[0.0; 4]);
        assert_eq!(table.average_strategy(), vec![0.0; 4]);
        assert_eq!(table.average_or_uniform(), vec![0.25; 4]);
    }

    #[test]
    fn test_accumulate_then_match() {
        let mut table = InfoSetTable::new(2);
        table.add_regret(0, 2.0);
        table.add_regret(1, -1.0);
        table.accumulate_average(0.5);
        let sum = table.regret_match();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        assert_eq!(table.current(), &[1.0, 0.0]);
        assert_eq!(table.average_sum(), &[0.25, 0.25]);
        assert_eq!(table.average_strategy(), vec![0.5, 0.5]);
        assert_abs_diff_eq!(table.positive_regret(), 2.0);
    }

    #[test]
    fn test_singleton_stays_pure() {
        let mut table = InfoSetTable::new(1);
        table.add_regret(0, 0.0);
        assert_eq!(table.regret_match(), 1.0);
        assert_eq!(table.current(), &[1.0]);
    }

    #[test]
    fn test_player_tables_skip_unused_ids() {
        let tables = PlayerTables::new(&[Some(2), None, Some(3)]);
        assert_eq!(tables.len(), 3);
        assert!(tables.get(1).is_none());
        let ids: Vec<usize> = tables.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_totals_over_both_players() {
        let game = Game::new(kuhn_poker().unwrap(), None, 1e-3).unwrap();
        let mut tables = StrategyTables::new(&game);
        assert_eq!(tables.num_info_sets(), 12);
        // 12 two-action sets, three f64 accumulators each
        assert_eq!(tables.memory_usage(), 12 * 3 * 2 * 8);
        assert_eq!(tables.total_positive_regret(), 0.0);

        tables.table_mut(Player::One, 2).unwrap().add_regret(1, 1.5);
        tables.table_mut(Player::Two, 4).unwrap().add_regret(0, -3.0);
        tables.table_mut(Player::Two, 5).unwrap().add_regret(1, 0.25);
        assert_abs_diff_eq!(tables.total_positive_regret(), 1.75, epsilon = 1e-12);
    }
}
