//! Counterfactual Regret Minimization solver handle.
//!
//! [`CFRSolver`] owns a validated [`Game`], the strategy tables sized from it,
//! and the random generator the sampling engine draws from. It runs
//! iterations of the engine selected by [`CFRConfig::variant`] and exposes
//! the resulting strategies, game value and exploitability.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::cfr::abstraction::Abstraction;
use crate::cfr::config::{CFRConfig, CFRStats, Variant};
use crate::cfr::error::{InvalidStateError, NumericDriftWarning, SolverResult};
use crate::cfr::evaluate;
use crate::cfr::game::Game;
use crate::cfr::sampling::OpponentSampling;
use crate::cfr::storage::{InfoSetTable, StrategyTables};
use crate::cfr::vanilla::VanillaCfr;
use crate::tree::{GameTreeProvider, Player};

/// The main CFR solver.
///
/// # Type Parameters
/// - `T`: the tree provider the game is read from
///
/// # Example
/// ```
/// use tree_cfr::cfr::{CFRConfig, CFRSolver};
/// use tree_cfr::games::matching_pennies::matching_pennies;
/// use tree_cfr::tree::Player;
///
/// let tree = matching_pennies().unwrap();
/// let mut solver = CFRSolver::new(tree, None, CFRConfig::vanilla()).unwrap();
/// solver.run_iterations(1_000).unwrap();
///
/// let strategy = solver.average_strategy(Player::One);
/// assert!((strategy[0][0] - 0.5).abs() < 0.05);
/// assert!(solver.value_of_game().unwrap().abs() < 0.05);
/// ```
pub struct CFRSolver<T: GameTreeProvider> {
    /// The game being solved.
    game: Game<T>,

    /// Configuration for the solver.
    config: CFRConfig,

    /// Regret, current and average strategy tables.
    tables: StrategyTables,

    /// Completed iterations.
    iteration: u64,

    /// Statistics tracking.
    stats: CFRStats,

    /// Random number generator for the sampling engine.
    rng: StdRng,
}

impl<T: GameTreeProvider> CFRSolver<T> {
    /// Validate `tree`, `abstraction` and `config` and allocate tables.
    ///
    /// # Errors
    /// [`ConfigurationError`](crate::cfr::ConfigurationError) for a malformed
    /// tree, abstraction or configuration.
    pub fn new(
        tree: T,
        abstraction: Option<Abstraction>,
        config: CFRConfig,
    ) -> SolverResult<Self> {
        config.validate()?;
        let game = Game::new(tree, abstraction, config.probability_tolerance)?;
        let tables = StrategyTables::new(&game);

        log::debug!(
            "solver ready: {} nodes, {}/{} information sets ({}/{} abstract), {:?}",
            game.tree().num_nodes(),
            game.num_info_sets(Player::One),
            game.num_info_sets(Player::Two),
            game.num_abstract_info_sets(Player::One),
            game.num_abstract_info_sets(Player::Two),
            config.variant,
        );

        let stats = CFRStats {
            info_sets: tables.num_info_sets(),
            ..CFRStats::default()
        };
        Ok(Self {
            rng: seeded(&config),
            game,
            config,
            tables,
            iteration: 0,
            stats,
        })
    }

    /// Run a single iteration of the configured engine.
    pub fn run_iteration(&mut self) -> SolverResult<()> {
        self.iteration += 1;
        let tolerance = self.config.strategy_tolerance;

        let warnings = match self.config.variant {
            Variant::Vanilla => {
                VanillaCfr::new(&self.game, &mut self.tables)
                    .iterate(self.iteration, tolerance)?
                    .1
            }
            Variant::OpponentSampling => {
                OpponentSampling::new(
                    &self.game,
                    &mut self.tables,
                    &mut self.rng,
                    self.iteration,
                    tolerance,
                )
                .iterate()?
                .1
            }
        };

        self.stats.drift_warnings.extend(warnings);
        Ok(())
    }

    /// Run `iterations` iterations.
    ///
    /// # Returns
    /// Statistics accumulated over every batch run so far.
    pub fn run_iterations(&mut self, iterations: u64) -> SolverResult<&CFRStats> {
        let start_time = Instant::now();

        for _ in 0..iterations {
            self.run_iteration()?;
        }

        self.finish_batch(start_time.elapsed().as_secs_f64());
        log::info!(
            "{} iterations done ({} total, {:.0} it/s, positive regret {:.4}, {} bytes)",
            iterations,
            self.iteration,
            self.stats.iterations_per_second,
            self.tables.total_positive_regret(),
            self.tables.memory_usage(),
        );
        Ok(&self.stats)
    }

    /// Train with a callback for progress tracking.
    ///
    /// # Arguments
    /// * `iterations` - Number of iterations to run
    /// * `callback_interval` - How often to call the callback
    /// * `callback` - Function called every `callback_interval` iterations
    pub fn train_with_callback<F>(
        &mut self,
        iterations: u64,
        callback_interval: u64,
        mut callback: F,
    ) -> SolverResult<&CFRStats>
    where
        F: FnMut(&CFRStats),
    {
        let interval = callback_interval.max(1);
        let mut start_time = Instant::now();

        for i in 0..iterations {
            self.run_iteration()?;

            if (i + 1) % interval == 0 {
                self.finish_batch(start_time.elapsed().as_secs_f64());
                start_time = Instant::now();
                callback(&self.stats);
            }
        }

        self.finish_batch(start_time.elapsed().as_secs_f64());
        Ok(&self.stats)
    }

    fn finish_batch(&mut self, elapsed: f64) {
        self.stats.iterations = self.iteration;
        self.stats.info_sets = self.tables.num_info_sets();
        self.stats.elapsed_seconds += elapsed;
        self.stats.update_rate();
    }

    /// Normalized average strategy of every abstract information set of
    /// `player`.
    ///
    /// Never-visited sets are all zeros; abstract ids no original set maps to
    /// are empty.
    pub fn average_strategy(&self, player: Player) -> Vec<Vec<f64>> {
        self.tables.average_strategy(player)
    }

    /// Current (regret-matched) strategy of every abstract information set.
    pub fn current_strategy(&self, player: Player) -> Vec<Vec<f64>> {
        self.per_info_set(player, |t| t.current().to_vec())
    }

    /// Cumulative regret of every abstract information set.
    pub fn regrets(&self, player: Player) -> Vec<Vec<f64>> {
        self.per_info_set(player, |t| t.regrets().to_vec())
    }

    fn per_info_set<F>(&self, player: Player, f: F) -> Vec<Vec<f64>>
    where
        F: Fn(&InfoSetTable) -> Vec<f64>,
    {
        let tables = self.tables.player(player);
        (0..tables.len())
            .map(|id| tables.get(id).map(&f).unwrap_or_default())
            .collect()
    }

    /// Average strategy at `player`'s original information set `info_set`,
    /// in that set's own action order. Uniform if never reached.
    pub fn info_set_strategy(&self, player: Player, info_set: usize) -> SolverResult<Vec<f64>> {
        if info_set >= self.game.num_info_sets(player) {
            return Err(InvalidStateError::MissingTable { player, info_set }.into());
        }
        let num_actions = self
            .game
            .layout(player)
            .get(self.game.abstract_info_set(player, info_set))
            .copied()
            .flatten()
            .unwrap_or(0);
        Ok(evaluate::average_policy(
            &self.game,
            &self.tables,
            player,
            info_set,
            num_actions,
        )?)
    }

    /// Player-one value of the game under both average strategies.
    pub fn value_of_game(&self) -> SolverResult<f64> {
        Ok(evaluate::expected_value(&self.game, &self.tables)?)
    }

    /// Exploitability of the average strategy profile.
    pub fn exploitability(&self) -> SolverResult<f64> {
        Ok(evaluate::exploitability(&self.game, &self.tables)?)
    }

    /// Compute exploitability and append it to the stats history.
    pub fn record_exploitability(&mut self) -> SolverResult<f64> {
        let exploitability = self.exploitability()?;
        self.stats
            .record_exploitability(self.iteration, exploitability);
        log::info!(
            "iteration {}: exploitability {:.6}",
            self.iteration,
            exploitability
        );
        Ok(exploitability)
    }

    /// Get the current iteration count.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Get current statistics.
    pub fn stats(&self) -> &CFRStats {
        &self.stats
    }

    /// Drift warnings recorded so far.
    pub fn drift_warnings(&self) -> &[NumericDriftWarning] {
        &self.stats.drift_warnings
    }

    /// Get reference to the strategy tables for analysis.
    pub fn tables(&self) -> &StrategyTables {
        &self.tables
    }

    /// Get reference to the game.
    pub fn game(&self) -> &Game<T> {
        &self.game
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &CFRConfig {
        &self.config
    }

    /// Export solver state for checkpointing.
    pub fn export_state(&self) -> SolverState {
        SolverState {
            iteration: self.iteration,
            tables: self.tables.clone(),
            stats: self.stats.clone(),
        }
    }

    /// Import solver state from checkpoint.
    ///
    /// # Errors
    /// [`CheckpointMismatch`](crate::cfr::ConfigurationError::CheckpointMismatch) if the
    /// checkpoint's tables were sized for a different game.
    pub fn import_state(&mut self, state: SolverState) -> SolverResult<()> {
        self.tables.check_shape(&state.tables)?;
        self.iteration = state.iteration;
        self.tables = state.tables;
        self.stats = state.stats;
        Ok(())
    }

    /// Serialize solver state to JSON.
    pub fn to_json(&self) -> SolverResult<String> {
        Ok(serde_json::to_string(&self.export_state())?)
    }

    /// Restore solver state from JSON produced by [`to_json`](Self::to_json).
    pub fn import_json(&mut self, json: &str) -> SolverResult<()> {
        let state: SolverState = serde_json::from_str(json)?;
        self.import_state(state)
    }

    /// Reset the solver to initial state.
    pub fn reset(&mut self) {
        self.tables = StrategyTables::new(&self.game);
        self.iteration = 0;
        self.stats = CFRStats {
            info_sets: self.tables.num_info_sets(),
            ..CFRStats::default()
        };
        self.rng = seeded(&self.config);
    }
}

fn seeded(config: &CFRConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Serializable solver state for checkpointing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverState {
    /// Completed iterations.
    pub iteration: u64,
    /// Regret and strategy tables.
    pub tables: StrategyTables,
    /// Statistics.
    pub stats: CFRStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::abstraction::PlayerAbstraction;
    use crate::cfr::error::{ConfigurationError, SolverError};
    use crate::games::kuhn::kuhn_poker;
    use crate::games::matching_pennies::{biased_pennies, matching_pennies};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_solver_creation() {
        let solver = CFRSolver::new(kuhn_poker().unwrap(), None, CFRConfig::default()).unwrap();
        assert_eq!(solver.iteration(), 0);
        assert_eq!(solver.stats().info_sets, 12);
        assert!(!solver.game().has_abstraction());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = CFRConfig::default().with_strategy_tolerance(-1.0);
        let err = CFRSolver::new(matching_pennies().unwrap(), None, config).err().unwrap();
        assert!(matches!(
            err,
            SolverError::Configuration(ConfigurationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_run_iterations_updates_stats() {
        let mut solver =
            CFRSolver::new(biased_pennies().unwrap(), None, CFRConfig::vanilla()).unwrap();
        let stats = solver.run_iterations(10).unwrap();
        assert_eq!(stats.iterations, 10);
        assert!(stats.drift_warnings.is_empty());
        assert_eq!(solver.iteration(), 10);
    }

    #[test]
    fn test_drift_warning_reaches_stats() {
        for config in [CFRConfig::vanilla(), CFRConfig::sampling().with_seed(7)] {
            let variant = config.variant;
            let mut solver = CFRSolver::new(matching_pennies().unwrap(), None, config).unwrap();
            solver
                .tables
                .table_mut(Player::One, 0)
                .unwrap()
                .add_regret(0, f64::INFINITY);

            solver.run_iteration().unwrap();

            let warnings = solver.drift_warnings();
            assert_eq!(warnings.len(), 1, "{:?}: {:?}", variant, warnings);
            assert_eq!(warnings[0].player, Player::One);
            assert_eq!(warnings[0].info_set, 0);
            assert_eq!(warnings[0].iteration, 1);
            assert!(warnings[0].sum.is_nan());
            assert_eq!(solver.stats().drift_warnings.len(), 1);
        }
    }

    #[test]
    fn test_strategies_are_distributions() {
        let config = CFRConfig::sampling().with_seed(1);
        let mut solver = CFRSolver::new(kuhn_poker().unwrap(), None, config).unwrap();
        solver.run_iterations(200).unwrap();
        for player in Player::BOTH {
            for strategy in solver.current_strategy(player) {
                assert_abs_diff_eq!(strategy.iter().sum::<f64>(), 1.0, epsilon = 1e-8);
            }
            for strategy in solver.average_strategy(player) {
                let sum: f64 = strategy.iter().sum();
                assert!(sum == 0.0 || (sum - 1.0).abs() < 1e-8, "sum {}", sum);
            }
        }
    }

    #[test]
    fn test_callback_interval() {
        let mut solver =
            CFRSolver::new(matching_pennies().unwrap(), None, CFRConfig::vanilla()).unwrap();
        let mut seen = Vec::new();
        solver
            .train_with_callback(10, 3, |stats| seen.push(stats.iterations))
            .unwrap();
        assert_eq!(seen, vec![3, 6, 9]);
        assert_eq!(solver.stats().iterations, 10);
    }

    #[test]
    fn test_sampling_is_deterministic_given_seed() {
        let run = || {
            let config = CFRConfig::sampling().with_seed(42);
            let mut solver = CFRSolver::new(kuhn_poker().unwrap(), None, config).unwrap();
            solver.run_iterations(300).unwrap();
            solver.regrets(Player::One)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_merged_away_ids_are_empty() {
        let tree = matching_pennies().unwrap();
        let one = PlayerAbstraction::identity(&[2]);
        let two = PlayerAbstraction::new(vec![1], vec![vec![0, 1]]);
        let abstraction = Abstraction::new(one, two);
        let mut solver = CFRSolver::new(tree, Some(abstraction), CFRConfig::vanilla()).unwrap();
        solver.run_iterations(5).unwrap();

        let two = solver.average_strategy(Player::Two);
        assert_eq!(two.len(), 2);
        assert!(two[0].is_empty());
        assert_eq!(two[1].len(), 2);
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let config = CFRConfig::vanilla();
        let mut solver = CFRSolver::new(kuhn_poker().unwrap(), None, config.clone()).unwrap();
        solver.run_iterations(50).unwrap();

        let mut restored = CFRSolver::new(kuhn_poker().unwrap(), None, config.clone()).unwrap();
        restored.import_state(solver.export_state()).unwrap();
        assert_eq!(restored.iteration(), 50);
        assert_eq!(restored.tables(), solver.tables());

        solver.run_iterations(10).unwrap();
        restored.run_iterations(10).unwrap();
        assert_eq!(restored.tables(), solver.tables());

        let mut from_json = CFRSolver::new(kuhn_poker().unwrap(), None, config).unwrap();
        from_json.import_json(&solver.to_json().unwrap()).unwrap();
        assert_eq!(from_json.iteration(), 60);
        for (a, b) in from_json
            .average_strategy(Player::One)
            .iter()
            .flatten()
            .zip(solver.average_strategy(Player::One).iter().flatten())
        {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_checkpoint_shape_mismatch() {
        let kuhn = CFRSolver::new(kuhn_poker().unwrap(), None, CFRConfig::vanilla()).unwrap();
        let mut pennies =
            CFRSolver::new(matching_pennies().unwrap(), None, CFRConfig::vanilla()).unwrap();
        let err = pennies.import_state(kuhn.export_state()).err().unwrap();
        assert!(matches!(
            err,
            SolverError::Configuration(ConfigurationError::CheckpointMismatch(_))
        ));
    }

    #[test]
    fn test_reset() {
        let mut solver =
            CFRSolver::new(biased_pennies().unwrap(), None, CFRConfig::vanilla()).unwrap();
        solver.run_iterations(20).unwrap();
        solver.reset();
        assert_eq!(solver.iteration(), 0);
        assert_eq!(solver.regrets(Player::One), vec![vec![0.0, 0.0]]);
        assert_eq!(solver.current_strategy(Player::Two), vec![vec![0.5, 0.5]]);
    }

    #[test]
    fn test_record_exploitability_history() {
        let mut solver = CFRSolver::new(kuhn_poker().unwrap(), None, CFRConfig::vanilla()).unwrap();
        solver.run_iterations(10).unwrap();
        let first = solver.record_exploitability().unwrap();
        solver.run_iterations(990).unwrap();
        let second = solver.record_exploitability().unwrap();
        assert!(second < first, "{} should drop below {}", second, first);
        assert_eq!(solver.stats().exploitability_history.len(), 2);
        assert_eq!(solver.stats().exploitability, Some(second));
    }
}
