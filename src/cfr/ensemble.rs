//! Independent solvers run in parallel, one per seed.
//!
//! Each solver owns its tables and generator and only shares the read-only
//! tree, so seeds are solved with `rayon` without any synchronisation.

use rayon::prelude::*;

use crate::cfr::abstraction::Abstraction;
use crate::cfr::config::CFRConfig;
use crate::cfr::error::SolverResult;
use crate::cfr::solver::CFRSolver;
use crate::tree::{GameTreeProvider, Player};

/// Train one solver per seed and return each one's average strategy for
/// `player`, in seed order.
pub fn average_strategies<T>(
    tree: &T,
    abstraction: Option<&Abstraction>,
    config: &CFRConfig,
    seeds: &[u64],
    iterations: u64,
    player: Player,
) -> SolverResult<Vec<Vec<Vec<f64>>>>
where
    T: GameTreeProvider + Sync,
{
    seeds
        .par_iter()
        .map(|&seed| -> SolverResult<Vec<Vec<f64>>> {
            let config = config.clone().with_seed(seed);
            let mut solver = CFRSolver::new(tree, abstraction.cloned(), config)?;
            solver.run_iterations(iterations)?;
            log::debug!("seed {} finished {} iterations", seed, iterations);
            Ok(solver.average_strategy(player))
        })
        .collect()
}

/// Element-wise mean of the per-seed average strategies of `player`.
///
/// With no seeds the result is empty.
pub fn mean_average_strategy<T>(
    tree: &T,
    abstraction: Option<&Abstraction>,
    config: &CFRConfig,
    seeds: &[u64],
    iterations: u64,
    player: Player,
) -> SolverResult<Vec<Vec<f64>>>
where
    T: GameTreeProvider + Sync,
{
    let runs = average_strategies(tree, abstraction, config, seeds, iterations, player)?;
    let Some(first) = runs.first() else {
        return Ok(Vec::new());
    };

    let mut mean: Vec<Vec<f64>> = first.iter().map(|s| vec![0.0; s.len()]).collect();
    for run in &runs {
        for (total, strategy) in mean.iter_mut().zip(run) {
            for (t, &p) in total.iter_mut().zip(strategy) {
                *t += p;
            }
        }
    }
    let n = runs.len() as f64;
    for p in mean.iter_mut().flatten() {
        *p /= n;
    }
    Ok(mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::matching_pennies::biased_pennies;

    #[test]
    fn test_runs_are_independent_per_seed() {
        let tree = biased_pennies().unwrap();
        let config = CFRConfig::sampling();
        let runs =
            average_strategies(&tree, None, &config, &[1, 2, 1], 500, Player::One).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], runs[2], "same seed, same result");
    }

    #[test]
    fn test_mean_of_no_seeds_is_empty() {
        let tree = biased_pennies().unwrap();
        let mean =
            mean_average_strategy(&tree, None, &CFRConfig::sampling(), &[], 10, Player::Two)
                .unwrap();
        assert!(mean.is_empty());
    }

    #[test]
    fn test_mean_is_a_distribution() {
        let tree = biased_pennies().unwrap();
        let seeds: Vec<u64> = (0..8).collect();
        let mean =
            mean_average_strategy(&tree, None, &CFRConfig::sampling(), &seeds, 200, Player::Two)
                .unwrap();
        assert_eq!(mean.len(), 1);
        assert!((mean[0].iter().sum::<f64>() - 1.0).abs() < 1e-8);
    }
}
