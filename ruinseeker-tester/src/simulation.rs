//! Seeded Monte-Carlo sweeps over a catalog.
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use ruinseeker_game::{
    Difficulty, DiscoveryPool, DiscoveryResolver, ExplorationEngine, ExplorationResult,
    GameCatalog, PlayerProgress, Selection, derive_stream_seed,
};
use serde::Serialize;

const LOADOUT_STREAM_TAG: &[u8] = b"ruinseeker.tester.loadout";

/// Per-ruin tally for one route.
#[derive(Debug, Clone, Serialize)]
pub struct RuinFrequency {
    pub ruin_id: String,
    pub hidden: bool,
    pub required_difficulty: Difficulty,
    pub weight: f64,
    pub count: usize,
    pub share: f64,
}

/// Discovery distribution for one enabled route over every seed.
#[derive(Debug, Clone, Serialize)]
pub struct RouteDistribution {
    pub route_id: String,
    pub difficulty: Difficulty,
    pub rolls: usize,
    pub hidden_rolls: usize,
    pub empty_rolls: usize,
    pub faults: usize,
    pub ruins: Vec<RuinFrequency>,
}

/// Roll `iterations` discoveries per seed on every enabled route.
pub fn discovery_distribution(
    catalog: &GameCatalog,
    seeds: &[u64],
    iterations: usize,
) -> Vec<RouteDistribution> {
    let resolver = DiscoveryResolver::from_catalog(catalog);
    let mut reports = Vec::new();
    for route in catalog.routes().iter().filter(|route| route.enabled) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let (mut hidden_rolls, mut empty_rolls, mut faults) = (0, 0, 0);
        for seed in seeds {
            let mut rng =
                SmallRng::seed_from_u64(derive_stream_seed(*seed, route.id.as_bytes()));
            for _ in 0..iterations {
                match resolver.resolve_with_trace(route, &mut rng) {
                    Ok(Some((ruin, trace))) => {
                        *counts.entry(ruin.id.clone()).or_default() += 1;
                        if trace.pool == DiscoveryPool::Hidden {
                            hidden_rolls += 1;
                        }
                    }
                    Ok(None) => empty_rolls += 1,
                    Err(err) => {
                        log::error!("route {}: {err}", route.id);
                        faults += 1;
                    }
                }
            }
        }
        let rolls = seeds.len() * iterations;
        let ruins = resolver
            .accessible(route)
            .into_iter()
            .map(|ruin| {
                let count = counts.get(&ruin.id).copied().unwrap_or(0);
                RuinFrequency {
                    ruin_id: ruin.id.clone(),
                    hidden: ruin.hidden,
                    required_difficulty: ruin.required_difficulty,
                    weight: ruin.discover_probability,
                    count,
                    share: crate::util::percent(count, rolls) / 100.0,
                }
            })
            .collect();
        reports.push(RouteDistribution {
            route_id: route.id.clone(),
            difficulty: route.difficulty,
            rolls,
            hidden_rolls,
            empty_rolls,
            faults,
            ruins,
        });
    }
    reports
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub no_route: usize,
    pub no_discovery: usize,
    pub internal_error: usize,
}

impl OutcomeCounts {
    fn record(&mut self, result: &ExplorationResult) {
        match result {
            ExplorationResult::Success { .. } => self.success += 1,
            ExplorationResult::NoRoute { .. } => self.no_route += 1,
            ExplorationResult::NoDiscovery { .. } => self.no_discovery += 1,
            ExplorationResult::InternalError { .. } => self.internal_error += 1,
        }
    }
}

/// One seeded player exploring with random unlocked loadouts.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressionRun {
    pub seed: u64,
    pub attempts: usize,
    pub final_level: u32,
    pub final_experience: u32,
    pub discoveries: usize,
    /// Level to the attempt number on which it was reached.
    pub level_reached_at: BTreeMap<u32, usize>,
    pub outcomes: OutcomeCounts,
}

/// Explore from a fresh start until the top level or `max_attempts`.
///
/// Each attempt equips a random subset of the unlocked items, as many as the
/// current level has slots for.
pub fn progression_run(
    catalog: &Arc<GameCatalog>,
    seed: u64,
    max_attempts: usize,
) -> ProgressionRun {
    let levels = catalog.levels();
    let top_level = levels.levels.iter().map(|def| def.level).max().unwrap_or(1);
    let mut engine = ExplorationEngine::seeded(Arc::clone(catalog), seed);
    let mut loadout_rng = SmallRng::seed_from_u64(derive_stream_seed(seed, LOADOUT_STREAM_TAG));
    let start = DateTime::<Utc>::default();

    let mut progress = PlayerProgress::default();
    let mut outcomes = OutcomeCounts::default();
    let mut level_reached_at = BTreeMap::from([(progress.level, 0)]);
    let mut attempts = 0;
    while attempts < max_attempts && progress.level < top_level {
        attempts += 1;
        let unlocked: Vec<String> = levels.unlocked_items(progress.level).into_iter().collect();
        let slots = usize::try_from(levels.max_item_slots(progress.level)).unwrap_or(usize::MAX);
        let selection: Selection = unlocked
            .choose_multiple(&mut loadout_rng, slots.min(unlocked.len()))
            .cloned()
            .collect();
        let at = start + Duration::minutes(i64::try_from(attempts).unwrap_or(i64::MAX));
        let result = engine.execute_at(&selection, at);
        outcomes.record(&result);
        if let Some(update) = progress.apply_outcome(&result, levels) {
            for summary in &update.level_ups {
                level_reached_at.insert(summary.level, attempts);
            }
            progress = update.progress;
        }
    }

    ProgressionRun {
        seed,
        attempts,
        final_level: progress.level,
        final_experience: progress.experience,
        discoveries: progress.discovery_count(),
        level_reached_at,
        outcomes,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub catalog_fingerprint: String,
    pub seeds: Vec<u64>,
    pub iterations: usize,
    pub max_attempts: usize,
    pub distribution: Vec<RouteDistribution>,
    pub progression: Vec<ProgressionRun>,
}

pub fn run_simulation(
    catalog: &Arc<GameCatalog>,
    seeds: &[u64],
    iterations: usize,
    max_attempts: usize,
) -> SimulationSummary {
    let distribution = discovery_distribution(catalog, seeds, iterations);
    let progression = seeds
        .iter()
        .map(|seed| progression_run(catalog, *seed, max_attempts))
        .collect();
    SimulationSummary {
        catalog_fingerprint: format!("{:016x}", catalog.fingerprint()),
        seeds: seeds.to_vec(),
        iterations,
        max_attempts,
        distribution,
        progression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Arc<GameCatalog> {
        Arc::new(GameCatalog::load_default().unwrap())
    }

    #[test]
    fn distribution_counts_every_roll() {
        let catalog = catalog();
        let reports = discovery_distribution(&catalog, &[1, 2], 200);
        assert_eq!(
            reports.len(),
            catalog.routes().iter().filter(|route| route.enabled).count()
        );
        for report in &reports {
            let found: usize = report.ruins.iter().map(|ruin| ruin.count).sum();
            assert_eq!(found + report.empty_rolls + report.faults, report.rolls);
            assert_eq!(report.faults, 0);
            assert!(
                report
                    .ruins
                    .iter()
                    .all(|ruin| report.difficulty.admits(ruin.required_difficulty))
            );
        }
    }

    #[test]
    fn progression_is_deterministic_and_monotonic() {
        let catalog = catalog();
        let first = progression_run(&catalog, 1337, 300);
        let second = progression_run(&catalog, 1337, 300);
        assert_eq!(first.final_experience, second.final_experience);
        assert_eq!(first.level_reached_at, second.level_reached_at);
        assert!(first.final_level > 1);
        let reached: Vec<usize> = first.level_reached_at.values().copied().collect();
        assert!(reached.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(
            first.outcomes.success
                + first.outcomes.no_route
                + first.outcomes.no_discovery
                + first.outcomes.internal_error,
            first.attempts
        );
    }
}
