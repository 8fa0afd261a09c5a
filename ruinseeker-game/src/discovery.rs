//! Discovery resolution: tier roll followed by a weighted pick.
use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{HIDDEN_CHANCE_ADVANCED, HIDDEN_CHANCE_BEGINNER, HIDDEN_CHANCE_MASTER};
use crate::data::{ConfigError, Difficulty, GameCatalog, Route, Ruin};
use crate::routing::Selection;

/// Hidden-roll tuning per route difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "DiscoveryConfig::default_beginner")]
    pub beginner_hidden_chance: f64,
    #[serde(default = "DiscoveryConfig::default_advanced")]
    pub advanced_hidden_chance: f64,
    #[serde(default = "DiscoveryConfig::default_master")]
    pub master_hidden_chance: f64,
    /// Only consider ruins belonging to the route's target site.
    #[serde(default)]
    pub match_route_site: bool,
    /// Extra hidden chance while an item is selected. Bonuses stack on the
    /// route's tier chance; the sum is capped at 1.
    #[serde(default)]
    pub item_hidden_bonus: BTreeMap<String, f64>,
}

impl DiscoveryConfig {
    const fn default_beginner() -> f64 {
        HIDDEN_CHANCE_BEGINNER
    }

    const fn default_advanced() -> f64 {
        HIDDEN_CHANCE_ADVANCED
    }

    const fn default_master() -> f64 {
        HIDDEN_CHANCE_MASTER
    }

    #[must_use]
    pub const fn hidden_chance(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Beginner => self.beginner_hidden_chance,
            Difficulty::Advanced => self.advanced_hidden_chance,
            Difficulty::Master => self.master_hidden_chance,
        }
    }

    /// Tier chance plus the bonus of every selected item.
    #[must_use]
    pub fn hidden_chance_for(&self, difficulty: Difficulty, selection: &Selection) -> f64 {
        let bonus: f64 = selection
            .iter()
            .filter_map(|id| self.item_hidden_bonus.get(id))
            .sum();
        let chance = self.hidden_chance(difficulty) + bonus;
        if chance > 1.0 { 1.0 } else { chance }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("discovery.beginner_hidden_chance", self.beginner_hidden_chance),
            ("discovery.advanced_hidden_chance", self.advanced_hidden_chance),
            ("discovery.master_hidden_chance", self.master_hidden_chance),
        ] {
            if !is_probability(value) {
                return Err(ConfigError::Probability { field, value });
            }
        }
        for (item_id, value) in &self.item_hidden_bonus {
            if !is_probability(*value) {
                return Err(ConfigError::ItemHiddenBonus {
                    item_id: item_id.clone(),
                    value: *value,
                });
            }
        }
        Ok(())
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            beginner_hidden_chance: Self::default_beginner(),
            advanced_hidden_chance: Self::default_advanced(),
            master_hidden_chance: Self::default_master(),
            match_route_site: false,
            item_hidden_bonus: BTreeMap::new(),
        }
    }
}

fn is_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Faults that mean the catalog or config is broken, not that nothing was found.
#[derive(Debug, Error, PartialEq)]
pub enum DiscoveryError {
    #[error("ruin `{ruin_id}` has invalid discovery weight {weight}")]
    InvalidWeight { ruin_id: String, weight: f64 },
    #[error("hidden chance for {difficulty} routes is not a probability ({value})")]
    InvalidHiddenChance { difficulty: Difficulty, value: f64 },
    #[error("{pool} pool weights sum to a non-finite total")]
    NonFiniteTotal { pool: DiscoveryPool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryPool {
    Normal,
    Hidden,
}

impl std::fmt::Display for DiscoveryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Hidden => write!(f, "hidden"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCandidate {
    pub id: String,
    pub weight: f64,
}

/// Audit record of the two draws behind a discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryTrace {
    pub route_id: String,
    pub pool: DiscoveryPool,
    pub hidden_chance: f64,
    pub hidden_roll: f64,
    pub pick_roll: f64,
    pub candidates: Vec<WeightedCandidate>,
    pub chosen_id: String,
}

/// Two-stage ruin sampler over a shared ruin catalog.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryResolver<'a> {
    ruins: &'a [Ruin],
    config: &'a DiscoveryConfig,
}

impl<'a> DiscoveryResolver<'a> {
    #[must_use]
    pub const fn new(ruins: &'a [Ruin], config: &'a DiscoveryConfig) -> Self {
        Self { ruins, config }
    }

    #[must_use]
    pub fn from_catalog(catalog: &'a GameCatalog) -> Self {
        Self::new(catalog.ruins(), catalog.discovery())
    }

    /// Ruins a route of this difficulty may yield, in catalog order.
    #[must_use]
    pub fn accessible(&self, route: &Route) -> Vec<&'a Ruin> {
        self.ruins
            .iter()
            .filter(|ruin| route.difficulty.admits(ruin.required_difficulty))
            .filter(|ruin| !self.config.match_route_site || ruin.site_id == route.target_site_id)
            .collect()
    }

    /// Roll a discovery for `route`.
    ///
    /// # Errors
    ///
    /// Returns an error when a ruin weight or the hidden chance is invalid.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        route: &Route,
        rng: &mut R,
    ) -> Result<Option<&'a Ruin>, DiscoveryError> {
        self.resolve_with_trace(route, rng)
            .map(|resolved| resolved.map(|(ruin, _)| ruin))
    }

    /// Roll a discovery and keep the draws that produced it.
    ///
    /// Zero-weight ruins are never drawn; a pool holding only such ruins
    /// counts as empty.
    ///
    /// # Errors
    ///
    /// Returns an error when a ruin weight or the hidden chance is invalid.
    pub fn resolve_with_trace<R: Rng + ?Sized>(
        &self,
        route: &Route,
        rng: &mut R,
    ) -> Result<Option<(&'a Ruin, DiscoveryTrace)>, DiscoveryError> {
        let hidden_chance = self.config.hidden_chance(route.difficulty);
        self.roll(route, hidden_chance, rng)
    }

    /// [`Self::resolve_with_trace`] with the hidden-chance bonuses of the
    /// items in `selection` applied.
    ///
    /// # Errors
    ///
    /// Returns an error when a ruin weight or the hidden chance is invalid.
    pub fn resolve_for_selection<R: Rng + ?Sized>(
        &self,
        route: &Route,
        selection: &Selection,
        rng: &mut R,
    ) -> Result<Option<(&'a Ruin, DiscoveryTrace)>, DiscoveryError> {
        let hidden_chance = self.config.hidden_chance_for(route.difficulty, selection);
        self.roll(route, hidden_chance, rng)
    }

    fn roll<R: Rng + ?Sized>(
        &self,
        route: &Route,
        hidden_chance: f64,
        rng: &mut R,
    ) -> Result<Option<(&'a Ruin, DiscoveryTrace)>, DiscoveryError> {
        let accessible = self.accessible(route);
        for ruin in &accessible {
            let weight = ruin.discover_probability;
            if !weight.is_finite() || weight < 0.0 {
                return Err(DiscoveryError::InvalidWeight {
                    ruin_id: ruin.id.clone(),
                    weight,
                });
            }
        }
        let (hidden, normal): (Vec<&'a Ruin>, Vec<&'a Ruin>) = accessible
            .into_iter()
            .filter(|ruin| ruin.discover_probability > 0.0)
            .partition(|ruin| ruin.hidden);

        if !is_probability(hidden_chance) {
            return Err(DiscoveryError::InvalidHiddenChance {
                difficulty: route.difficulty,
                value: hidden_chance,
            });
        }

        let hidden_roll: f64 = rng.r#gen();
        let mut pool = if hidden_roll < hidden_chance && !hidden.is_empty() {
            DiscoveryPool::Hidden
        } else {
            DiscoveryPool::Normal
        };
        if pool == DiscoveryPool::Normal && normal.is_empty() {
            pool = DiscoveryPool::Hidden;
        }
        let candidates = match pool {
            DiscoveryPool::Normal => normal,
            DiscoveryPool::Hidden => hidden,
        };
        if candidates.is_empty() {
            log::debug!("discovery | route {} has nothing to find", route.id);
            return Ok(None);
        }

        let Some((chosen, pick_roll)) = choose_weighted(&candidates, pool, rng)? else {
            return Ok(None);
        };
        log::debug!(
            "discovery | route {} {pool} roll {hidden_roll:.3}/{hidden_chance:.2} -> {}",
            route.id,
            chosen.id
        );
        let trace = DiscoveryTrace {
            route_id: route.id.clone(),
            pool,
            hidden_chance,
            hidden_roll,
            pick_roll,
            candidates: candidates
                .iter()
                .map(|ruin| WeightedCandidate {
                    id: ruin.id.clone(),
                    weight: ruin.discover_probability,
                })
                .collect(),
            chosen_id: chosen.id.clone(),
        };
        Ok(Some((chosen, trace)))
    }
}

/// Draw in `[0, total)` and walk the pool in order, subtracting weights until
/// the remainder reaches zero. The last candidate absorbs floating-point drift.
fn choose_weighted<'a, R: Rng + ?Sized>(
    candidates: &[&'a Ruin],
    pool: DiscoveryPool,
    rng: &mut R,
) -> Result<Option<(&'a Ruin, f64)>, DiscoveryError> {
    let total: f64 = candidates.iter().map(|ruin| ruin.discover_probability).sum();
    if !total.is_finite() {
        return Err(DiscoveryError::NonFiniteTotal { pool });
    }
    if total <= 0.0 {
        return Ok(None);
    }
    let roll = rng.gen_range(0.0..total);
    let mut remainder = roll;
    for ruin in candidates {
        remainder -= ruin.discover_probability;
        if remainder <= 0.0 {
            return Ok(Some((*ruin, roll)));
        }
    }
    Ok(candidates.last().map(|ruin| (*ruin, roll)))
}
