//! Exploration attempts: route matching followed by a discovery roll.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{GameCatalog, Route, Ruin};
use crate::discovery::{DiscoveryError, DiscoveryResolver, DiscoveryTrace};
use crate::routing::{ExplorationPreview, RouteMatcher, Selection};
use crate::seed::discovery_rng;

const MSG_NO_ROUTE: &str = "No suitable exploration route found with current equipment";
const MSG_NO_DISCOVERY: &str = "No discoveries available for this route";
const MSG_INTERNAL: &str = "An error occurred during exploration";

/// Snapshot of what was carried, kept for history and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationRecord {
    pub selection: Selection,
    pub total_weight: f64,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one attempt. Only `InternalError` signals a bug or bad data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExplorationResult {
    Success {
        route: Route,
        ruin: Ruin,
        record: ExplorationRecord,
        trace: DiscoveryTrace,
    },
    NoRoute {
        total_weight: f64,
    },
    NoDiscovery {
        route: Route,
    },
    InternalError {
        route: Option<Route>,
        error: String,
    },
}

impl ExplorationResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Stable machine-readable code for API callers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::NoRoute { .. } => "route_not_found",
            Self::NoDiscovery { .. } => "no_discovery",
            Self::InternalError { .. } => "internal_error",
        }
    }

    /// Player-facing explanation of a failed attempt.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::Success { .. } => None,
            Self::NoRoute { .. } => Some(MSG_NO_ROUTE),
            Self::NoDiscovery { .. } => Some(MSG_NO_DISCOVERY),
            Self::InternalError { .. } => Some(MSG_INTERNAL),
        }
    }

    #[must_use]
    pub const fn route(&self) -> Option<&Route> {
        match self {
            Self::Success { route, .. } | Self::NoDiscovery { route } => Some(route),
            Self::InternalError { route, .. } => route.as_ref(),
            Self::NoRoute { .. } => None,
        }
    }

    #[must_use]
    pub const fn ruin(&self) -> Option<&Ruin> {
        match self {
            Self::Success { ruin, .. } => Some(ruin),
            _ => None,
        }
    }
}

/// Catalog inconsistencies discovered while executing an attempt.
#[derive(Debug, Error)]
pub enum ExplorationError {
    #[error("route `{route_id}` targets unknown site `{site_id}`")]
    UnknownSite { route_id: String, site_id: String },
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Runs exploration attempts against a shared catalog with an injected RNG.
#[derive(Debug, Clone)]
pub struct ExplorationEngine<R> {
    catalog: Arc<GameCatalog>,
    rng: R,
}

impl ExplorationEngine<SmallRng> {
    /// Engine whose discovery stream is derived from `user_seed`.
    #[must_use]
    pub fn seeded(catalog: Arc<GameCatalog>, user_seed: u64) -> Self {
        Self::new(catalog, discovery_rng(user_seed))
    }
}

impl<R: Rng> ExplorationEngine<R> {
    #[must_use]
    pub const fn new(catalog: Arc<GameCatalog>, rng: R) -> Self {
        Self { catalog, rng }
    }

    #[must_use]
    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn shared_catalog(&self) -> Arc<GameCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    #[must_use]
    pub fn matcher(&self) -> RouteMatcher<'_> {
        RouteMatcher::new(&self.catalog)
    }

    #[must_use]
    pub fn preview(&self, selection: &Selection) -> ExplorationPreview {
        self.matcher().preview(selection)
    }

    /// Run one attempt stamped with the current time.
    pub fn execute(&mut self, selection: &Selection) -> ExplorationResult {
        self.execute_at(selection, Utc::now())
    }

    /// Run one attempt stamped with `timestamp`.
    pub fn execute_at(
        &mut self,
        selection: &Selection,
        timestamp: DateTime<Utc>,
    ) -> ExplorationResult {
        let catalog: &GameCatalog = &self.catalog;
        let rng = &mut self.rng;
        let matcher = RouteMatcher::new(catalog);
        let total_weight = matcher.total_weight(selection);
        let Some(route) = matcher.find_route(selection) else {
            return ExplorationResult::NoRoute { total_weight };
        };

        match resolve_on_route(catalog, route, selection, rng) {
            Ok(Some((ruin, trace))) => ExplorationResult::Success {
                route: route.clone(),
                ruin: ruin.clone(),
                record: ExplorationRecord {
                    selection: selection.clone(),
                    total_weight,
                    timestamp,
                },
                trace,
            },
            Ok(None) => ExplorationResult::NoDiscovery {
                route: route.clone(),
            },
            Err(err) => {
                log::error!("exploration on route {} failed: {err}", route.id);
                ExplorationResult::InternalError {
                    route: Some(route.clone()),
                    error: err.to_string(),
                }
            }
        }
    }
}

fn resolve_on_route<'a, R: Rng>(
    catalog: &'a GameCatalog,
    route: &Route,
    selection: &Selection,
    rng: &mut R,
) -> Result<Option<(&'a Ruin, DiscoveryTrace)>, ExplorationError> {
    if !catalog.sites().is_empty() && catalog.site(&route.target_site_id).is_none() {
        return Err(ExplorationError::UnknownSite {
            route_id: route.id.clone(),
            site_id: route.target_site_id.clone(),
        });
    }
    let resolved =
        DiscoveryResolver::from_catalog(catalog).resolve_for_selection(route, selection, rng)?;
    Ok(resolved)
}
