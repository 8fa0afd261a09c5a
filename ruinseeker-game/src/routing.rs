//! Route matching: turns an equipment selection into the best exploration route.
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{EXPLORATION_DEEP_WEIGHT, EXPLORATION_MODERATE_WEIGHT};
use crate::data::{GameCatalog, ItemCategory, Route};

/// Distinct item ids chosen for one exploration attempt. Order is irrelevant
/// for matching; duplicates are dropped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Selection {
    ids: SmallVec<[String; 6]>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an id, returning `false` if it was already selected.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    #[must_use]
    pub fn contains_all(&self, ids: &[String]) -> bool {
        ids.iter().all(|id| self.contains(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut selection = Self::new();
        for id in iter {
            selection.insert(id);
        }
        selection
    }
}

impl From<Vec<String>> for Selection {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<Selection> for Vec<String> {
    fn from(selection: Selection) -> Self {
        selection.ids.into_vec()
    }
}

/// Display-only depth classification of a selection's total weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplorationLevel {
    Surface,
    Moderate,
    Deep,
}

impl ExplorationLevel {
    #[must_use]
    pub fn from_weight(total_weight: f64) -> Self {
        if total_weight >= EXPLORATION_DEEP_WEIGHT {
            Self::Deep
        } else if total_weight >= EXPLORATION_MODERATE_WEIGHT {
            Self::Moderate
        } else {
            Self::Surface
        }
    }
}

impl fmt::Display for ExplorationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface => write!(f, "Surface"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Deep => write!(f, "Deep"),
        }
    }
}

/// First trigger condition a route failed, in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteRejection {
    Disabled,
    InvalidWeight(f64),
    MissingItem(String),
    BelowMinWeight { total: f64, min: f64 },
    AboveMaxWeight { total: f64, max: f64 },
    ExcludedItem(String),
    MissingCategory(ItemCategory),
}

impl fmt::Display for RouteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "route disabled"),
            Self::InvalidWeight(total) => write!(f, "weight {total} is not a number"),
            Self::MissingItem(id) => write!(f, "requires `{id}`"),
            Self::BelowMinWeight { total, min } => {
                write!(f, "weight {total} below minimum {min}")
            }
            Self::AboveMaxWeight { total, max } => {
                write!(f, "weight {total} above maximum {max}")
            }
            Self::ExcludedItem(id) => write!(f, "`{id}` is not allowed"),
            Self::MissingCategory(category) => write!(f, "needs a {category} item"),
        }
    }
}

/// What a selection would do if explored now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationPreview {
    pub total_weight: f64,
    pub exploration_level: ExplorationLevel,
    pub matched_route: Option<Route>,
    pub can_explore: bool,
    pub selected_items: Selection,
}

/// Pure rule evaluator over a shared catalog.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatcher<'a> {
    catalog: &'a GameCatalog,
}

impl<'a> RouteMatcher<'a> {
    #[must_use]
    pub const fn new(catalog: &'a GameCatalog) -> Self {
        Self { catalog }
    }

    /// Item weights plus every satisfied combination bonus. Unknown items
    /// and non-finite weights contribute nothing.
    #[must_use]
    pub fn total_weight(&self, selection: &Selection) -> f64 {
        let base: f64 = selection
            .iter()
            .filter_map(|id| self.catalog.item(id))
            .map(|item| item.exploration_weight)
            .filter(|weight| usable_weight(*weight))
            .sum();
        base + self.combination_bonus(selection)
    }

    /// Bonuses stack across independently satisfied combinations. A
    /// combination with no required items never applies.
    #[must_use]
    pub fn combination_bonus(&self, selection: &Selection) -> f64 {
        self.catalog
            .combinations()
            .iter()
            .filter(|combo| {
                !combo.required_items.is_empty() && selection.contains_all(&combo.required_items)
            })
            .map(|combo| combo.weight_bonus)
            .filter(|bonus| usable_weight(*bonus))
            .sum()
    }

    #[must_use]
    pub fn exploration_level(&self, selection: &Selection) -> ExplorationLevel {
        ExplorationLevel::from_weight(self.total_weight(selection))
    }

    /// Evaluate a single route's trigger conditions.
    ///
    /// # Errors
    ///
    /// Returns the first condition the selection fails.
    pub fn check_route(
        &self,
        route: &Route,
        selection: &Selection,
        total_weight: f64,
    ) -> Result<(), RouteRejection> {
        if !route.enabled {
            return Err(RouteRejection::Disabled);
        }
        if !total_weight.is_finite() {
            return Err(RouteRejection::InvalidWeight(total_weight));
        }
        let conditions = &route.conditions;
        if let Some(missing) = conditions
            .required_items
            .iter()
            .find(|id| !selection.contains(id))
        {
            return Err(RouteRejection::MissingItem(missing.clone()));
        }
        if let Some(min) = conditions.min_weight
            && total_weight < min
        {
            return Err(RouteRejection::BelowMinWeight {
                total: total_weight,
                min,
            });
        }
        if let Some(max) = conditions.max_weight
            && total_weight > max
        {
            return Err(RouteRejection::AboveMaxWeight {
                total: total_weight,
                max,
            });
        }
        if let Some(excluded) = conditions
            .excluded_items
            .iter()
            .find(|id| selection.contains(id))
        {
            return Err(RouteRejection::ExcludedItem(excluded.clone()));
        }
        if !conditions.required_categories.is_empty() {
            let present = self.selected_categories(selection);
            if let Some(category) = conditions
                .required_categories
                .iter()
                .find(|category| !present.contains(*category))
            {
                return Err(RouteRejection::MissingCategory(*category));
            }
        }
        Ok(())
    }

    /// Highest-priority candidate route; equal priorities keep catalog order.
    #[must_use]
    pub fn find_route(&self, selection: &Selection) -> Option<&'a Route> {
        if selection.is_empty() {
            return None;
        }
        let total_weight = self.total_weight(selection);
        let mut best: Option<&'a Route> = None;
        for route in self.catalog.routes() {
            if self.check_route(route, selection, total_weight).is_err() {
                continue;
            }
            if best.is_none_or(|current| route.priority > current.priority) {
                best = Some(route);
            }
        }
        match best {
            Some(route) => log::debug!(
                "route match | weight {total_weight} -> {} (priority {})",
                route.id,
                route.priority
            ),
            None => log::debug!("route match | weight {total_weight} -> none"),
        }
        best
    }

    #[must_use]
    pub fn preview(&self, selection: &Selection) -> ExplorationPreview {
        let total_weight = self.total_weight(selection);
        let matched_route = self.find_route(selection).cloned();
        ExplorationPreview {
            total_weight,
            exploration_level: ExplorationLevel::from_weight(total_weight),
            can_explore: matched_route.is_some(),
            matched_route,
            selected_items: selection.clone(),
        }
    }

    fn selected_categories(&self, selection: &Selection) -> BTreeSet<ItemCategory> {
        selection
            .iter()
            .filter_map(|id| self.catalog.item(id))
            .map(|item| item.category)
            .collect()
    }
}

fn usable_weight(weight: f64) -> bool {
    if weight.is_finite() {
        return true;
    }
    log::warn!("ignoring non-finite weight {weight}");
    false
}
