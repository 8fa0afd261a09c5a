//! Catalog data: items, combinations, sites, routes and ruins.
//!
//! Catalogs are parsed once, indexed by id, and shared read-only by every
//! exploration component.
use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use twox_hash::XxHash64;

use crate::constants::DEFAULT_DISCOVER_PROBABILITY;
use crate::discovery::DiscoveryConfig;
use crate::levels::LevelTable;

const DEFAULT_ITEMS_JSON: &str = include_str!("../assets/data/items.json");
const DEFAULT_SITES_JSON: &str = include_str!("../assets/data/sites.json");
const DEFAULT_ROUTES_JSON: &str = include_str!("../assets/data/routes.json");
const DEFAULT_RUINS_JSON: &str = include_str!("../assets/data/ruins.json");
const DEFAULT_LEVELS_JSON: &str = include_str!("../assets/data/levels.json");

/// Tool family an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    CleaningTools,
    DiggingTools,
    DetectionTools,
    RecordingTools,
    UtilityTools,
    NavigationTools,
}

impl ItemCategory {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::CleaningTools => "cleaning_tools",
            Self::DiggingTools => "digging_tools",
            Self::DetectionTools => "detection_tools",
            Self::RecordingTools => "recording_tools",
            Self::UtilityTools => "utility_tools",
            Self::NavigationTools => "navigation_tools",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Legendary,
}

/// Ordered difficulty tier shared by routes and ruins.
///
/// Declaration order is the tier order: beginner < advanced < master.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Advanced,
    Master,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Beginner, Self::Advanced, Self::Master];

    /// Numeric tier value used for eligibility comparisons.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Beginner => 1,
            Self::Advanced => 2,
            Self::Master => 3,
        }
    }

    /// Whether content requiring `required` may be found on a route of this tier.
    #[must_use]
    pub const fn admits(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Advanced => "advanced",
            Self::Master => "master",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An equippable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub exploration_weight: f64,
    #[serde(default)]
    pub rarity: Rarity,
}

/// Weight bonus granted when every listed item is selected together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCombination {
    #[serde(default)]
    pub id: String,
    pub required_items: Vec<String>,
    #[serde(default)]
    pub weight_bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Conditions a selection must satisfy for a route to be a candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerConditions {
    #[serde(default)]
    pub required_items: Vec<String>,
    #[serde(default)]
    pub excluded_items: Vec<String>,
    #[serde(default)]
    pub min_weight: Option<f64>,
    #[serde(default)]
    pub max_weight: Option<f64>,
    #[serde(default)]
    pub required_categories: Vec<ItemCategory>,
}

/// An exploration path leading to a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub target_site_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub conditions: TriggerConditions,
}

/// A discoverable ruin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruin {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub site_id: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub required_difficulty: Difficulty,
    #[serde(default = "default_discover_probability")]
    pub discover_probability: f64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_discover_probability() -> f64 {
    DEFAULT_DISCOVER_PROBABILITY
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ItemsFile {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    combinations: Vec<ItemCombination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SitesFile {
    #[serde(default)]
    sites: Vec<Site>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RoutesFile {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RuinsFile {
    #[serde(default)]
    discovery: DiscoveryConfig,
    #[serde(default)]
    ruins: Vec<Ruin>,
}

/// Raw JSON documents making up a catalog, one per file.
#[derive(Debug, Clone, Copy)]
pub struct CatalogSources<'a> {
    pub items: &'a str,
    pub sites: &'a str,
    pub routes: &'a str,
    pub ruins: &'a str,
    pub levels: &'a str,
}

impl CatalogSources<'static> {
    /// The catalog bundled with the crate.
    #[must_use]
    pub const fn bundled() -> Self {
        Self {
            items: DEFAULT_ITEMS_JSON,
            sites: DEFAULT_SITES_JSON,
            routes: DEFAULT_ROUTES_JSON,
            ruins: DEFAULT_RUINS_JSON,
            levels: DEFAULT_LEVELS_JSON,
        }
    }
}

/// Fatal catalog problems. Anything recoverable is a [`CatalogIssue`] instead.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse {document} catalog")]
    Parse {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid tuning values in reward or discovery configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a probability between 0 and 1 (got {value})")]
    Probability { field: &'static str, value: f64 },
    #[error("hidden chance bonus for `{item_id}` must be between 0 and 1 (got {value})")]
    ItemHiddenBonus { item_id: String, value: f64 },
}

/// Non-fatal catalog anomaly, reported as a warning at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogIssue {
    EmptyTable {
        table: &'static str,
    },
    UnknownItem {
        context: String,
        item_id: String,
    },
    UnknownSite {
        context: String,
        site_id: String,
    },
    InvalidWeight {
        context: String,
        value: f64,
    },
    RouteWeightBounds {
        route_id: String,
        min: f64,
        max: f64,
    },
    FirstLevelThreshold {
        exp_required: u32,
    },
    LevelThresholdNotIncreasing {
        level: u32,
        exp_required: u32,
        previous: u32,
    },
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTable { table } => write!(f, "no {table} defined"),
            Self::UnknownItem { context, item_id } => {
                write!(f, "{context} references unknown item `{item_id}`")
            }
            Self::UnknownSite { context, site_id } => {
                write!(f, "{context} references unknown site `{site_id}`")
            }
            Self::InvalidWeight { context, value } => {
                write!(f, "{context} has invalid weight {value}")
            }
            Self::RouteWeightBounds { route_id, min, max } => write!(
                f,
                "route `{route_id}` can never match: min weight {min} exceeds max weight {max}"
            ),
            Self::FirstLevelThreshold { exp_required } => {
                write!(f, "first level requires {exp_required} exp instead of 0")
            }
            Self::LevelThresholdNotIncreasing {
                level,
                exp_required,
                previous,
            } => write!(
                f,
                "level {level} requires {exp_required} exp, not above the previous {previous}"
            ),
        }
    }
}

fn parse_document<T>(document: &'static str, json: &str) -> Result<T, CatalogError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(json).map_err(|source| CatalogError::Parse { document, source })
}

/// Weights must be finite and non-negative.
fn check_weight<F>(context: F, value: f64, issues: &mut Vec<CatalogIssue>)
where
    F: FnOnce() -> String,
{
    if !value.is_finite() || value < 0.0 {
        issues.push(CatalogIssue::InvalidWeight {
            context: context(),
            value,
        });
    }
}

fn build_index<'a, I>(kind: &'static str, ids: I) -> Result<HashMap<String, usize>, CatalogError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut index = HashMap::new();
    for (position, id) in ids.into_iter().enumerate() {
        if index.insert(id.to_string(), position).is_some() {
            return Err(CatalogError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(index)
}

/// Immutable, indexed view over every catalog the exploration core reads.
#[derive(Debug, Clone, Serialize)]
pub struct GameCatalog {
    items: Vec<Item>,
    combinations: Vec<ItemCombination>,
    sites: Vec<Site>,
    routes: Vec<Route>,
    ruins: Vec<Ruin>,
    levels: LevelTable,
    discovery: DiscoveryConfig,
    #[serde(skip)]
    item_index: HashMap<String, usize>,
    #[serde(skip)]
    site_index: HashMap<String, usize>,
    #[serde(skip)]
    route_index: HashMap<String, usize>,
    #[serde(skip)]
    ruin_index: HashMap<String, usize>,
}

impl GameCatalog {
    /// Index pre-parsed catalog entries.
    ///
    /// # Errors
    ///
    /// Returns an error if any table contains a duplicate id or the discovery
    /// configuration is out of range.
    pub fn new(
        items: Vec<Item>,
        combinations: Vec<ItemCombination>,
        sites: Vec<Site>,
        routes: Vec<Route>,
        ruins: Vec<Ruin>,
        levels: LevelTable,
        discovery: DiscoveryConfig,
    ) -> Result<Self, CatalogError> {
        discovery.validate()?;
        levels.rewards.validate()?;
        let item_index = build_index("item", items.iter().map(|item| item.id.as_str()))?;
        let site_index = build_index("site", sites.iter().map(|site| site.id.as_str()))?;
        let route_index = build_index("route", routes.iter().map(|route| route.id.as_str()))?;
        let ruin_index = build_index("ruin", ruins.iter().map(|ruin| ruin.id.as_str()))?;
        Ok(Self {
            items,
            combinations,
            sites,
            routes,
            ruins,
            levels,
            discovery,
            item_index,
            site_index,
            route_index,
            ruin_index,
        })
    }

    /// Parse, index and validate a catalog. Validation issues are logged as
    /// warnings and do not prevent loading.
    ///
    /// # Errors
    ///
    /// Returns an error if a document is not valid JSON for its table, or if
    /// ids collide.
    pub fn from_sources(sources: CatalogSources<'_>) -> Result<Self, CatalogError> {
        let items: ItemsFile = parse_document("items", sources.items)?;
        let sites: SitesFile = parse_document("sites", sources.sites)?;
        let routes: RoutesFile = parse_document("routes", sources.routes)?;
        let ruins: RuinsFile = parse_document("ruins", sources.ruins)?;
        let levels: LevelTable = parse_document("levels", sources.levels)?;

        let catalog = Self::new(
            items.items,
            items.combinations,
            sites.sites,
            routes.routes,
            ruins.ruins,
            levels,
            ruins.discovery,
        )?;
        for issue in catalog.validate() {
            log::warn!("catalog: {issue}");
        }
        log::debug!(
            "catalog loaded: {} items, {} routes, {} ruins, {} levels",
            catalog.items.len(),
            catalog.routes.len(),
            catalog.ruins.len(),
            catalog.levels.levels.len()
        );
        Ok(catalog)
    }

    /// Load the catalog bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bundled assets are corrupt.
    pub fn load_default() -> Result<Self, CatalogError> {
        Self::from_sources(CatalogSources::bundled())
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn combinations(&self) -> &[ItemCombination] {
        &self.combinations
    }

    #[must_use]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn ruins(&self) -> &[Ruin] {
        &self.ruins
    }

    #[must_use]
    pub const fn levels(&self) -> &LevelTable {
        &self.levels
    }

    #[must_use]
    pub const fn discovery(&self) -> &DiscoveryConfig {
        &self.discovery
    }

    #[must_use]
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.item_index.get(id).and_then(|idx| self.items.get(*idx))
    }

    #[must_use]
    pub fn site(&self, id: &str) -> Option<&Site> {
        self.site_index.get(id).and_then(|idx| self.sites.get(*idx))
    }

    #[must_use]
    pub fn route(&self, id: &str) -> Option<&Route> {
        self.route_index.get(id).and_then(|idx| self.routes.get(*idx))
    }

    #[must_use]
    pub fn ruin(&self, id: &str) -> Option<&Ruin> {
        self.ruin_index.get(id).and_then(|idx| self.ruins.get(*idx))
    }

    /// Stable hash of the catalog contents, used to tag reports and saves.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&bytes);
        hasher.finish()
    }

    /// Check cross-references and tuning values.
    #[must_use]
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        for (table, empty) in [
            ("items", self.items.is_empty()),
            ("routes", self.routes.is_empty()),
            ("ruins", self.ruins.is_empty()),
        ] {
            if empty {
                issues.push(CatalogIssue::EmptyTable { table });
            }
        }

        for item in &self.items {
            check_weight(
                || format!("item `{}`", item.id),
                item.exploration_weight,
                &mut issues,
            );
        }

        for (idx, combo) in self.combinations.iter().enumerate() {
            let context = if combo.id.is_empty() {
                format!("combination #{idx}")
            } else {
                format!("combination `{}`", combo.id)
            };
            self.check_items(&context, &combo.required_items, &mut issues);
            check_weight(move || context, combo.weight_bonus, &mut issues);
        }

        for route in &self.routes {
            self.check_route(route, &mut issues);
        }

        for ruin in &self.ruins {
            if !self.sites.is_empty() && self.site(&ruin.site_id).is_none() {
                issues.push(CatalogIssue::UnknownSite {
                    context: format!("ruin `{}`", ruin.id),
                    site_id: ruin.site_id.clone(),
                });
            }
            check_weight(
                || format!("ruin `{}`", ruin.id),
                ruin.discover_probability,
                &mut issues,
            );
        }

        for item_id in self.discovery.item_hidden_bonus.keys() {
            if self.item(item_id).is_none() {
                issues.push(CatalogIssue::UnknownItem {
                    context: String::from("hidden chance bonuses"),
                    item_id: item_id.clone(),
                });
            }
        }

        issues.extend(self.levels.validate());
        for item_id in self.levels.item_unlocks.keys() {
            if self.item(item_id).is_none() {
                issues.push(CatalogIssue::UnknownItem {
                    context: String::from("item unlock table"),
                    item_id: item_id.clone(),
                });
            }
        }
        if !self.sites.is_empty() {
            for site_id in self.levels.site_unlocks.keys() {
                if self.site(site_id).is_none() {
                    issues.push(CatalogIssue::UnknownSite {
                        context: String::from("site unlock table"),
                        site_id: site_id.clone(),
                    });
                }
            }
        }
        issues
    }

    fn check_route(&self, route: &Route, issues: &mut Vec<CatalogIssue>) {
        let conditions = &route.conditions;
        self.check_items(
            &format!("route `{}` required items", route.id),
            &conditions.required_items,
            issues,
        );
        self.check_items(
            &format!("route `{}` excluded items", route.id),
            &conditions.excluded_items,
            issues,
        );
        if !self.sites.is_empty() && self.site(&route.target_site_id).is_none() {
            issues.push(CatalogIssue::UnknownSite {
                context: format!("route `{}`", route.id),
                site_id: route.target_site_id.clone(),
            });
        }
        if let (Some(min), Some(max)) = (conditions.min_weight, conditions.max_weight)
            && min > max
        {
            issues.push(CatalogIssue::RouteWeightBounds {
                route_id: route.id.clone(),
                min,
                max,
            });
        }
    }

    fn check_items(&self, context: &str, ids: &[String], issues: &mut Vec<CatalogIssue>) {
        for id in ids {
            if self.item(id).is_none() {
                issues.push(CatalogIssue::UnknownItem {
                    context: context.to_string(),
                    item_id: id.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: &str = r#"{
        "items": [
            { "id": "trowel", "name": "Trowel", "category": "digging_tools", "exploration_weight": 2 },
            { "id": "brush", "name": "Brush", "category": "cleaning_tools", "exploration_weight": 1 }
        ],
        "combinations": [
            { "required_items": ["trowel", "ghost"], "weight_bonus": 2 }
        ]
    }"#;

    fn sources<'a>(routes: &'a str, levels: &'a str) -> CatalogSources<'a> {
        CatalogSources {
            items: ITEMS,
            sites: r#"{ "sites": [ { "id": "giza", "name": "Giza" } ] }"#,
            routes,
            ruins: r#"{ "ruins": [ { "id": "shard", "site_id": "giza" } ] }"#,
            levels,
        }
    }

    #[test]
    fn optional_fields_take_defaults() {
        let catalog = GameCatalog::from_sources(sources(
            r#"{ "routes": [ { "id": "r1", "target_site_id": "giza" } ] }"#,
            r#"{ "levels": [ { "level": 1, "exp_required": 0 } ] }"#,
        ))
        .unwrap();
        let route = catalog.route("r1").unwrap();
        assert!(route.enabled);
        assert_eq!(route.priority, 0);
        assert_eq!(route.difficulty, Difficulty::Beginner);
        let ruin = catalog.ruin("shard").unwrap();
        assert!(!ruin.hidden);
        assert!((ruin.discover_probability - 1.0).abs() < f64::EPSILON);
        assert_eq!(catalog.item("brush").unwrap().rarity, Rarity::Common);
    }

    #[test]
    fn validation_reports_dangling_references() {
        let catalog = GameCatalog::from_sources(sources(
            r#"{ "routes": [ {
                "id": "r1", "target_site_id": "atlantis",
                "conditions": { "required_items": ["sonar"], "min_weight": 5, "max_weight": 2 }
            } ] }"#,
            r#"{ "levels": [ { "level": 1, "exp_required": 0 }, { "level": 2, "exp_required": 0 } ] }"#,
        ))
        .unwrap();
        let issues = catalog.validate();
        assert!(issues.contains(&CatalogIssue::UnknownItem {
            context: String::from("route `r1` required items"),
            item_id: String::from("sonar"),
        }));
        assert!(issues.contains(&CatalogIssue::UnknownItem {
            context: String::from("combination #0"),
            item_id: String::from("ghost"),
        }));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            CatalogIssue::UnknownSite { site_id, .. } if site_id == "atlantis"
        )));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            CatalogIssue::RouteWeightBounds { route_id, .. } if route_id == "r1"
        )));
        assert!(issues.iter().any(|issue| matches!(
            issue,
            CatalogIssue::LevelThresholdNotIncreasing { level: 2, .. }
        )));
    }

    #[test]
    fn validation_flags_non_finite_and_negative_weights() {
        let mut catalog = GameCatalog::from_sources(sources(
            r#"{ "routes": [ { "id": "r1", "target_site_id": "giza" } ] }"#,
            r#"{ "levels": [ { "level": 1, "exp_required": 0 } ] }"#,
        ))
        .unwrap();
        catalog.items[0].exploration_weight = f64::NAN;
        catalog.combinations[0].weight_bonus = f64::INFINITY;
        catalog.ruins[0].discover_probability = -1.0;
        let flagged: Vec<String> = catalog
            .validate()
            .into_iter()
            .filter_map(|issue| match issue {
                CatalogIssue::InvalidWeight { context, .. } => Some(context),
                _ => None,
            })
            .collect();
        assert_eq!(flagged, ["item `trowel`", "combination #0", "ruin `shard`"]);
    }

    #[test]
    fn duplicate_ids_are_fatal() {
        let err = GameCatalog::from_sources(sources(
            r#"{ "routes": [
                { "id": "r1", "target_site_id": "giza" },
                { "id": "r1", "target_site_id": "giza" }
            ] }"#,
            r#"{ "levels": [] }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId { kind: "route", .. }));
    }

    #[test]
    fn malformed_json_names_document() {
        let err = GameCatalog::from_sources(sources("{ not json", r#"{ "levels": [] }"#))
            .unwrap_err();
        assert!(err.to_string().contains("routes"));
    }

    #[test]
    fn difficulty_ordering_matches_ranks() {
        assert!(Difficulty::Beginner < Difficulty::Advanced);
        assert!(Difficulty::Advanced < Difficulty::Master);
        assert!(Difficulty::Master.admits(Difficulty::Beginner));
        assert!(!Difficulty::Beginner.admits(Difficulty::Master));
        assert_eq!(Difficulty::ALL.map(Difficulty::rank), [1, 2, 3]);
    }

    #[test]
    fn fingerprint_is_stable() {
        let routes = r#"{ "routes": [ { "id": "r1", "target_site_id": "giza" } ] }"#;
        let levels = r#"{ "levels": [ { "level": 1, "exp_required": 0 } ] }"#;
        let a = GameCatalog::from_sources(sources(routes, levels)).unwrap();
        let b = GameCatalog::from_sources(sources(routes, levels)).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
