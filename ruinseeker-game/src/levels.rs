//! Level progression: experience thresholds, unlocks and rewards.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_ITEM_SLOTS, EXP_EXPLORATION_BONUS, EXP_FIRST_TIME_BONUS, EXP_HIDDEN_DISCOVERY,
    EXP_NORMAL_DISCOVERY, EXP_REPEAT_FRACTION, MIN_LEVEL,
};
use crate::data::{CatalogIssue, ConfigError, Ruin};
use crate::numbers::scale_floor;

/// Experience granted per exploration outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "RewardConfig::default_normal_discovery")]
    pub normal_discovery: u32,
    #[serde(default = "RewardConfig::default_hidden_discovery")]
    pub hidden_discovery: u32,
    #[serde(default = "RewardConfig::default_first_time_discovery")]
    pub first_time_discovery: u32,
    #[serde(default = "RewardConfig::default_exploration_bonus")]
    pub exploration_bonus: u32,
    /// Share of the full reward credited when the ruin was already collected.
    #[serde(default = "RewardConfig::default_repeat_fraction")]
    pub repeat_fraction: f64,
}

impl RewardConfig {
    const fn default_normal_discovery() -> u32 {
        EXP_NORMAL_DISCOVERY
    }

    const fn default_hidden_discovery() -> u32 {
        EXP_HIDDEN_DISCOVERY
    }

    const fn default_first_time_discovery() -> u32 {
        EXP_FIRST_TIME_BONUS
    }

    const fn default_exploration_bonus() -> u32 {
        EXP_EXPLORATION_BONUS
    }

    const fn default_repeat_fraction() -> f64 {
        EXP_REPEAT_FRACTION
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let value = self.repeat_fraction;
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Probability {
                field: "rewards.repeat_fraction",
                value,
            });
        }
        Ok(())
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            normal_discovery: Self::default_normal_discovery(),
            hidden_discovery: Self::default_hidden_discovery(),
            first_time_discovery: Self::default_first_time_discovery(),
            exploration_bonus: Self::default_exploration_bonus(),
            repeat_fraction: Self::default_repeat_fraction(),
        }
    }
}

/// One row of the level table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub level: u32,
    /// Cumulative experience needed to reach this level.
    pub exp_required: u32,
    #[serde(default)]
    pub unlocked_items: Vec<String>,
    #[serde(default)]
    pub unlocked_sites: Vec<String>,
    #[serde(default)]
    pub max_item_slots: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub perks: Vec<String>,
}

impl LevelDefinition {
    #[must_use]
    pub fn new(level: u32, exp_required: u32) -> Self {
        Self {
            level,
            exp_required,
            unlocked_items: Vec::new(),
            unlocked_sites: Vec::new(),
            max_item_slots: None,
            title: String::new(),
            description: String::new(),
            perks: Vec::new(),
        }
    }
}

/// Presentation data for a level transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpSummary {
    pub level: u32,
    pub title: String,
    pub description: String,
    pub new_items: Vec<String>,
    pub new_sites: Vec<String>,
    pub perks: Vec<String>,
}

/// Experience-to-level mapping plus unlock tables and reward tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    #[serde(default)]
    pub levels: Vec<LevelDefinition>,
    /// Item id to the level that unlocks it.
    #[serde(default)]
    pub item_unlocks: BTreeMap<String, u32>,
    /// Site id to the level that unlocks it.
    #[serde(default)]
    pub site_unlocks: BTreeMap<String, u32>,
    #[serde(default)]
    pub rewards: RewardConfig,
}

impl LevelTable {
    #[must_use]
    pub fn new(levels: Vec<LevelDefinition>) -> Self {
        Self {
            levels,
            ..Self::default()
        }
    }

    /// Level of the highest threshold that `experience` meets, floored at 1.
    ///
    /// Rows are scanned by threshold rather than table position, so
    /// out-of-order tables still resolve. Equal thresholds resolve to the
    /// higher level.
    #[must_use]
    pub fn level_for_experience(&self, experience: u32) -> u32 {
        self.levels
            .iter()
            .filter(|def| def.exp_required <= experience)
            .max_by_key(|def| (def.exp_required, def.level))
            .map_or(MIN_LEVEL, |def| def.level)
            .max(MIN_LEVEL)
    }

    /// Threshold of the level after `current_level`, or `None` at max level.
    #[must_use]
    pub fn exp_for_next_level(&self, current_level: u32) -> Option<u32> {
        let next = current_level.checked_add(1)?;
        self.definition(next).map(|def| def.exp_required)
    }

    #[must_use]
    pub fn exp_required_for_level(&self, level: u32) -> u32 {
        self.definition(level).map_or(0, |def| def.exp_required)
    }

    /// Fraction of the current level band already earned, in `[0, 1]`.
    #[must_use]
    pub fn progress_fraction(&self, experience: u32, current_level: u32) -> f64 {
        let Some(next_exp) = self.exp_for_next_level(current_level) else {
            return 1.0;
        };
        let current_exp = self.exp_required_for_level(current_level);
        if next_exp <= current_exp {
            return 1.0;
        }
        let earned = f64::from(experience) - f64::from(current_exp);
        let band = f64::from(next_exp - current_exp);
        (earned / band).clamp(0.0, 1.0)
    }

    /// Exact row for `level`.
    #[must_use]
    pub fn definition(&self, level: u32) -> Option<&LevelDefinition> {
        self.levels.iter().find(|def| def.level == level)
    }

    /// Row for `level`, falling back to the first row of the table.
    #[must_use]
    pub fn level_info(&self, level: u32) -> Option<&LevelDefinition> {
        self.definition(level).or_else(|| self.levels.first())
    }

    #[must_use]
    pub fn max_item_slots(&self, level: u32) -> u32 {
        self.level_info(level)
            .and_then(|def| def.max_item_slots)
            .unwrap_or(DEFAULT_MAX_ITEM_SLOTS)
    }

    /// Lowest level at which `item_id` becomes usable, if any row unlocks it.
    #[must_use]
    pub fn required_level_for_item(&self, item_id: &str) -> Option<u32> {
        let listed = self
            .levels
            .iter()
            .filter(|def| def.unlocked_items.iter().any(|id| id == item_id))
            .map(|def| def.level);
        self.item_unlocks.get(item_id).copied().into_iter().chain(listed).min()
    }

    #[must_use]
    pub fn required_level_for_site(&self, site_id: &str) -> Option<u32> {
        let listed = self
            .levels
            .iter()
            .filter(|def| def.unlocked_sites.iter().any(|id| id == site_id))
            .map(|def| def.level);
        self.site_unlocks.get(site_id).copied().into_iter().chain(listed).min()
    }

    #[must_use]
    pub fn is_item_unlocked(&self, item_id: &str, level: u32) -> bool {
        self.required_level_for_item(item_id)
            .is_some_and(|required| required <= level)
    }

    #[must_use]
    pub fn is_site_unlocked(&self, site_id: &str, level: u32) -> bool {
        self.required_level_for_site(site_id)
            .is_some_and(|required| required <= level)
    }

    #[must_use]
    pub fn unlocked_items(&self, level: u32) -> BTreeSet<String> {
        let listed = self.levels.iter().flat_map(|def| def.unlocked_items.iter());
        self.item_unlocks
            .keys()
            .chain(listed)
            .filter(|id| self.is_item_unlocked(id, level))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn unlocked_sites(&self, level: u32) -> BTreeSet<String> {
        let listed = self.levels.iter().flat_map(|def| def.unlocked_sites.iter());
        self.site_unlocks
            .keys()
            .chain(listed)
            .filter(|id| self.is_site_unlocked(id, level))
            .cloned()
            .collect()
    }

    /// Full reward for finding `ruin`, before any repeat reduction.
    #[must_use]
    pub fn experience_reward(&self, ruin: &Ruin, first_time: bool) -> u32 {
        let rewards = &self.rewards;
        let mut total = if ruin.hidden {
            rewards.hidden_discovery
        } else {
            rewards.normal_discovery
        };
        if first_time {
            total = total.saturating_add(rewards.first_time_discovery);
        }
        total.saturating_add(rewards.exploration_bonus)
    }

    /// Experience actually credited: the full reward the first time, a
    /// rounded-down fraction of it on repeats.
    #[must_use]
    pub fn credited_experience(&self, full_reward: u32, first_time: bool) -> u32 {
        if first_time {
            full_reward
        } else {
            scale_floor(full_reward, self.rewards.repeat_fraction)
        }
    }

    #[must_use]
    pub fn level_up_summary(&self, new_level: u32) -> LevelUpSummary {
        match self.definition(new_level) {
            Some(def) => LevelUpSummary {
                level: new_level,
                title: if def.title.is_empty() {
                    format!("Level {new_level}")
                } else {
                    def.title.clone()
                },
                description: def.description.clone(),
                new_items: def.unlocked_items.clone(),
                new_sites: def.unlocked_sites.clone(),
                perks: def.perks.clone(),
            },
            None => LevelUpSummary {
                level: new_level,
                title: format!("Level {new_level}"),
                description: String::new(),
                new_items: Vec::new(),
                new_sites: Vec::new(),
                perks: Vec::new(),
            },
        }
    }

    /// Threshold anomalies. Lookups keep working on a malformed table.
    #[must_use]
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        let Some(first) = self.levels.first() else {
            issues.push(CatalogIssue::EmptyTable { table: "levels" });
            return issues;
        };
        if first.exp_required != 0 {
            issues.push(CatalogIssue::FirstLevelThreshold {
                exp_required: first.exp_required,
            });
        }
        for pair in self.levels.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            if current.exp_required <= previous.exp_required {
                issues.push(CatalogIssue::LevelThresholdNotIncreasing {
                    level: current.level,
                    exp_required: current.exp_required,
                    previous: previous.exp_required,
                });
            }
        }
        issues
    }
}
