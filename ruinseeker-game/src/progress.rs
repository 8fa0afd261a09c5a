//! Player progress: applying discoveries to experience, level and collection.
//!
//! Progress is a plain value owned by the caller. Applying a discovery returns
//! the next value instead of mutating shared state, so the account store stays
//! responsible for serializing read-modify-write per player.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MIN_LEVEL;
use crate::data::Ruin;
use crate::exploration::ExplorationResult;
use crate::levels::{LevelTable, LevelUpSummary};

/// Persisted per-player state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    #[serde(default)]
    pub experience: u32,
    /// Cached `level_for_experience(experience)`.
    #[serde(default = "PlayerProgress::default_level")]
    pub level: u32,
    /// Ruin id to the moment it was first obtained.
    #[serde(default)]
    pub discoveries: BTreeMap<String, DateTime<Utc>>,
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self {
            experience: 0,
            level: MIN_LEVEL,
            discoveries: BTreeMap::new(),
        }
    }
}

impl PlayerProgress {
    const fn default_level() -> u32 {
        MIN_LEVEL
    }

    #[must_use]
    pub fn from_experience(experience: u32, table: &LevelTable) -> Self {
        Self {
            experience,
            level: table.level_for_experience(experience),
            discoveries: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn has_discovered(&self, ruin_id: &str) -> bool {
        self.discoveries.contains_key(ruin_id)
    }

    #[must_use]
    pub fn discovery_count(&self) -> usize {
        self.discoveries.len()
    }

    /// Back to a fresh explorer.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Recompute the cached level, e.g. after the level table changed.
    /// Returns whether the cache was stale.
    pub fn sync_level(&mut self, table: &LevelTable) -> bool {
        let level = table.level_for_experience(self.experience);
        let stale = level != self.level;
        self.level = level;
        stale
    }

    /// Credit a discovery of `ruin` at `at`.
    ///
    /// First discoveries earn the full reward; repeats earn the configured
    /// fraction of it and leave the original discovery time untouched.
    #[must_use]
    pub fn apply_discovery(
        &self,
        ruin: &Ruin,
        table: &LevelTable,
        at: DateTime<Utc>,
    ) -> ProgressUpdate {
        let first_time = !self.has_discovered(&ruin.id);
        let full_reward = table.experience_reward(ruin, first_time);
        let credited = table.credited_experience(full_reward, first_time);

        let mut progress = self.clone();
        progress.experience = progress.experience.saturating_add(credited);
        if first_time {
            progress.discoveries.insert(ruin.id.clone(), at);
        }
        let previous_level = table.level_for_experience(self.experience);
        let new_level = table.level_for_experience(progress.experience);
        progress.level = new_level;

        let mut crossed: Vec<u32> = table
            .levels
            .iter()
            .map(|def| def.level)
            .filter(|level| *level > previous_level && *level <= new_level)
            .collect();
        crossed.sort_unstable();
        crossed.dedup();
        let level_ups: Vec<LevelUpSummary> = crossed
            .into_iter()
            .map(|level| table.level_up_summary(level))
            .collect();
        if !level_ups.is_empty() {
            log::debug!("progress | level {previous_level} -> {new_level}");
        }

        ProgressUpdate {
            progress,
            ruin_id: ruin.id.clone(),
            full_reward,
            credited,
            first_time,
            previous_level,
            new_level,
            level_ups,
        }
    }

    /// Apply a successful attempt; other outcomes leave progress unchanged.
    #[must_use]
    pub fn apply_outcome(
        &self,
        result: &ExplorationResult,
        table: &LevelTable,
    ) -> Option<ProgressUpdate> {
        match result {
            ExplorationResult::Success { ruin, record, .. } => {
                Some(self.apply_discovery(ruin, table, record.timestamp))
            }
            _ => None,
        }
    }
}

/// Result of crediting one discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress: PlayerProgress,
    pub ruin_id: String,
    pub full_reward: u32,
    pub credited: u32,
    pub first_time: bool,
    pub previous_level: u32,
    pub new_level: u32,
    /// One entry per level crossed, lowest first.
    pub level_ups: Vec<LevelUpSummary>,
}

impl ProgressUpdate {
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.new_level > self.previous_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Difficulty;
    use crate::levels::LevelDefinition;

    fn table() -> LevelTable {
        let mut second = LevelDefinition::new(2, 50);
        second.title = String::from("Field Assistant");
        second.unlocked_items = vec![String::from("pickaxe")];
        LevelTable::new(vec![
            LevelDefinition::new(1, 0),
            second,
            LevelDefinition::new(3, 110),
            LevelDefinition::new(4, 200),
        ])
    }

    fn ruin(id: &str, hidden: bool) -> Ruin {
        Ruin {
            id: id.to_string(),
            name: String::new(),
            site_id: String::from("giza"),
            hidden,
            required_difficulty: Difficulty::Beginner,
            discover_probability: 1.0,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn first_discovery_earns_full_reward_and_levels_up() {
        let table = table();
        let update =
            PlayerProgress::default().apply_discovery(&ruin("shard", false), &table, at(10));
        assert!(update.first_time);
        assert_eq!(update.full_reward, 25 + 30 + 15);
        assert_eq!(update.credited, 70);
        assert_eq!(update.progress.experience, 70);
        assert_eq!(update.progress.level, 2);
        assert!(update.leveled_up());
        assert_eq!(update.level_ups.len(), 1);
        assert_eq!(update.level_ups[0].title, "Field Assistant");
        assert_eq!(update.level_ups[0].new_items, vec!["pickaxe"]);
        assert_eq!(update.progress.discoveries.get("shard"), Some(&at(10)));
    }

    #[test]
    fn repeat_discovery_earns_a_tenth_and_keeps_first_timestamp() {
        let table = table();
        let first =
            PlayerProgress::default().apply_discovery(&ruin("shard", false), &table, at(10));
        let repeat = first
            .progress
            .apply_discovery(&ruin("shard", false), &table, at(99));
        assert!(!repeat.first_time);
        assert_eq!(repeat.full_reward, 40);
        assert_eq!(repeat.credited, 4);
        assert_eq!(repeat.progress.experience, 74);
        assert_eq!(repeat.progress.discoveries.get("shard"), Some(&at(10)));
        assert!(repeat.level_ups.is_empty());
    }

    #[test]
    fn large_rewards_report_every_level_crossed() {
        let mut table = table();
        table.rewards.hidden_discovery = 500;
        let update =
            PlayerProgress::default().apply_discovery(&ruin("vault", true), &table, at(1));
        assert_eq!(update.new_level, 4);
        let levels: Vec<u32> = update.level_ups.iter().map(|summary| summary.level).collect();
        assert_eq!(levels, vec![2, 3, 4]);
        assert_eq!(update.level_ups[1].title, "Level 3");
    }

    #[test]
    fn level_ups_ascend_for_out_of_order_tables() {
        let mut table = LevelTable::new(vec![
            LevelDefinition::new(1, 0),
            LevelDefinition::new(3, 110),
            LevelDefinition::new(2, 50),
            LevelDefinition::new(2, 50),
        ]);
        table.rewards.hidden_discovery = 500;
        let update =
            PlayerProgress::default().apply_discovery(&ruin("vault", true), &table, at(1));
        assert_eq!(update.new_level, 3);
        let levels: Vec<u32> = update.level_ups.iter().map(|summary| summary.level).collect();
        assert_eq!(levels, vec![2, 3]);
    }

    #[test]
    fn stale_level_cache_is_ignored_and_resynced() {
        let table = table();
        let mut progress = PlayerProgress {
            experience: 120,
            level: 1,
            discoveries: BTreeMap::new(),
        };
        let update = progress.apply_discovery(&ruin("shard", false), &table, at(5));
        assert_eq!(update.previous_level, 3);
        assert!(update.level_ups.is_empty());
        assert!(progress.sync_level(&table));
        assert_eq!(progress.level, 3);
        assert!(!progress.sync_level(&table));
    }

    #[test]
    fn reset_clears_everything() {
        let table = table();
        let mut progress = PlayerProgress::from_experience(150, &table);
        progress.discoveries.insert(String::from("shard"), at(3));
        progress.reset();
        assert_eq!(progress, PlayerProgress::default());
        assert_eq!(progress.level, 1);
    }

    #[test]
    fn failed_outcomes_do_not_touch_progress() {
        let table = table();
        let progress = PlayerProgress::default();
        let outcome = ExplorationResult::NoRoute { total_weight: 0.0 };
        assert!(progress.apply_outcome(&outcome, &table).is_none());
    }

    #[test]
    fn progress_deserializes_with_defaults() {
        let progress: PlayerProgress = serde_json::from_str("{}").unwrap();
        assert_eq!(progress, PlayerProgress::default());
    }
}
