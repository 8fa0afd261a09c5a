//! Ruinseeker Game Engine
//!
//! Platform-agnostic exploration core: equipment-to-route matching, tiered
//! weighted discovery, and level progression. No UI, storage or network
//! dependencies; callers inject catalogs, progress storage and randomness.

pub mod constants;
pub mod data;
pub mod discovery;
pub mod exploration;
pub mod levels;
pub mod numbers;
pub mod progress;
pub mod routing;
pub mod seed;

use std::sync::Arc;

use rand::rngs::SmallRng;

// Re-export commonly used types
pub use data::{
    CatalogError, CatalogIssue, CatalogSources, ConfigError, Difficulty, GameCatalog, Item,
    ItemCategory, ItemCombination, Rarity, Route, Ruin, Site, TriggerConditions,
};
pub use discovery::{
    DiscoveryConfig, DiscoveryError, DiscoveryPool, DiscoveryResolver, DiscoveryTrace,
    WeightedCandidate,
};
pub use exploration::{ExplorationEngine, ExplorationError, ExplorationRecord, ExplorationResult};
pub use levels::{LevelDefinition, LevelTable, LevelUpSummary, RewardConfig};
pub use progress::{PlayerProgress, ProgressUpdate};
pub use routing::{ExplorationLevel, ExplorationPreview, RouteMatcher, RouteRejection, Selection};
pub use seed::{attempt_seed, derive_stream_seed, discovery_rng};

/// Trait for abstracting catalog loading.
/// Platform-specific implementations should provide this
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the full exploration catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or parsed.
    fn load_catalog(&self) -> Result<GameCatalog, Self::Error>;
}

/// Loader serving the catalog compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCatalog;

impl CatalogLoader for BundledCatalog {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<GameCatalog, Self::Error> {
        GameCatalog::load_default()
    }
}

/// Trait for abstracting player progress persistence.
/// The store must serialize read-modify-write per player.
pub trait ProgressStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load a player's progress, `None` for unknown players
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be loaded.
    fn load_progress(&self, player_id: &str) -> Result<Option<PlayerProgress>, Self::Error>;

    /// Persist a player's progress
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be saved.
    fn save_progress(&self, player_id: &str, progress: &PlayerProgress) -> Result<(), Self::Error>;
}

/// Main engine wiring a catalog source to progress storage
pub struct GameEngine<L, S>
where
    L: CatalogLoader,
    S: ProgressStore,
{
    catalog_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: CatalogLoader,
    S: ProgressStore,
{
    /// Create a new game engine with the provided catalog loader and storage
    pub const fn new(catalog_loader: L, storage: S) -> Self {
        Self {
            catalog_loader,
            storage,
        }
    }

    /// Create a seeded explorer over a freshly loaded catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn create_explorer(&self, seed: u64) -> Result<ExplorationEngine<SmallRng>, L::Error> {
        let catalog = self.catalog_loader.load_catalog()?;
        Ok(ExplorationEngine::seeded(Arc::new(catalog), seed))
    }

    /// Stored progress for a player, or a fresh explorer's.
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be loaded.
    pub fn progress(&self, player_id: &str) -> Result<PlayerProgress, S::Error> {
        Ok(self.storage.load_progress(player_id)?.unwrap_or_default())
    }

    /// Save a player's progress
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be saved.
    pub fn save_progress(
        &self,
        player_id: &str,
        progress: &PlayerProgress,
    ) -> Result<(), S::Error> {
        self.storage.save_progress(player_id, progress)
    }

    /// Credit a finished attempt to a player and persist the result.
    ///
    /// Returns `None` when the attempt found nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if progress cannot be loaded or saved.
    pub fn record_exploration(
        &self,
        player_id: &str,
        levels: &LevelTable,
        result: &ExplorationResult,
    ) -> Result<Option<ProgressUpdate>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let current = self.progress(player_id).map_err(Into::into)?;
        let Some(update) = current.apply_outcome(result, levels) else {
            return Ok(None);
        };
        self.storage
            .save_progress(player_id, &update.progress)
            .map_err(Into::into)?;
        Ok(Some(update))
    }

    /// Wipe a player's progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset progress cannot be saved.
    pub fn reset_progress(&self, player_id: &str) -> Result<PlayerProgress, S::Error> {
        let progress = PlayerProgress::default();
        self.storage.save_progress(player_id, &progress)?;
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStore {
        players: Rc<RefCell<HashMap<String, PlayerProgress>>>,
    }

    impl ProgressStore for MemoryStore {
        type Error = Infallible;

        fn load_progress(&self, player_id: &str) -> Result<Option<PlayerProgress>, Self::Error> {
            Ok(self.players.borrow().get(player_id).cloned())
        }

        fn save_progress(
            &self,
            player_id: &str,
            progress: &PlayerProgress,
        ) -> Result<(), Self::Error> {
            self.players
                .borrow_mut()
                .insert(player_id.to_string(), progress.clone());
            Ok(())
        }
    }

    fn starter_selection(explorer: &ExplorationEngine<SmallRng>) -> Selection {
        let levels = explorer.catalog().levels();
        let slots = usize::try_from(levels.max_item_slots(1)).unwrap();
        levels.unlocked_items(1).into_iter().take(slots).collect()
    }

    #[test]
    fn engine_records_and_persists_progress() {
        let store = MemoryStore::default();
        let engine = GameEngine::new(BundledCatalog, store.clone());
        let mut explorer = engine.create_explorer(0xABCD).unwrap();
        let levels = explorer.catalog().levels().clone();
        let selection = starter_selection(&explorer);

        let mut recorded = 0;
        for _ in 0..20 {
            let result = explorer.execute(&selection);
            if let Some(update) = engine.record_exploration("ada", &levels, &result).unwrap() {
                recorded += 1;
                assert!(update.credited > 0);
            }
        }
        assert!(recorded > 0);
        let stored = engine.progress("ada").unwrap();
        assert!(stored.experience > 0);
        assert!(stored.discovery_count() > 0);
        assert_eq!(stored.level, levels.level_for_experience(stored.experience));
    }

    #[test]
    fn failed_attempts_leave_storage_alone() {
        let engine = GameEngine::new(BundledCatalog, MemoryStore::default());
        let levels = LevelTable::default();
        let outcome = ExplorationResult::NoRoute { total_weight: 0.0 };
        assert!(engine.record_exploration("bo", &levels, &outcome).unwrap().is_none());
        assert_eq!(engine.progress("bo").unwrap(), PlayerProgress::default());
    }

    #[test]
    fn reset_overwrites_stored_progress() {
        let store = MemoryStore::default();
        let engine = GameEngine::new(BundledCatalog, store.clone());
        store
            .save_progress("cy", &PlayerProgress {
                experience: 500,
                level: 4,
                ..PlayerProgress::default()
            })
            .unwrap();
        engine.reset_progress("cy").unwrap();
        assert_eq!(engine.progress("cy").unwrap().experience, 0);
    }
}
