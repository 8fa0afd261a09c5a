//! Filesystem adapters: catalog directories and single-player progress files.
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ruinseeker_game::{
    CatalogError, CatalogLoader, CatalogSources, GameCatalog, PlayerProgress, ProgressStore,
};
use thiserror::Error;

pub const CATALOG_FILES: [&str; 5] = [
    "items.json",
    "sites.json",
    "routes.json",
    "ruins.json",
    "levels.json",
];

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Catalog read from a directory holding the five catalog documents, or the
/// bundled catalog when no directory is given.
#[derive(Debug, Clone, Default)]
pub struct DirectoryCatalog {
    dir: Option<PathBuf>,
}

impl DirectoryCatalog {
    pub const fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn describe(&self) -> String {
        self.dir
            .as_ref()
            .map_or_else(|| String::from("bundled"), |dir| dir.display().to_string())
    }
}

fn read_document(dir: &Path, name: &str) -> Result<String, CatalogLoadError> {
    let path = dir.join(name);
    fs::read_to_string(&path).map_err(|source| CatalogLoadError::Read { path, source })
}

impl CatalogLoader for DirectoryCatalog {
    type Error = CatalogLoadError;

    fn load_catalog(&self) -> Result<GameCatalog, Self::Error> {
        let Some(dir) = &self.dir else {
            return Ok(GameCatalog::load_default()?);
        };
        let [items, sites, routes, ruins, levels] =
            CATALOG_FILES.map(|name| read_document(dir, name));
        let (items, sites, routes, ruins, levels) = (items?, sites?, routes?, ruins?, levels?);
        Ok(GameCatalog::from_sources(CatalogSources {
            items: &items,
            sites: &sites,
            routes: &routes,
            ruins: &ruins,
            levels: &levels,
        })?)
    }
}

/// Load a catalog, attaching the source to any error.
pub fn load_catalog(loader: &DirectoryCatalog) -> Result<GameCatalog> {
    loader
        .load_catalog()
        .with_context(|| format!("failed to load {} catalog", loader.describe()))
}

/// Progress for a single player, kept in a JSON file or only in memory.
#[derive(Debug, Default)]
pub struct ProgressFile {
    path: Option<PathBuf>,
    scratch: RefCell<Option<PlayerProgress>>,
}

impl ProgressFile {
    pub const fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            scratch: RefCell::new(None),
        }
    }
}

impl ProgressStore for ProgressFile {
    type Error = io::Error;

    fn load_progress(&self, _player_id: &str) -> Result<Option<PlayerProgress>, Self::Error> {
        let Some(path) = &self.path else {
            return Ok(self.scratch.borrow().clone());
        };
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn save_progress(
        &self,
        _player_id: &str,
        progress: &PlayerProgress,
    ) -> Result<(), Self::Error> {
        let Some(path) = &self.path else {
            *self.scratch.borrow_mut() = Some(progress.clone());
            return Ok(());
        };
        let payload = serde_json::to_vec_pretty(progress)?;
        fs::write(path, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ruinseeker-catalog-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_bundled(dir: &Path) {
        let bundled = CatalogSources::bundled();
        let docs = [
            bundled.items,
            bundled.sites,
            bundled.routes,
            bundled.ruins,
            bundled.levels,
        ];
        for (name, doc) in CATALOG_FILES.iter().zip(docs) {
            fs::write(dir.join(name), doc).unwrap();
        }
    }

    #[test]
    fn directory_catalog_matches_bundled() {
        let dir = temp_dir("copy");
        write_bundled(&dir);
        let from_dir = load_catalog(&DirectoryCatalog::new(Some(dir))).unwrap();
        let bundled = load_catalog(&DirectoryCatalog::default()).unwrap();
        assert_eq!(from_dir.fingerprint(), bundled.fingerprint());
    }

    #[test]
    fn missing_document_names_the_file() {
        let dir = temp_dir("missing");
        write_bundled(&dir);
        fs::remove_file(dir.join("routes.json")).unwrap();
        let err = load_catalog(&DirectoryCatalog::new(Some(dir))).unwrap_err();
        assert!(format!("{err:#}").contains("routes.json"));
    }

    #[test]
    fn progress_file_roundtrips_and_defaults_when_absent() {
        let path = temp_dir("progress").join("player.json");
        let store = ProgressFile::new(Some(path.clone()));
        assert!(store.load_progress("me").unwrap().is_none());
        let progress = PlayerProgress {
            experience: 75,
            level: 2,
            ..PlayerProgress::default()
        };
        store.save_progress("me", &progress).unwrap();
        assert!(path.exists());
        assert_eq!(store.load_progress("me").unwrap(), Some(progress));
    }

    #[test]
    fn scratch_store_keeps_progress_in_memory() {
        let store = ProgressFile::new(None);
        store
            .save_progress("me", &PlayerProgress::default())
            .unwrap();
        assert_eq!(
            store.load_progress("me").unwrap(),
            Some(PlayerProgress::default())
        );
    }
}
