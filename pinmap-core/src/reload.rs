// Build-then-publish reloading and the file poller that triggers it

use crate::engine::DirectiveFile;
use crate::error::Result;
use crate::map::{DuplicatePolicy, ImportMap, MissingAssetPolicy};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant, SystemTime};
use walkdir::WalkDir;

/// Everything needed to build a fresh `ImportMap`
#[derive(Debug, Clone)]
pub struct MapSource {
    pub root: PathBuf,
    pub files: Vec<DirectiveFile>,
    pub duplicates: DuplicatePolicy,
    pub missing_assets: MissingAssetPolicy,
}

impl MapSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Vec::new(),
            duplicates: DuplicatePolicy::default(),
            missing_assets: MissingAssetPolicy::default(),
        }
    }

    pub fn with_file(mut self, file: DirectiveFile) -> Self {
        self.files.push(file);
        self
    }

    /// Draw every directive file in order; later files override earlier ones.
    /// Files that do not exist are skipped.
    pub fn build(&self) -> Result<ImportMap> {
        let mut map = ImportMap::new(&self.root)
            .with_duplicate_policy(self.duplicates)
            .with_missing_asset_policy(self.missing_assets);

        for file in &self.files {
            if file.path.is_file() {
                map.draw_in(&file.path, &file.root)?;
            } else {
                log::debug!("No directive file at {}, skipping", file.path.display());
            }
        }

        // Expand now so directory errors surface before the map is published
        map.pins()?;
        Ok(map)
    }
}

/// The published map. Readers take `Arc` snapshots; `reload` swaps in a
/// new map only after it was built completely.
#[derive(Debug)]
pub struct SharedImportMap {
    source: MapSource,
    current: RwLock<Arc<ImportMap>>,
    generation: AtomicU64,
    // Held across build and swap so reloads publish in the order they read
    reloading: Mutex<()>,
}

impl SharedImportMap {
    /// Build and publish the first map; fails if it cannot be built
    pub fn load(source: MapSource) -> Result<Self> {
        let map = source.build()?;
        log::info!("Loaded import map with {} pin(s)", map.names()?.len());

        Ok(Self {
            source,
            current: RwLock::new(Arc::new(map)),
            generation: AtomicU64::new(0),
            reloading: Mutex::new(()),
        })
    }

    pub fn source(&self) -> &MapSource {
        &self.source
    }

    /// Current map; stays valid and unchanged across later reloads
    pub fn snapshot(&self) -> Arc<ImportMap> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Number of successful reloads since `load`
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Rebuild from the source. On error the published map is left as is.
    pub fn reload(&self) -> Result<Arc<ImportMap>> {
        let _reloading = self.reloading.lock().unwrap_or_else(PoisonError::into_inner);
        let map = Arc::new(self.source.build()?);

        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = Arc::clone(&map);
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        log::info!(
            "Reloaded import map (generation {}, {} pin(s))",
            generation,
            map.names()?.len()
        );
        Ok(map)
    }
}

/// Polls watched paths and reports files that were added, removed or modified.
///
/// Checks are throttled to one per `check_interval`.
#[derive(Debug)]
pub struct CacheSweeper {
    watched: Vec<PathBuf>,
    files: BTreeMap<PathBuf, Option<SystemTime>>,
    last_check: Option<Instant>,
    check_interval: Duration,
}

impl CacheSweeper {
    pub fn new() -> Self {
        Self {
            watched: Vec::new(),
            files: BTreeMap::new(),
            last_check: None,
            check_interval: Duration::from_secs(1),
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Watch a file or a directory (recursively), recording its current state
    pub fn watch(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.watched.contains(&path) {
            return;
        }

        self.files.extend(scan(&path));
        self.watched.push(path);
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    pub fn tracked_count(&self) -> usize {
        self.files.len()
    }

    /// Paths changed since the previous check. Empty while throttled.
    pub fn changed_files(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        if let Some(last_check) = self.last_check {
            if now.duration_since(last_check) < self.check_interval {
                return Vec::new();
            }
        }
        self.last_check = Some(now);

        let current: BTreeMap<_, _> = self.watched.iter().flat_map(|path| scan(path)).collect();

        let mut changed: Vec<PathBuf> = current
            .iter()
            .filter(|(path, mtime)| self.files.get(*path) != Some(*mtime))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            self.files
                .keys()
                .filter(|path| !current.contains_key(*path))
                .cloned(),
        );

        if !changed.is_empty() {
            log::debug!("{} watched file(s) changed", changed.len());
        }

        self.files = current;
        changed
    }

    pub fn has_changes(&mut self) -> bool {
        !self.changed_files().is_empty()
    }
}

impl Default for CacheSweeper {
    fn default() -> Self {
        Self::new()
    }
}

fn scan(path: &Path) -> Vec<(PathBuf, Option<SystemTime>)> {
    WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let mtime = entry.metadata().ok().and_then(|m| m.modified().ok());
            (entry.into_path(), mtime)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::PrefixResolver;
    use std::fs;
    use tempfile::tempdir;

    fn source_for(root: &Path) -> MapSource {
        MapSource::new(root).with_file(DirectiveFile::new(
            root.join("config/importmap.pins"),
            root,
        ))
    }

    #[test]
    fn test_build_skips_missing_directive_files() {
        let dir = tempdir().unwrap();
        let map = source_for(dir.path()).build().unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_failed_reload_keeps_published_map() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/importmap.pins"), "pin \"app\"\n").unwrap();

        let shared = SharedImportMap::load(source_for(dir.path())).unwrap();
        let before = shared.snapshot();

        fs::write(dir.path().join("config/importmap.pins"), "pin \"app\", to:\n").unwrap();
        assert!(shared.reload().is_err());

        assert_eq!(shared.generation(), 0);
        assert!(Arc::ptr_eq(&before, &shared.snapshot()));
        assert_eq!(
            shared.snapshot().to_json(&PrefixResolver::default()).unwrap(),
            r#"{"imports":{"app":"/assets/app.js"}}"#
        );
    }

    #[test]
    fn test_concurrent_reloads_publish_latest_build() {
        let dir = tempdir().unwrap();
        let pins = dir.path().join("config/importmap.pins");
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(&pins, "pin \"app\"\n").unwrap();

        let shared = Arc::new(SharedImportMap::load(source_for(dir.path())).unwrap());

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                let pins = pins.clone();
                let staged = pins.with_extension(format!("staged{}", i));
                std::thread::spawn(move || {
                    for round in 0..5 {
                        let body = format!("pin \"app\"\npin \"v{}_{}\"\n", i, round);
                        fs::write(&staged, body).unwrap();
                        fs::rename(&staged, &pins).unwrap();
                        shared.reload().unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(shared.generation(), 20);
        // The last reload read the last file written
        let published = shared.snapshot().names().unwrap().join(",");
        let rebuilt = shared.source().build().unwrap().names().unwrap().join(",");
        assert_eq!(published, rebuilt);
    }

    #[test]
    fn test_sweeper_detects_added_removed_and_modified_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "a").unwrap();
        fs::write(dir.path().join("b.js"), "b").unwrap();

        let mut sweeper = CacheSweeper::new().with_check_interval(Duration::ZERO);
        sweeper.watch(dir.path());
        assert_eq!(sweeper.tracked_count(), 2);
        assert!(sweeper.changed_files().is_empty());

        fs::write(dir.path().join("c.js"), "c").unwrap();
        fs::remove_file(dir.path().join("b.js")).unwrap();
        let mut changed = sweeper.changed_files();
        changed.sort();
        assert_eq!(changed, vec![dir.path().join("b.js"), dir.path().join("c.js")]);

        let later = SystemTime::now() + Duration::from_secs(10);
        fs::File::options()
            .write(true)
            .open(dir.path().join("a.js"))
            .unwrap()
            .set_modified(later)
            .unwrap();
        assert_eq!(sweeper.changed_files(), vec![dir.path().join("a.js")]);
        assert!(!sweeper.has_changes());
    }

    #[test]
    fn test_sweeper_throttles_checks() {
        let dir = tempdir().unwrap();
        let mut sweeper = CacheSweeper::new().with_check_interval(Duration::from_secs(3600));
        sweeper.watch(dir.path());

        // The first check always runs and records the check time
        assert!(sweeper.changed_files().is_empty());
        fs::write(dir.path().join("new.js"), "x").unwrap();
        assert!(sweeper.changed_files().is_empty());
    }
}
