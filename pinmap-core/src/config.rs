// Configuration: owns the published import map, its resolver and its sweeper

use crate::asset::AssetResolver;
use crate::document::ImportMapDocument;
use crate::engine::{Engine, HostRegistry};
use crate::error::Result;
use crate::map::ImportMap;
use crate::reload::{CacheSweeper, MapSource, SharedImportMap};
use pinmap_diagnostics::DiagnosticEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Import-map state for one application, passed explicitly to whoever
/// renders the map
pub struct Configuration {
    importmap: SharedImportMap,
    resolver: Arc<dyn AssetResolver + Send + Sync>,
    sweeper: Mutex<CacheSweeper>,
}

impl Configuration {
    pub fn new<R>(source: MapSource, resolver: R, sweeper: CacheSweeper) -> Result<Self>
    where
        R: AssetResolver + Send + Sync + 'static,
    {
        Ok(Self {
            importmap: SharedImportMap::load(source)?,
            resolver: Arc::new(resolver),
            sweeper: Mutex::new(sweeper),
        })
    }

    /// A single engine serving its own map
    pub fn load(engine: &Engine) -> Result<Self> {
        log::debug!("Loading import map for engine {}", engine.name());
        Self::new(
            engine.map_source(),
            engine.asset_resolver(),
            engine.cache_sweeper(),
        )
    }

    /// A host with every installed engine
    pub fn for_host(host: &HostRegistry) -> Result<Self> {
        Self::new(host.map_source(), host.asset_resolver(), host.cache_sweeper())
    }

    pub fn importmap(&self) -> &SharedImportMap {
        &self.importmap
    }

    pub fn resolver(&self) -> &(dyn AssetResolver + Send + Sync) {
        self.resolver.as_ref()
    }

    /// Snapshot of the published map
    pub fn get_map(&self) -> Arc<ImportMap> {
        self.importmap.snapshot()
    }

    pub fn resolve(&self) -> Result<ImportMapDocument> {
        self.get_map().resolve(self.resolver())
    }

    pub fn to_json(&self) -> Result<String> {
        self.resolve()?.to_json()
    }

    /// Render the published map through a different resolver
    pub fn to_json_with(&self, resolver: &dyn AssetResolver) -> Result<String> {
        self.get_map().to_json(resolver)
    }

    pub fn preloaded_module_paths(&self) -> Result<Vec<String>> {
        self.get_map().preloaded_module_paths(self.resolver())
    }

    pub fn digest(&self) -> Result<String> {
        self.get_map().digest(self.resolver())
    }

    /// Overridden pins and missing assets in the published map
    pub fn check(&self) -> DiagnosticEngine {
        self.get_map().check(self.resolver())
    }

    pub fn reload(&self) -> Result<Arc<ImportMap>> {
        self.importmap.reload()
    }

    /// Reload when a watched file changed; returns whether it did
    pub fn sweep(&self) -> Result<bool> {
        let changed = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .changed_files();
        if changed.is_empty() {
            return Ok(false);
        }

        log::info!("{} file(s) changed, reloading import map", changed.len());
        self.reload()?;
        Ok(true)
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("importmap", &self.importmap)
            .field("sweeper", &self.sweeper)
            .finish_non_exhaustive()
    }
}

/// Background sweeper thread; stops on `stop` or when dropped
#[derive(Debug)]
pub struct SweeperHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                log::warn!("Import map sweeper thread panicked");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = &self.thread {
            thread.thread().unpark();
        }
    }
}

/// Call `Configuration::sweep` every `interval` on a background thread.
/// A failed reload is logged and the previous map keeps being served.
pub fn spawn_sweeper(config: Arc<Configuration>, interval: Duration) -> SweeperHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let thread = thread::spawn(move || {
        while !flag.load(Ordering::Acquire) {
            if let Err(e) = config.sweep() {
                log::warn!("Import map reload failed, keeping previous map: {}", e);
            }
            thread::park_timeout(interval);
        }
        log::debug!("Import map sweeper stopped");
    });

    SweeperHandle {
        stop,
        thread: Some(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::PrefixResolver;
    use crate::engine::DirectiveFile;
    use std::fs;
    use std::path::Path;
    use std::time::Instant;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn configuration(root: &Path) -> Configuration {
        let source = MapSource::new(root).with_file(DirectiveFile::new(
            root.join("config/importmap.pins"),
            root,
        ));
        let mut sweeper = CacheSweeper::new().with_check_interval(Duration::ZERO);
        sweeper.watch(root.join("config"));
        sweeper.watch(root.join("app/javascript"));
        Configuration::new(source, PrefixResolver::default(), sweeper).unwrap()
    }

    #[test]
    fn test_sweep_reloads_only_on_change() {
        let dir = tempdir().unwrap();
        write(dir.path(), "config/importmap.pins", "pin \"app\"\n");
        let config = configuration(dir.path());

        assert!(!config.sweep().unwrap());
        assert_eq!(config.importmap().generation(), 0);

        write(dir.path(), "config/importmap.pins", "pin \"app\"\npin \"chart\"\n");
        fs::File::options()
            .write(true)
            .open(dir.path().join("config/importmap.pins"))
            .unwrap()
            .set_modified(std::time::SystemTime::now() + Duration::from_secs(10))
            .unwrap();
        assert!(config.sweep().unwrap());
        assert_eq!(config.importmap().generation(), 1);
        assert_eq!(
            config.to_json().unwrap(),
            r#"{"imports":{"app":"/assets/app.js","chart":"/assets/chart.js"}}"#
        );
    }

    #[test]
    fn test_to_json_with_other_resolver() {
        let dir = tempdir().unwrap();
        write(dir.path(), "config/importmap.pins", "pin \"app\", preload: true\n");
        let config = configuration(dir.path());

        let cdn = PrefixResolver::new("https://cdn.example.com");
        assert_eq!(
            config.to_json_with(&cdn).unwrap(),
            r#"{"imports":{"app":"https://cdn.example.com/app.js"}}"#
        );
        assert_eq!(config.preloaded_module_paths().unwrap(), vec!["/assets/app.js"]);
        assert_eq!(config.digest().unwrap().len(), 64);
    }

    #[test]
    fn test_check_published_map() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "config/importmap.pins",
            "pin \"app\"\npin \"app\", to: \"main.js\"\n",
        );
        let config = configuration(dir.path());

        let mut engine = config.check();
        assert_eq!(engine.warning_count(), 1);
        assert_eq!(engine.diagnostics()[0].code, "P0101");
        engine.clear();
        assert!(!engine.has_diagnostics());
    }

    #[test]
    fn test_background_sweeper_publishes_new_map() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().unwrap();
        write(dir.path(), "config/importmap.pins", "pin_all_from \"app/javascript\"\n");
        write(dir.path(), "app/javascript/one.js", "");
        let config = Arc::new(configuration(dir.path()));

        let handle = spawn_sweeper(Arc::clone(&config), Duration::from_millis(10));
        assert!(handle.is_running());
        write(dir.path(), "app/javascript/two.js", "");

        let deadline = Instant::now() + Duration::from_secs(5);
        while config.get_map().get("two").unwrap().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        handle.stop();

        assert_eq!(config.get_map().names().unwrap(), vec!["one", "two"]);
    }
}
