// Engines and the hosts they register with

use crate::asset::DigestResolver;
use crate::error::Result;
use crate::manifest::EngineManifest;
use crate::map::{DuplicatePolicy, ImportMap, MissingAssetPolicy};
use crate::reload::{CacheSweeper, MapSource};
use crate::DEFAULT_IMPORTMAP_PATH;
use std::path::{Path, PathBuf};

/// A directive file and the root its relative directories resolve against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveFile {
    pub path: PathBuf,
    pub root: PathBuf,
}

impl DirectiveFile {
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
        }
    }
}

/// What an engine needs from the application it is mounted in
pub trait Host {
    /// Directory searched by the asset pipeline
    fn add_asset_path(&mut self, path: PathBuf);

    /// Directive file drawn into the application's import map
    fn add_importmap(&mut self, file: DirectiveFile);

    /// Directory whose changes should reload the import map
    fn add_cache_sweeper(&mut self, path: PathBuf);
}

/// A packaged set of JavaScript modules and the directives that pin them
#[derive(Debug, Clone)]
pub struct Engine {
    root: PathBuf,
    manifest: EngineManifest,
}

impl Engine {
    /// Engine at `root`, configured by its pinmap.json if there is one
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        let manifest = EngineManifest::from_dir(&root)?;
        Ok(Self { root, manifest })
    }

    pub fn from_manifest(root: impl Into<PathBuf>, manifest: EngineManifest) -> Self {
        Self {
            root: root.into(),
            manifest,
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &EngineManifest {
        &self.manifest
    }

    pub fn asset_paths(&self) -> Vec<PathBuf> {
        self.manifest
            .asset_paths
            .iter()
            .map(|path| self.root.join(path))
            .collect()
    }

    pub fn directive_file(&self) -> DirectiveFile {
        DirectiveFile::new(self.root.join(&self.manifest.importmap), &self.root)
    }

    pub fn sweeper_paths(&self) -> Vec<PathBuf> {
        self.manifest
            .cache_sweepers
            .iter()
            .map(|path| self.root.join(path))
            .collect()
    }

    /// Run the `<name>.assets` and `<name>.importmap` initializers against `host`
    pub fn install<H: Host + ?Sized>(&self, host: &mut H) {
        log::info!("Running initializer {}.assets", self.name());
        for path in self.asset_paths() {
            host.add_asset_path(path);
        }

        log::info!("Running initializer {}.importmap", self.name());
        host.add_importmap(self.directive_file());
        for path in self.sweeper_paths() {
            host.add_cache_sweeper(path);
        }
    }

    /// Everything needed to (re)build this engine's own map
    pub fn map_source(&self) -> MapSource {
        let mut source = MapSource::new(&self.root).with_file(self.directive_file());
        source.duplicates = self.manifest.duplicates;
        source.missing_assets = self.manifest.missing_assets;
        source
    }

    /// This engine's map on its own, without a host
    pub fn draw_importmap(&self) -> Result<ImportMap> {
        self.map_source().build()
    }

    /// Fingerprinting resolver over this engine's asset paths
    pub fn asset_resolver(&self) -> DigestResolver {
        self.asset_paths().into_iter().fold(
            DigestResolver::new(&self.manifest.asset_prefix),
            DigestResolver::with_load_path,
        )
    }

    pub fn cache_sweeper(&self) -> CacheSweeper {
        let mut sweeper = CacheSweeper::new();
        sweeper.watch(self.directive_file().path);
        for path in self.sweeper_paths() {
            sweeper.watch(path);
        }
        sweeper
    }
}

/// A host application that records what engines register, in order.
///
/// The host's own directive file and asset path come first, so engines
/// installed later override its pins.
#[derive(Debug, Clone)]
pub struct HostRegistry {
    root: PathBuf,
    asset_prefix: String,
    asset_paths: Vec<PathBuf>,
    importmaps: Vec<DirectiveFile>,
    cache_sweepers: Vec<PathBuf>,
    duplicates: DuplicatePolicy,
    missing_assets: MissingAssetPolicy,
}

impl HostRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut host = Self {
            asset_prefix: "/assets".to_string(),
            asset_paths: Vec::new(),
            importmaps: Vec::new(),
            cache_sweepers: Vec::new(),
            duplicates: DuplicatePolicy::default(),
            missing_assets: MissingAssetPolicy::default(),
            root,
        };

        host.add_asset_path(host.root.join("app/javascript"));
        host.add_importmap(DirectiveFile::new(
            host.root.join(DEFAULT_IMPORTMAP_PATH),
            host.root.clone(),
        ));
        host
    }

    pub fn with_asset_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.asset_prefix = prefix.into();
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_missing_asset_policy(mut self, policy: MissingAssetPolicy) -> Self {
        self.missing_assets = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn asset_paths(&self) -> &[PathBuf] {
        &self.asset_paths
    }

    pub fn importmaps(&self) -> &[DirectiveFile] {
        &self.importmaps
    }

    pub fn cache_sweepers(&self) -> &[PathBuf] {
        &self.cache_sweepers
    }

    pub fn map_source(&self) -> MapSource {
        MapSource {
            root: self.root.clone(),
            files: self.importmaps.clone(),
            duplicates: self.duplicates,
            missing_assets: self.missing_assets,
        }
    }

    /// Every registered directive file drawn in registration order
    pub fn build_importmap(&self) -> Result<ImportMap> {
        self.map_source().build()
    }

    /// Fingerprinting resolver; the host's own assets shadow engine assets
    pub fn asset_resolver(&self) -> DigestResolver {
        self.asset_paths.iter().fold(
            DigestResolver::new(&self.asset_prefix),
            |resolver, path| resolver.with_load_path(path),
        )
    }

    /// Poller over the cache sweepers and every directive file
    pub fn cache_sweeper(&self) -> CacheSweeper {
        let mut sweeper = CacheSweeper::new();
        for file in &self.importmaps {
            sweeper.watch(&file.path);
        }
        for path in &self.cache_sweepers {
            sweeper.watch(path);
        }
        sweeper
    }
}

impl Host for HostRegistry {
    fn add_asset_path(&mut self, path: PathBuf) {
        if !self.asset_paths.contains(&path) {
            log::debug!("Asset path {}", path.display());
            self.asset_paths.push(path);
        }
    }

    fn add_importmap(&mut self, file: DirectiveFile) {
        if !self.importmaps.contains(&file) {
            log::debug!("Import map {}", file.path.display());
            self.importmaps.push(file);
        }
    }

    fn add_cache_sweeper(&mut self, path: PathBuf) {
        if !self.cache_sweepers.contains(&path) {
            self.cache_sweepers.push(path);
        }
    }
}
