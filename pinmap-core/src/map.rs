// The resolver map: directives in file order, expanded and resolved on demand

use crate::asset::{AssetNotFound, AssetResolver};
use crate::document::ImportMapDocument;
use crate::error::{PinmapError, Result};
use crate::expand::DirectoryExpansion;
use crate::pin::{default_path, Pin, DEFAULT_PRELOAD};
use indexmap::IndexMap;
use pinmap_diagnostics::{error_codes, Diagnostic, DiagnosticEngine, ErrorLevel};
use pinmap_parser::{Directive, Parser, PinAllDirective, PinDirective, SourceLocation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// What happens when a name is bound twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later binding replaces the earlier one and keeps its position
    #[default]
    LastWins,
    /// Any repeated name is a `PinmapError::DuplicateName`
    Reject,
}

/// What happens when the asset resolver has no file for a pin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingAssetPolicy {
    /// Leave the entry out, log a warning and list it in `skipped`
    #[default]
    Skip,
    /// Fail the whole resolution
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntryKey {
    Pin(String),
    Directory { directory: PathBuf, under: String },
}

impl EntryKey {
    fn name(&self) -> String {
        match self {
            EntryKey::Pin(name) => name.clone(),
            EntryKey::Directory { directory, .. } => directory.display().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Pin(Pin),
    Directory(DirectoryExpansion),
}

#[derive(Debug, Clone)]
struct Slot {
    entry: Entry,
    location: SourceLocation,
    // Earlier directives with the same key, replaced under last-wins
    replaced: Vec<SourceLocation>,
}

/// Ordered module-name map built by replaying directives.
///
/// Directory pins are expanded the first time the pins are needed and the
/// result is kept for the lifetime of this value. Any mutation drops it.
#[derive(Debug, Clone)]
pub struct ImportMap {
    root: PathBuf,
    slots: IndexMap<EntryKey, Slot>,
    duplicates: DuplicatePolicy,
    missing_assets: MissingAssetPolicy,
    expanded: OnceLock<IndexMap<String, Pin>>,
}

impl ImportMap {
    /// Empty map; relative `pin_all_from` directories resolve against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            slots: IndexMap::new(),
            duplicates: DuplicatePolicy::default(),
            missing_assets: MissingAssetPolicy::default(),
            expanded: OnceLock::new(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_missing_asset_policy(mut self, policy: MissingAssetPolicy) -> Self {
        self.missing_assets = policy;
        self
    }

    /// Build a map from directive records in one go
    pub fn from_directives<I>(root: impl Into<PathBuf>, directives: I) -> Result<Self>
    where
        I: IntoIterator<Item = Directive>,
    {
        let mut map = Self::new(root);
        map.load_directives(directives)?;
        Ok(map)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    pub fn missing_asset_policy(&self) -> MissingAssetPolicy {
        self.missing_assets
    }

    /// Parse and replay a directive file
    pub fn draw<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let root = self.root.clone();
        self.draw_in(path.as_ref(), &root)
    }

    /// Like `draw`, with relative directories resolved against `root`
    pub fn draw_in(&mut self, path: &Path, root: &Path) -> Result<()> {
        let source = fs::read_to_string(path).map_err(|source| PinmapError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("Drawing import map from {}", path.display());
        let directives = Parser::new_with_file(&path.display().to_string(), &source)?.parse()?;
        self.replay(directives, root)
    }

    /// Parse and replay directives held in memory; `file` labels errors
    pub fn draw_source(&mut self, file: &str, source: &str) -> Result<()> {
        let directives = Parser::new_with_file(file, source)?.parse()?;
        let root = self.root.clone();
        self.replay(directives, &root)
    }

    /// Replay directive records top to bottom
    pub fn load_directives<I>(&mut self, directives: I) -> Result<()>
    where
        I: IntoIterator<Item = Directive>,
    {
        let root = self.root.clone();
        self.replay(directives, &root)
    }

    fn replay<I>(&mut self, directives: I, root: &Path) -> Result<()>
    where
        I: IntoIterator<Item = Directive>,
    {
        // All or nothing: a failing directive drops the whole batch
        let committed = self.slots.clone();
        for directive in directives {
            let replayed = match directive {
                Directive::Pin(pin) => self.pin(pin),
                Directive::PinAll(pin_all) => self.pin_all_from_in(pin_all, root),
            };
            if let Err(e) = replayed {
                self.slots = committed;
                self.expanded = OnceLock::new();
                return Err(e);
            }
        }
        Ok(())
    }

    /// `pin "name", to: "file.js", preload: true`
    pub fn pin(&mut self, directive: PinDirective) -> Result<()> {
        if directive.name.trim().is_empty() {
            return Err(PinmapError::EmptyName {
                what: "module name",
                location: directive.location,
            });
        }

        let pin = Pin {
            path: directive.to.unwrap_or_else(|| default_path(&directive.name)),
            name: directive.name,
            preload: directive.preload.unwrap_or(DEFAULT_PRELOAD),
        };

        self.insert(
            EntryKey::Pin(pin.name.clone()),
            Slot {
                entry: Entry::Pin(pin),
                location: directive.location,
                replaced: Vec::new(),
            },
        )
    }

    /// `pin_all_from "dir", under: "prefix", to: "asset/prefix"`
    pub fn pin_all_from(&mut self, directive: PinAllDirective) -> Result<()> {
        let root = self.root.clone();
        self.pin_all_from_in(directive, &root)
    }

    fn pin_all_from_in(&mut self, directive: PinAllDirective, root: &Path) -> Result<()> {
        if directive.directory.trim().is_empty() {
            return Err(PinmapError::EmptyName {
                what: "directory",
                location: directive.location,
            });
        }

        let directory = root.join(&directive.directory);

        let mut expansion = DirectoryExpansion::new(&directory)
            .preload(directive.preload.unwrap_or(DEFAULT_PRELOAD));
        if let Some(under) = directive.under.clone() {
            expansion = expansion.under(under);
        }
        if let Some(to) = directive.to {
            expansion = expansion.to(to);
        }

        self.insert(
            EntryKey::Directory {
                directory,
                under: directive.under.unwrap_or_default(),
            },
            Slot {
                entry: Entry::Directory(expansion),
                location: directive.location,
                replaced: Vec::new(),
            },
        )
    }

    fn insert(&mut self, key: EntryKey, mut slot: Slot) -> Result<()> {
        if let Some(existing) = self.slots.get(&key) {
            if self.duplicates == DuplicatePolicy::Reject {
                return Err(PinmapError::DuplicateName {
                    name: key.name(),
                    first: existing.location.clone(),
                    second: slot.location,
                });
            }
            slot.replaced = existing.replaced.clone();
            slot.replaced.push(existing.location.clone());
        }

        self.expanded = OnceLock::new();
        // IndexMap keeps the first position of a replaced key
        self.slots.insert(key, slot);
        Ok(())
    }

    /// Number of directives held (directory pins count once)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every concrete pin, directories expanded, in map order
    pub fn pins(&self) -> Result<impl Iterator<Item = &Pin>> {
        Ok(self.expanded()?.values())
    }

    pub fn names(&self) -> Result<Vec<&str>> {
        Ok(self.expanded()?.keys().map(String::as_str).collect())
    }

    pub fn get(&self, name: &str) -> Result<Option<&Pin>> {
        Ok(self.expanded()?.get(name))
    }

    fn expanded(&self) -> Result<&IndexMap<String, Pin>> {
        if let Some(expanded) = self.expanded.get() {
            return Ok(expanded);
        }

        let expanded = self.expand(&mut Vec::new())?;
        // A racing thread may have set it first; both results are equal
        let _ = self.expanded.set(expanded);
        self.expanded.get().ok_or_else(unreachable_expansion)
    }

    fn expand<'a>(&'a self, overrides: &mut Vec<Override<'a>>) -> Result<IndexMap<String, Pin>> {
        let mut pins: IndexMap<String, Pin> = IndexMap::new();
        let mut origins: IndexMap<String, &SourceLocation> = IndexMap::new();

        for slot in self.slots.values() {
            match &slot.entry {
                Entry::Pin(pin) => {
                    self.bind(&mut pins, &mut origins, overrides, pin.clone(), &slot.location)?;
                }
                Entry::Directory(expansion) => {
                    let mut count = 0;
                    for pin in expansion.iter() {
                        self.bind(&mut pins, &mut origins, overrides, pin?, &slot.location)?;
                        count += 1;
                    }
                    log::debug!(
                        "Expanded {} into {} pin(s)",
                        expansion.directory().display(),
                        count
                    );
                }
            }
        }

        Ok(pins)
    }

    fn bind<'a>(
        &self,
        pins: &mut IndexMap<String, Pin>,
        origins: &mut IndexMap<String, &'a SourceLocation>,
        overrides: &mut Vec<Override<'a>>,
        pin: Pin,
        location: &'a SourceLocation,
    ) -> Result<()> {
        if let Some(first) = origins.get(&pin.name).copied() {
            if self.duplicates == DuplicatePolicy::Reject {
                return Err(PinmapError::DuplicateName {
                    name: pin.name,
                    first: first.clone(),
                    second: location.clone(),
                });
            }
            overrides.push(Override {
                name: pin.name.clone(),
                first,
                second: location,
            });
        }

        origins.insert(pin.name.clone(), location);
        pins.insert(pin.name.clone(), pin);
        Ok(())
    }

    /// Resolve every pin through `resolver` into an import-map document
    pub fn resolve(&self, resolver: &dyn AssetResolver) -> Result<ImportMapDocument> {
        let mut document = ImportMapDocument::new();

        for pin in self.pins()? {
            match self.lookup(pin, resolver)? {
                Some(url) => {
                    document.imports.insert(pin.name.clone(), url);
                }
                None => document.skipped.push(pin.name.clone()),
            }
        }

        Ok(document)
    }

    /// Compact JSON of the resolved document
    pub fn to_json(&self, resolver: &dyn AssetResolver) -> Result<String> {
        self.resolve(resolver)?.to_json()
    }

    /// URLs of pins marked `preload`, in map order
    pub fn preloaded_module_paths(&self, resolver: &dyn AssetResolver) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for pin in self.pins()?.filter(|pin| pin.preload) {
            if let Some(url) = self.lookup(pin, resolver)? {
                paths.push(url);
            }
        }
        Ok(paths)
    }

    /// Digest of the resolved document, changes whenever any URL changes
    pub fn digest(&self, resolver: &dyn AssetResolver) -> Result<String> {
        self.resolve(resolver)?.digest()
    }

    /// Report every overridden name and every missing asset without failing.
    ///
    /// Errors that stop the map from expanding at all are reported too.
    pub fn check(&self, resolver: &dyn AssetResolver) -> DiagnosticEngine {
        let mut engine = DiagnosticEngine::new();

        let mut overrides = Vec::new();
        let pins = match self.expand(&mut overrides) {
            Ok(pins) => pins,
            Err(e) => {
                engine.emit(e.to_diagnostic());
                return engine;
            }
        };

        for (key, slot) in &self.slots {
            for first in &slot.replaced {
                overrides.push(Override {
                    name: key.name(),
                    first,
                    second: &slot.location,
                });
            }
        }

        for shadowed in &overrides {
            engine.emit(
                Diagnostic::warning(
                    error_codes::DUPLICATE_PIN,
                    format!("`{}` is pinned more than once, the last pin wins", shadowed.name),
                    shadowed.second.to_span(),
                )
                .with_note(format!("first pinned at {}", shadowed.first)),
            );
        }

        for pin in pins.values().filter(|pin| !pin.is_url()) {
            let missing = match resolver.asset_path(&pin.path) {
                Ok(url) if !url.is_empty() => continue,
                Ok(_) => AssetNotFound::new(pin.path.clone()),
                Err(missing) => missing,
            };
            let diagnostic = PinmapError::AssetNotFound(missing).to_diagnostic();
            engine.emit(match self.missing_assets {
                MissingAssetPolicy::Skip => Diagnostic {
                    level: ErrorLevel::Warning,
                    ..diagnostic
                },
                MissingAssetPolicy::Abort => diagnostic,
            }
            .with_help(format!("`{}` is left out of the import map", pin.name)));
        }

        engine
    }

    // Ok(None) means "skipped" under MissingAssetPolicy::Skip
    fn lookup(&self, pin: &Pin, resolver: &dyn AssetResolver) -> Result<Option<String>> {
        if pin.is_url() {
            return Ok(Some(pin.path.clone()));
        }

        let missing = match resolver.asset_path(&pin.path) {
            Ok(url) if !url.is_empty() => return Ok(Some(url)),
            Ok(_) => AssetNotFound::new(pin.path.clone()),
            Err(missing) => missing,
        };

        match self.missing_assets {
            MissingAssetPolicy::Skip => {
                log::warn!(
                    "Importmap skipped missing path: {} (pinned as `{}`)",
                    missing.path,
                    pin.name
                );
                Ok(None)
            }
            MissingAssetPolicy::Abort => Err(missing.into()),
        }
    }
}

// A name bound again by a later directive
struct Override<'a> {
    name: String,
    first: &'a SourceLocation,
    second: &'a SourceLocation,
}

// OnceLock::get after a set (ours or a racing thread's) always succeeds
fn unreachable_expansion() -> PinmapError {
    PinmapError::Io {
        path: PathBuf::new(),
        source: std::io::Error::other("import map expansion was not recorded"),
    }
}
