// pinmap-core - import maps for engines that ship JavaScript modules
// Directive files in, `{"imports": {...}}` out

pub mod asset;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod expand;
pub mod manifest;
pub mod map;
pub mod pin;
pub mod reload;

pub use asset::{AssetNotFound, AssetResolver, DigestResolver, PrefixResolver};
pub use config::{spawn_sweeper, Configuration, SweeperHandle};
pub use document::ImportMapDocument;
pub use engine::{DirectiveFile, Engine, Host, HostRegistry};
pub use error::{PinmapError, Result};
pub use expand::DirectoryExpansion;
pub use manifest::EngineManifest;
pub use map::{DuplicatePolicy, ImportMap, MissingAssetPolicy};
pub use pin::Pin;
pub use reload::{CacheSweeper, MapSource, SharedImportMap};

pub use pinmap_diagnostics::{Diagnostic, DiagnosticEngine};
pub use pinmap_parser::{Directive, PinAllDirective, PinDirective};

/// Default location of an engine's directive file, relative to its root
pub const DEFAULT_IMPORTMAP_PATH: &str = "config/importmap.pins";
