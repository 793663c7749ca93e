// Engine manifest - pinmap.json

use crate::map::{DuplicatePolicy, MissingAssetPolicy};
use crate::DEFAULT_IMPORTMAP_PATH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name looked up in an engine root
pub const MANIFEST_FILE: &str = "pinmap.json";

/// Per-engine settings (pinmap.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineManifest {
    pub name: String,

    /// Directories registered with the host asset pipeline
    #[serde(default = "default_asset_paths")]
    pub asset_paths: Vec<String>,

    /// Directive file, relative to the engine root
    #[serde(default = "default_importmap")]
    pub importmap: String,

    /// Directories whose changes trigger an import-map reload
    #[serde(default = "default_asset_paths")]
    pub cache_sweepers: Vec<String>,

    #[serde(default = "default_asset_prefix")]
    pub asset_prefix: String,

    #[serde(default)]
    pub duplicates: DuplicatePolicy,

    #[serde(default)]
    pub missing_assets: MissingAssetPolicy,
}

fn default_asset_paths() -> Vec<String> {
    vec!["app/javascript".to_string()]
}

fn default_importmap() -> String {
    DEFAULT_IMPORTMAP_PATH.to_string()
}

fn default_asset_prefix() -> String {
    "/assets".to_string()
}

impl EngineManifest {
    /// Defaults for an engine called `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asset_paths: default_asset_paths(),
            importmap: default_importmap(),
            cache_sweepers: default_asset_paths(),
            asset_prefix: default_asset_prefix(),
            duplicates: DuplicatePolicy::default(),
            missing_assets: MissingAssetPolicy::default(),
        }
    }

    /// Parse pinmap.json from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        Self::from_str(&content)
            .with_context(|| format!("Invalid manifest {}", path.as_ref().display()))
    }

    /// Parse pinmap.json from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let manifest: EngineManifest =
            serde_json::from_str(content).context("Failed to parse pinmap.json")?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Manifest of the engine rooted at `root`.
    ///
    /// Without a pinmap.json the defaults apply and the engine is named
    /// after its root directory.
    pub fn from_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let path = root.join(MANIFEST_FILE);
        if path.is_file() {
            return Self::from_file(path);
        }

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .with_context(|| format!("Cannot name an engine rooted at {}", root.display()))?;

        log::debug!("No {} in {}, using defaults", MANIFEST_FILE, root.display());
        Ok(Self::named(name))
    }

    /// Write manifest to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Engine name cannot be empty");
        }

        let absolute_url = ["http://", "https://", "//"]
            .iter()
            .any(|scheme| self.asset_prefix.starts_with(scheme));
        if !self.asset_prefix.starts_with('/') && !absolute_url {
            anyhow::bail!(
                "Asset prefix must start with '/' or be an absolute URL: {}",
                self.asset_prefix
            );
        }

        if self.importmap.trim().is_empty() {
            anyhow::bail!("Import map path cannot be empty");
        }

        Ok(())
    }
}

impl Default for EngineManifest {
    fn default() -> Self {
        Self::named("engine")
    }
}
