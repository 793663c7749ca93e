// Asset lookup: turns a pinned asset path into the URL a browser loads

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// The asset pipeline has no file for `path`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("asset not found: {path}")]
pub struct AssetNotFound {
    pub path: String,
}

impl AssetNotFound {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Collaborator supplied by the host asset pipeline
pub trait AssetResolver {
    fn asset_path(&self, path: &str) -> Result<String, AssetNotFound>;
}

impl<F> AssetResolver for F
where
    F: Fn(&str) -> Result<String, AssetNotFound>,
{
    fn asset_path(&self, path: &str) -> Result<String, AssetNotFound> {
        self(path)
    }
}

/// Mounts every path under a fixed prefix without checking the disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixResolver {
    prefix: String,
}

impl PrefixResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for PrefixResolver {
    fn default() -> Self {
        Self::new("/assets")
    }
}

impl AssetResolver for PrefixResolver {
    fn asset_path(&self, path: &str) -> Result<String, AssetNotFound> {
        Ok(format!("{}/{}", self.prefix, path.trim_start_matches('/')))
    }
}

/// Finds assets in load paths and serves them under fingerprinted names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResolver {
    prefix: String,
    load_paths: Vec<PathBuf>,
}

impl DigestResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            load_paths: Vec::new(),
        }
    }

    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.add_load_path(path);
        self
    }

    pub fn add_load_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.load_paths.contains(&path) {
            self.load_paths.push(path);
        }
    }

    pub fn load_paths(&self) -> &[PathBuf] {
        &self.load_paths
    }

    /// First load path holding `path`; earlier load paths shadow later ones
    pub fn find(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        self.load_paths
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.is_file())
    }
}

impl AssetResolver for DigestResolver {
    fn asset_path(&self, path: &str) -> Result<String, AssetNotFound> {
        let file = self.find(path).ok_or_else(|| AssetNotFound::new(path))?;

        let content = fs::read(&file).map_err(|e| {
            log::debug!("Unreadable asset {}: {}", file.display(), e);
            AssetNotFound::new(path)
        })?;
        let digest = format!("{:x}", Sha256::digest(&content));

        Ok(format!(
            "{}/{}",
            self.prefix,
            digested_name(path.trim_start_matches('/'), digest.get(..16).unwrap_or(&digest))
        ))
    }
}

/// `controllers/foo.js` + `abc` -> `controllers/foo-abc.js`
fn digested_name(path: &str, digest: &str) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };

    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, digest, ext),
        _ => format!("{}-{}", file, digest),
    };

    match dir {
        Some(dir) => format!("{}/{}", dir, file),
        None => file,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prefix_resolver() {
        let resolver = PrefixResolver::new("/assets/");
        assert_eq!(
            resolver.asset_path("controllers/foo_controller.js").unwrap(),
            "/assets/controllers/foo_controller.js"
        );
        assert_eq!(
            PrefixResolver::default().asset_path("/application.js").unwrap(),
            "/assets/application.js"
        );
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |path: &str| -> Result<String, AssetNotFound> {
            if path.ends_with(".js") {
                Ok(format!("/static/{}", path))
            } else {
                Err(AssetNotFound::new(path))
            }
        };

        assert_eq!(resolver.asset_path("app.js").unwrap(), "/static/app.js");
        assert_eq!(
            resolver.asset_path("app.css").unwrap_err(),
            AssetNotFound::new("app.css")
        );
    }

    #[test]
    fn test_digested_name() {
        assert_eq!(digested_name("controllers/foo.js", "abc"), "controllers/foo-abc.js");
        assert_eq!(digested_name("stimulus.min.js", "abc"), "stimulus.min-abc.js");
        assert_eq!(digested_name("LICENSE", "abc"), "LICENSE-abc");
        assert_eq!(digested_name(".hidden", "abc"), ".hidden-abc");
    }

    #[test]
    fn test_digest_resolver_fingerprints_existing_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("blogh")).unwrap();
        std::fs::write(dir.path().join("blogh/application.js"), "console.log(1)").unwrap();

        let resolver = DigestResolver::new("/assets").with_load_path(dir.path());
        let url = resolver.asset_path("blogh/application.js").unwrap();

        assert!(url.starts_with("/assets/blogh/application-"));
        assert!(url.ends_with(".js"));
        assert_eq!(url.len(), "/assets/blogh/application-.js".len() + 16);

        // Same content, same fingerprint
        assert_eq!(resolver.asset_path("blogh/application.js").unwrap(), url);
    }

    #[test]
    fn test_digest_resolver_missing_and_escaping_paths() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("secret.js"), "x").unwrap();
        let nested = dir.path().join("public");
        std::fs::create_dir_all(&nested).unwrap();

        let resolver = DigestResolver::new("/assets").with_load_path(&nested);

        assert_eq!(
            resolver.asset_path("missing.js").unwrap_err(),
            AssetNotFound::new("missing.js")
        );
        assert!(resolver.asset_path("../secret.js").is_err());
    }

    #[test]
    fn test_earlier_load_path_wins() {
        let engine = tempdir().unwrap();
        let app = tempdir().unwrap();
        std::fs::write(engine.path().join("app.js"), "engine").unwrap();
        std::fs::write(app.path().join("app.js"), "app").unwrap();

        let resolver = DigestResolver::new("/assets")
            .with_load_path(app.path())
            .with_load_path(engine.path());

        assert_eq!(resolver.find("app.js"), Some(app.path().join("app.js")));
    }
}
