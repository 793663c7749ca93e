// Directory pins: one Pin per module file below a directory

use crate::error::{PinmapError, Result};
use crate::pin::{module_name_from, module_path_from, Pin, DEFAULT_PRELOAD, MODULE_EXTENSIONS};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A `pin_all_from` directory and the naming applied to its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryExpansion {
    directory: PathBuf,
    under: Option<String>,
    to: Option<String>,
    preload: bool,
}

impl DirectoryExpansion {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            under: None,
            to: None,
            preload: DEFAULT_PRELOAD,
        }
    }

    pub fn under(mut self, under: impl Into<String>) -> Self {
        self.under = Some(under.into());
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn under_prefix(&self) -> Option<&str> {
        self.under.as_deref()
    }

    /// Asset-path prefix: `to`, falling back to `under`
    pub fn path_prefix(&self) -> Option<&str> {
        self.to.as_deref().or(self.under.as_deref())
    }

    /// Walk the directory lazily. Each call starts a fresh walk.
    ///
    /// Within a directory, files come first sorted by name, then
    /// subdirectories sorted by name, recursively. A directory that does
    /// not exist expands to nothing.
    pub fn iter(&self) -> Expand<'_> {
        let walker = if self.directory.is_dir() {
            Some(
                WalkDir::new(&self.directory)
                    .min_depth(1)
                    .follow_links(true)
                    .sort_by(files_then_directories)
                    .into_iter(),
            )
        } else {
            log::debug!(
                "pin_all_from directory {} does not exist, nothing to pin",
                self.directory.display()
            );
            None
        };

        Expand {
            expansion: self,
            walker,
        }
    }

    fn pin_for(&self, entry: &DirEntry) -> Option<Pin> {
        if !entry.file_type().is_file() || !is_module_file(entry.path()) {
            return None;
        }

        let relative = entry.path().strip_prefix(&self.directory).ok()?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let name = module_name_from(&relative, self.under.as_deref());
        if name.is_empty() {
            log::debug!(
                "Skipping {}: an index file needs `under:` to have a module name",
                entry.path().display()
            );
            return None;
        }

        Some(Pin {
            name,
            path: module_path_from(&relative, self.path_prefix()),
            preload: self.preload,
        })
    }
}

impl<'a> IntoIterator for &'a DirectoryExpansion {
    type Item = Result<Pin>;
    type IntoIter = Expand<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy walk over one directory pin
pub struct Expand<'a> {
    expansion: &'a DirectoryExpansion,
    walker: Option<walkdir::IntoIter>,
}

impl Iterator for Expand<'_> {
    type Item = Result<Pin>;

    fn next(&mut self) -> Option<Self::Item> {
        let walker = self.walker.as_mut()?;

        loop {
            match walker.next()? {
                Ok(entry) => {
                    if let Some(pin) = self.expansion.pin_for(&entry) {
                        return Some(Ok(pin));
                    }
                }
                Err(source) => {
                    return Some(Err(PinmapError::Walk {
                        directory: self.expansion.directory.clone(),
                        source,
                    }))
                }
            }
        }
    }
}

fn files_then_directories(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext))
}
