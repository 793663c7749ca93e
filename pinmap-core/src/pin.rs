// Concrete module-name-to-asset bindings and the naming rules behind them

/// Pins preload only when asked to
pub const DEFAULT_PRELOAD: bool = false;

/// File extensions picked up when expanding a directory
pub const MODULE_EXTENSIONS: &[&str] = &["js", "jsm"];

/// One resolved entry of an import map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    /// Logical specifier used in `import` statements
    pub name: String,
    /// Asset path handed to the asset resolver, or an absolute URL
    pub path: String,
    pub preload: bool,
}

impl Pin {
    pub fn new(name: impl Into<String>, path: impl Into<String>, preload: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            preload,
        }
    }

    /// Absolute URLs skip asset lookup and are emitted as written
    pub fn is_url(&self) -> bool {
        self.path.starts_with("https://")
            || self.path.starts_with("http://")
            || self.path.starts_with("//")
    }
}

/// `pin "name"` without `to:` points at `name.js`
pub fn default_path(name: &str) -> String {
    format!("{}.js", name)
}

/// Module name of a file found under a `pin_all_from` directory.
///
/// The extension is dropped, and so is a trailing `index` segment:
/// `widgets/index.js` under `components` becomes `components/widgets`.
pub fn module_name_from(relative: &str, under: Option<&str>) -> String {
    let stem = strip_module_extension(relative);
    let stem = if stem == "index" {
        ""
    } else {
        stem.strip_suffix("/index").unwrap_or(stem)
    };

    join_segments(&[under.unwrap_or_default(), stem])
}

/// Asset path of a file found under a `pin_all_from` directory
pub fn module_path_from(relative: &str, prefix: Option<&str>) -> String {
    join_segments(&[prefix.unwrap_or_default(), relative])
}

fn strip_module_extension(relative: &str) -> &str {
    MODULE_EXTENSIONS
        .iter()
        .find_map(|ext| {
            relative
                .strip_suffix(ext)
                .and_then(|rest| rest.strip_suffix('.'))
        })
        .unwrap_or(relative)
}

// Empty segments vanish; no doubled or leading/trailing slashes
fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
