// Errors raised while loading, expanding and resolving import maps

use crate::asset::AssetNotFound;
use pinmap_diagnostics::{error_codes, Diagnostic, Span};
use pinmap_parser::{ParseError, SourceLocation};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PinmapError {
    /// Malformed directive file; fatal, no partial map is served
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan {}: {source}", directory.display())]
    Walk {
        directory: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Raised instead of last-wins replacement under `DuplicatePolicy::Reject`
    #[error("`{name}` is pinned more than once (first at {first}, again at {second})")]
    DuplicateName {
        name: String,
        first: SourceLocation,
        second: SourceLocation,
    },

    /// A directive built in code with a blank name or directory
    #[error("{what} cannot be empty (at {location})")]
    EmptyName {
        what: &'static str,
        location: SourceLocation,
    },

    #[error(transparent)]
    AssetNotFound(#[from] AssetNotFound),

    #[error("Failed to serialize import map: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PinmapError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PinmapError::Parse(e) => e.to_diagnostic(),
            PinmapError::Io { path, .. } => Diagnostic::error(
                error_codes::UNREADABLE_SOURCE,
                self.to_string(),
                Span::from_path(path),
            ),
            PinmapError::Walk { directory, .. } => Diagnostic::error(
                error_codes::UNREADABLE_SOURCE,
                self.to_string(),
                Span::from_path(directory),
            ),
            PinmapError::DuplicateName {
                name,
                first,
                second,
            } => Diagnostic::error(
                error_codes::DUPLICATE_PIN,
                format!("`{}` is pinned more than once", name),
                second.to_span(),
            )
            .with_note(format!("first pinned at {}", first)),
            PinmapError::EmptyName { what, location } => Diagnostic::error(
                error_codes::EMPTY_NAME,
                format!("{} cannot be empty", what),
                location.to_span(),
            ),
            PinmapError::AssetNotFound(missing) => Diagnostic::error(
                error_codes::MISSING_ASSET,
                missing.to_string(),
                Span::unknown(),
            ),
            PinmapError::Serialize(_) => Diagnostic::error(
                error_codes::UNREADABLE_SOURCE,
                self.to_string(),
                Span::unknown(),
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, PinmapError>;
