// The JSON document a browser-side module loader consumes

use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// `{"imports": {"name": "url", ...}}` with keys in pin order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMapDocument {
    pub imports: IndexMap<String, String>,

    /// Names left out because their asset could not be found
    #[serde(skip)]
    pub skipped: Vec<String>,
}

impl ImportMapDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document produced by `to_json` (or any import map)
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Compact form; byte-identical for identical inputs
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the compact JSON, suitable as an ETag
    pub fn digest(&self) -> Result<String> {
        let json = self.to_json()?;
        Ok(format!("{:x}", Sha256::digest(json.as_bytes())))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.imports.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.imports.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImportMapDocument {
        let mut document = ImportMapDocument::new();
        document
            .imports
            .insert("app".to_string(), "/assets/application.js".to_string());
        document.imports.insert(
            "@hotwired/stimulus".to_string(),
            "/assets/stimulus.min.js".to_string(),
        );
        document
    }

    #[test]
    fn test_compact_json_keeps_insertion_order() {
        assert_eq!(
            sample().to_json().unwrap(),
            r#"{"imports":{"app":"/assets/application.js","@hotwired/stimulus":"/assets/stimulus.min.js"}}"#
        );
    }

    #[test]
    fn test_pretty_json() {
        let pretty = sample().to_json_pretty().unwrap();
        assert!(pretty.starts_with("{\n  \"imports\": {\n    \"app\""));
        assert!(!pretty.ends_with('\n'));
    }

    #[test]
    fn test_skipped_names_are_not_serialized() {
        let mut document = sample();
        document.skipped.push("missing".to_string());

        let json = document.to_json().unwrap();
        assert!(!json.contains("missing"));

        let parsed = ImportMapDocument::from_json(&json).unwrap();
        assert_eq!(parsed.names().collect::<Vec<_>>(), vec!["app", "@hotwired/stimulus"]);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_digest_tracks_content() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
        assert_eq!(a.digest().unwrap().len(), 64);

        b.imports
            .insert("app".to_string(), "/assets/application-2.js".to_string());
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn test_empty_document() {
        let document = ImportMapDocument::new();
        assert!(document.is_empty());
        assert_eq!(document.to_json().unwrap(), r#"{"imports":{}}"#);
    }
}
