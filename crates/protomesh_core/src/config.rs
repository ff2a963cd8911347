//! Conversion options.
//!
//! Every knob has a default matching the Webots PROTO conventions, so
//! `ConvertOptions::default()` is what the command-line tool uses unless a
//! JSON config file or a flag overrides it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Options controlling a single-document conversion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Node type whose body is extracted into a mesh file
    pub marker: String,

    /// Container types whose `DEF` name is offered to unnamed geometry below them
    pub ancestor_types: Vec<String>,

    /// Base name used for `name IS ...` and for meshes that never get a name
    pub default_base_name: String,

    /// Depth offsets (relative to a `name` field) at which unnamed meshes get claimed
    pub name_offsets: Vec<usize>,

    /// Run the normalization service on every written mesh
    pub smooth: bool,

    /// Suffix appended to the file stem of the smoothed mesh variant
    pub smooth_suffix: String,

    /// Stop extracting after this many consecutive blank lines (off by default)
    pub legacy_blank_line_limit: Option<usize>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            marker: "IndexedFaceSet".to_string(),
            ancestor_types: vec![
                "Group".to_string(),
                "Transform".to_string(),
                "Shape".to_string(),
            ],
            default_base_name: "base_link".to_string(),
            name_offsets: vec![2, 4],
            smooth: true,
            smooth_suffix: "_SMOOTH".to_string(),
            legacy_blank_line_limit: None,
        }
    }
}

impl ConvertOptions {
    /// Parse options from a JSON string. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject option sets the extractor cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marker.trim().is_empty() {
            return Err(ConfigError::Invalid("marker must not be empty".to_string()));
        }
        if self.default_base_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_base_name must not be empty".to_string(),
            ));
        }
        if self.smooth && self.smooth_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "smooth_suffix must not be empty when smoothing is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `token` names a container whose `DEF` can name nested geometry.
    pub fn is_ancestor_type(&self, token: &str) -> bool {
        self.ancestor_types.iter().any(|t| t == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConvertOptions::default();
        assert_eq!(options.marker, "IndexedFaceSet");
        assert_eq!(options.name_offsets, vec![2, 4]);
        assert!(options.is_ancestor_type("Transform"));
        assert!(!options.is_ancestor_type("Solid"));
        assert!(options.legacy_blank_line_limit.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options =
            ConvertOptions::from_json_str(r#"{ "smooth": false, "default_base_name": "body" }"#)
                .unwrap();
        assert!(!options.smooth);
        assert_eq!(options.default_base_name, "body");
        assert_eq!(options.marker, "IndexedFaceSet");
    }

    #[test]
    fn test_rejects_empty_marker() {
        let result = ConvertOptions::from_json_str(r#"{ "marker": "" }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = ConvertOptions::from_json_str("{ smooth: ");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }
}
