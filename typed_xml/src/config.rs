use std::path::Path;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::settings::WriterSettings;

/// Configuration for a [`Serializer`](crate::Serializer)
///
/// Every field is optional in JSON; missing fields take their defaults.
///
/// ```
/// use typed_xml::SerializerConfig;
///
/// let config = SerializerConfig::from_json_str(r#"{"cache_codecs": false}"#).unwrap();
/// assert!(!config.cache_codecs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Store newly built codecs for reuse
    pub cache_codecs: bool,
    /// Writer settings used when a caller passes none
    pub writer:       WriterSettings,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            cache_codecs: true,
            writer:       WriterSettings::default(),
        }
    }
}

impl SerializerConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Report::new(Error::invalid("serializer configuration", e))
                .attach("Expected a JSON object with optional `cache_codecs` and `writer` fields")
        })
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Report::new(Error::io_failed("read", path, e)))?;
        Self::from_json_str(&json).map_err(|report| report.attach(format!("File: {}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::settings::Newline;

    #[test]
    fn test_default_enables_caching() {
        let config = SerializerConfig::default();
        assert!(config.cache_codecs);
        assert_eq!(config.writer, WriterSettings::default());
    }

    #[test]
    fn test_from_json_str_partial() {
        let config = SerializerConfig::from_json_str(
            r#"{"writer": {"omit_declaration": true, "newline": "crlf"}}"#,
        )
        .expect("config");
        assert!(config.cache_codecs);
        assert!(config.writer.omit_declaration);
        assert_eq!(config.writer.newline, Newline::CrLf);
        assert!(config.writer.indent.is_some());
    }

    #[test]
    fn test_from_json_str_rejects_bad_types() {
        let report = SerializerConfig::from_json_str(r#"{"cache_codecs": "yes"}"#)
            .expect_err("string is not a bool");
        assert!(report.current_context().is_invalid_argument());
    }

    #[test]
    fn test_from_json_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("typed_xml.json");
        fs::write(&path, r#"{"cache_codecs": false}"#).expect("write config");

        let config = SerializerConfig::from_json_file(&path).expect("config");
        assert!(!config.cache_codecs);

        let missing = SerializerConfig::from_json_file(&temp_dir.path().join("missing.json"))
            .expect_err("missing file");
        assert!(missing.current_context().is_transformation());
    }
}
