//! Site configuration document
//!
//! The service exposes no partial-update primitive, so a [`SiteConfig`] is
//! always read and written whole. Every field the service is known to send is
//! an explicit, nullable member; anything else lands in [`SiteConfig::extra`]
//! and is written back untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::hash::ConfigFingerprint;

/// Full configuration document of a site
///
/// `None` mirrors the service's nil marker and is written back as an explicit
/// null. Collections are optional too, so an empty list and a nil list survive
/// a read-modify-write unchanged. A named field missing from the fetched
/// document also reads as `None`, so it goes back as an explicit null.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteConfig {
    pub app_settings: Option<Vec<NameValuePair>>,
    pub connection_strings: Option<Vec<ConnectionString>>,
    pub default_documents: Option<Vec<String>>,
    pub detailed_error_logging_enabled: Option<bool>,
    pub document_root: Option<String>,
    pub handler_mappings: Option<Vec<HandlerMapping>>,
    pub http_logging_enabled: Option<bool>,
    pub metadata: Option<Vec<NameValuePair>>,
    pub net_framework_version: Option<String>,
    pub number_of_workers: Option<u32>,
    pub php_version: Option<String>,
    pub publishing_password: Option<String>,
    pub publishing_username: Option<String>,
    pub request_tracing_enabled: Option<bool>,
    pub request_tracing_expiration_time: Option<String>,
    pub scm_type: Option<String>,
    #[serde(rename = "Use32BitWorkerProcess")]
    pub use_32_bit_worker_process: Option<bool>,
    pub web_sockets_enabled: Option<bool>,

    /// Concurrency token, present only when the backend issues one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Fields this record does not name, preserved verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl SiteConfig {
    /// Parse from JSON string
    ///
    /// # Errors
    /// Returns error if JSON is invalid or does not match the document shape
    #[inline]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::InvalidJson)
    }

    /// Handler mappings, empty when the collection is nil
    #[inline]
    #[must_use]
    pub fn handler_mappings(&self) -> &[HandlerMapping] {
        self.handler_mappings.as_deref().unwrap_or_default()
    }

    /// Find the mapping for an extension pattern
    #[must_use]
    pub fn find_handler_mapping(&self, extension: &str) -> Option<&HandlerMapping> {
        self.handler_mappings()
            .iter()
            .find(|m| m.matches_extension(extension))
    }

    /// Set the concurrency token
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Canonical JSON (sorted keys, no whitespace)
    ///
    /// # Errors
    /// Returns error if the document cannot be converted to JSON
    pub fn to_canonical_json(&self) -> Result<String, ConfigError> {
        let value =
            serde_json::to_value(self).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        Ok(canonical_json(&value))
    }

    /// Fingerprint of the canonical form
    ///
    /// Documents that would go over the wire identically share a fingerprint.
    ///
    /// # Errors
    /// Returns error if the document cannot be converted to JSON
    pub fn fingerprint(&self) -> Result<ConfigFingerprint, ConfigError> {
        let canonical = self.to_canonical_json()?;
        Ok(ConfigFingerprint::compute(canonical.as_bytes()))
    }
}

/// A name/value pair (app settings, metadata, site properties)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameValuePair {
    pub name: String,
    pub value: Option<String>,
}

impl NameValuePair {
    /// Create a pair with a value
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// A named connection string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionString {
    pub name: String,
    pub connection_string: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

/// Rule binding a file-extension pattern to a script processor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HandlerMapping {
    /// Optional processor arguments
    pub arguments: Option<String>,
    /// Extension pattern, e.g. `.js`
    pub extension: String,
    /// Path of the processor executable
    pub script_processor: String,
}

impl HandlerMapping {
    /// Create a mapping without arguments
    #[inline]
    #[must_use]
    pub fn new(extension: impl Into<String>, script_processor: impl Into<String>) -> Self {
        Self {
            arguments: None,
            extension: extension.into(),
            script_processor: script_processor.into(),
        }
    }

    /// Set processor arguments
    #[inline]
    #[must_use]
    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    /// Whether this mapping serves the given extension pattern
    ///
    /// Patterns compare trimmed and ASCII-case-insensitively.
    #[inline]
    #[must_use]
    pub fn matches_extension(&self, extension: &str) -> bool {
        self.extension
            .trim()
            .eq_ignore_ascii_case(extension.trim())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Generate canonical JSON (sorted keys)
fn canonical_json(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();

            let parts: Vec<_> = keys
                .into_iter()
                .map(|key| format!("{}:{}", quote(key), canonical_json(&map[key])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        JsonValue::Array(arr) => {
            let parts: Vec<_> = arr.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        JsonValue::String(s) => quote(s),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => "null".to_string(),
    }
}

fn quote(s: &str) -> String {
    JsonValue::String(s.to_owned()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn wire_document() -> JsonValue {
        json!({
            "AppSettings": [],
            "ConnectionStrings": [],
            "DefaultDocuments": ["Default.htm", "index.html", "hostingstart.html"],
            "DetailedErrorLoggingEnabled": false,
            "DocumentRoot": null,
            "HandlerMappings": null,
            "HttpLoggingEnabled": false,
            "Metadata": [],
            "NetFrameworkVersion": "v4.0",
            "NumberOfWorkers": 1,
            "PhpVersion": "5.3",
            "PublishingPassword": "secret",
            "PublishingUsername": "$clitsts1",
            "RequestTracingEnabled": false,
            "RequestTracingExpirationTime": null,
            "ScmType": "None",
            "Use32BitWorkerProcess": true,
            "WebSocketsEnabled": false
        })
    }

    #[test]
    fn wire_document_roundtrips_exactly() {
        let config: SiteConfig = serde_json::from_value(wire_document()).unwrap();
        assert_eq!(config.use_32_bit_worker_process, Some(true));
        assert!(config.handler_mappings.is_none());
        assert_eq!(config.app_settings, Some(vec![]));

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back, wire_document());
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let mut doc = wire_document();
        doc["RemoteDebuggingEnabled"] = json!(false);
        doc["AutoSwapSlotName"] = json!(null);

        let config: SiteConfig = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(config.extra.len(), 2);
        assert_eq!(serde_json::to_value(&config).unwrap(), doc);
    }

    #[test]
    fn version_is_omitted_when_absent() {
        let config = SiteConfig::default();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("Version").is_none());

        let value = serde_json::to_value(config.with_version("7")).unwrap();
        assert_eq!(value["Version"], json!("7"));
    }

    #[test]
    fn fingerprint_ignores_key_order() {
        let a = SiteConfig::from_json(r#"{"PhpVersion": "5.3", "ScmType": "None"}"#).unwrap();
        let b = SiteConfig::from_json(r#"{"ScmType": "None", "PhpVersion": "5.3"}"#).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let c = SiteConfig::from_json(r#"{"ScmType": "Git", "PhpVersion": "5.3"}"#).unwrap();
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn fingerprint_hashes_the_canonical_form() {
        let config: SiteConfig = serde_json::from_value(wire_document()).unwrap();
        let canonical = config.to_canonical_json().unwrap();
        assert_eq!(
            config.fingerprint().unwrap(),
            ConfigFingerprint::compute(canonical.as_bytes())
        );
        assert_ne!(
            config.fingerprint().unwrap(),
            ConfigFingerprint::compute(b"")
        );
    }

    #[test]
    fn empty_and_nil_collections_fingerprint_differently() {
        let nil = SiteConfig::default();
        let empty = SiteConfig {
            handler_mappings: Some(vec![]),
            ..SiteConfig::default()
        };
        assert_ne!(nil.fingerprint().unwrap(), empty.fingerprint().unwrap());
    }

    #[test]
    fn absent_named_field_is_written_back_as_null() {
        let mut doc = wire_document();
        doc.as_object_mut().unwrap().remove("PhpVersion");

        let config: SiteConfig = serde_json::from_value(doc).unwrap();
        assert_eq!(config.php_version, None);

        let back = serde_json::to_value(&config).unwrap();
        assert_eq!(back["PhpVersion"], JsonValue::Null);
        assert!(back.as_object().unwrap().contains_key("PhpVersion"));
    }

    #[test]
    fn canonical_json_escapes_strings() {
        let config = SiteConfig {
            handler_mappings: Some(vec![HandlerMapping::new(".js", "c:\\node\\node.exe")]),
            ..SiteConfig::default()
        };
        let canonical = config.to_canonical_json().unwrap();
        let reparsed: JsonValue = serde_json::from_str(&canonical).unwrap();
        assert_eq!(
            reparsed["HandlerMappings"][0]["ScriptProcessor"],
            json!("c:\\node\\node.exe")
        );
    }

    #[test]
    fn find_mapping_ignores_case_and_whitespace() {
        let config = SiteConfig {
            handler_mappings: Some(vec![HandlerMapping::new(".PHP", "php-cgi.exe")]),
            ..SiteConfig::default()
        };
        assert!(config.find_handler_mapping(" .php ").is_some());
        assert!(config.find_handler_mapping(".js").is_none());
        assert!(SiteConfig::default().handler_mappings().is_empty());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            SiteConfig::from_json("not json"),
            Err(ConfigError::InvalidJson(_))
        ));
    }
}
