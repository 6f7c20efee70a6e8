//! `buildpack.toml` codec.
//!
//! Only the identity fields are typed. `stacks`, `order`, `metadata` and any
//! other keys are carried as opaque TOML so a decode/encode cycle does not
//! drop information the rename does not care about.

use bp_rename_core::error::{RenameError, Result};
use serde::{Deserialize, Serialize};

use super::DESCRIPTOR_FILE;

/// Parsed `buildpack.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildpackDescriptor {
    /// Buildpack API version
    pub api: String,

    /// The `[buildpack]` table
    pub buildpack: BuildpackInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacks: Option<toml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<toml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<toml::Value>,

    /// Any other top-level keys
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// The `[buildpack]` table of a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildpackInfo {
    pub id: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub name: String,

    #[serde(
        rename = "clear-env",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub clear_env: bool,

    /// Any other keys (homepage, description, licenses, ...)
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl BuildpackDescriptor {
    /// Parse a descriptor from raw file bytes.
    ///
    /// Fails if the bytes are not UTF-8 TOML or if `api`, `[buildpack]` or a
    /// non-empty `buildpack.id` is missing.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let text =
            std::str::from_utf8(bytes).map_err(|e| RenameError::decode(DESCRIPTOR_FILE, e))?;
        let descriptor: Self =
            toml::from_str(text).map_err(|e| RenameError::decode(DESCRIPTOR_FILE, e))?;

        if descriptor.buildpack.id.is_empty() {
            return Err(RenameError::decode(
                DESCRIPTOR_FILE,
                "buildpack.id must not be empty",
            ));
        }

        Ok(descriptor)
    }

    /// Serialize back to TOML bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        toml::to_string(self)
            .map(String::into_bytes)
            .map_err(|e| {
                RenameError::SerializationError(format!(
                    "Failed to encode {}: {}",
                    DESCRIPTOR_FILE, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE: &str = r#"
api = "0.7"

[buildpack]
id = "paketo-buildpacks/node-engine"
version = "1.2.3"
name = "Node Engine"
homepage = "https://example.com/node-engine"

[[stacks]]
id = "io.buildpacks.stacks.bionic"

[metadata]
include-files = ["bin/build", "bin/detect"]

[[metadata.dependencies]]
id = "node"
version = "18.0.0"
"#;

    #[test]
    fn test_decode() {
        let descriptor = BuildpackDescriptor::decode(NODE.as_bytes()).unwrap();
        assert_eq!(descriptor.api, "0.7");
        assert_eq!(descriptor.buildpack.id, "paketo-buildpacks/node-engine");
        assert_eq!(descriptor.buildpack.version, "1.2.3");
        assert_eq!(descriptor.buildpack.name, "Node Engine");
        assert!(!descriptor.buildpack.clear_env);
        assert!(descriptor.stacks.is_some());
        assert!(descriptor.order.is_none());
        assert!(descriptor.buildpack.extra.contains_key("homepage"));
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let descriptor = BuildpackDescriptor::decode(NODE.as_bytes()).unwrap();
        let encoded = descriptor.encode().unwrap();
        let decoded = BuildpackDescriptor::decode(&encoded).unwrap();

        assert_eq!(decoded, descriptor);
    }

    #[test]
    fn test_round_trip_after_id_change() {
        let mut descriptor = BuildpackDescriptor::decode(NODE.as_bytes()).unwrap();
        descriptor.buildpack.id = "acme/node".to_string();

        let decoded = BuildpackDescriptor::decode(&descriptor.encode().unwrap()).unwrap();
        assert_eq!(decoded.buildpack.id, "acme/node");
        assert_eq!(decoded.buildpack.version, "1.2.3");
        assert_eq!(decoded.metadata, descriptor.metadata);
    }

    #[test]
    fn test_clear_env_omitted_when_false() {
        let descriptor = BuildpackDescriptor::decode(NODE.as_bytes()).unwrap();
        let encoded = String::from_utf8(descriptor.encode().unwrap()).unwrap();
        assert!(!encoded.contains("clear-env"));
    }

    #[test]
    fn test_clear_env_kept_when_true() {
        let toml = r#"
api = "0.7"

[buildpack]
id = "a"
version = "1.0"
clear-env = true
"#;
        let descriptor = BuildpackDescriptor::decode(toml.as_bytes()).unwrap();
        assert!(descriptor.buildpack.clear_env);

        let encoded = String::from_utf8(descriptor.encode().unwrap()).unwrap();
        assert!(encoded.contains("clear-env = true"));
    }

    #[test]
    fn test_order_is_preserved() {
        let toml = r#"
api = "0.7"

[buildpack]
id = "meta"
version = "1.0"

[[order]]
[[order.group]]
id = "a"
version = "1.0"
optional = true
"#;
        let descriptor = BuildpackDescriptor::decode(toml.as_bytes()).unwrap();
        let decoded = BuildpackDescriptor::decode(&descriptor.encode().unwrap()).unwrap();
        assert_eq!(decoded.order, descriptor.order);
        assert!(decoded.order.is_some());
    }

    #[test]
    fn test_decode_missing_id() {
        let toml = r#"
api = "0.7"

[buildpack]
version = "1.0"
"#;
        let result = BuildpackDescriptor::decode(toml.as_bytes());
        assert!(matches!(result, Err(RenameError::Decode { .. })));
    }

    #[test]
    fn test_decode_empty_id() {
        let toml = r#"
api = "0.7"

[buildpack]
id = ""
"#;
        let result = BuildpackDescriptor::decode(toml.as_bytes());
        assert!(matches!(result, Err(RenameError::Decode { .. })));
    }

    #[test]
    fn test_decode_missing_buildpack_table() {
        let result = BuildpackDescriptor::decode(b"api = \"0.7\"\n");
        assert!(matches!(result, Err(RenameError::Decode { .. })));
    }

    #[test]
    fn test_decode_missing_api() {
        let result = BuildpackDescriptor::decode(b"[buildpack]\nid = \"a\"\n");
        assert!(matches!(result, Err(RenameError::Decode { .. })));
    }

    #[test]
    fn test_decode_malformed() {
        let result = BuildpackDescriptor::decode(b"api = [");
        match result {
            Err(RenameError::Decode { context, .. }) => assert_eq!(context, "buildpack.toml"),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_not_utf8() {
        let result = BuildpackDescriptor::decode(&[0xff, 0xfe, 0x00]);
        assert!(matches!(result, Err(RenameError::Decode { .. })));
    }
}
