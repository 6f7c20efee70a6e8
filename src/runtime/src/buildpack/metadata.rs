//! JSON documents stored in buildpackage image labels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label holding [`BuildpackLayerMetadata`].
pub const LAYERS_LABEL: &str = "io.buildpacks.buildpack.layers";

/// Label holding [`BuildpackageMetadata`].
pub const METADATA_LABEL: &str = "io.buildpacks.buildpackage.metadata";

/// Per-layer information for one buildpack version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildpackLayerInfo {
    pub api: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stacks: Vec<Stack>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderEntry>,

    /// Diff ID of the layer carrying this buildpack
    #[serde(rename = "layerDiffID")]
    pub layer_diff_id: String,

    /// Keys not modelled above (homepage, targets, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<BuildpackRef>,
}

/// Reference to a buildpack from an order group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildpackRef {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

/// Buildpack id → version → layer info.
///
/// Both levels are ordered maps, so iteration order and the serialized label
/// are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildpackLayerMetadata(BTreeMap<String, BTreeMap<String, BuildpackLayerInfo>>);

impl BuildpackLayerMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the one it replaced.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        version: impl Into<String>,
        info: BuildpackLayerInfo,
    ) -> Option<BuildpackLayerInfo> {
        self.0
            .entry(id.into())
            .or_default()
            .insert(version.into(), info)
    }

    pub fn get(&self, id: &str, version: &str) -> Option<&BuildpackLayerInfo> {
        self.0.get(id).and_then(|versions| versions.get(version))
    }

    /// Every `(id, version, info)` triple, ordered by id then version.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &BuildpackLayerInfo)> {
        self.0.iter().flat_map(|(id, versions)| {
            versions
                .iter()
                .map(move |(version, info)| (id.as_str(), version.as_str(), info))
        })
    }

    /// Number of `(id, version)` entries.
    pub fn len(&self) -> usize {
        self.0.values().map(|versions| versions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Top-level buildpackage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildpackageMetadata {
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licenses: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacks: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
