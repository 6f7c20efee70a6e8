//! In-memory OCI image representation.
//!
//! An [`OciImage`] is the platform, the config labels and the ordered layer
//! list. That is everything needed to rename a buildpackage and to serialize
//! a new config, manifest and image digest for pushing.

use std::collections::BTreeMap;

use bp_rename_core::error::{RenameError, Result};
use oci_distribution::client::{Config, ImageLayer};
use oci_distribution::manifest::OciImageManifest;
use oci_spec::image::ImageConfiguration;

use super::layer::{parse_digest, prefixed_sha256, Layer};

/// Media type for OCI image configs.
pub const MEDIA_TYPE_IMAGE_CONFIG: &str = "application/vnd.oci.image.config.v1+json";

/// Target platform of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
}

impl Platform {
    /// Linux on the host CPU architecture, using OCI architecture names.
    pub fn linux_host() -> Self {
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };
        Self {
            os: "linux".to_string(),
            architecture: arch.to_string(),
        }
    }
}

/// An OCI image held in memory.
#[derive(Debug, Clone)]
pub struct OciImage {
    platform: Platform,
    labels: BTreeMap<String, String>,
    layers: Vec<Layer>,
}

/// Serialized pieces of an image, ready for a registry push.
pub struct ImageParts {
    pub layers: Vec<ImageLayer>,
    pub config: Config,
    pub manifest: OciImageManifest,
}

impl ImageParts {
    /// Manifest digest, computed over the exact bytes that get pushed.
    pub fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(&self.manifest)?;
        Ok(prefixed_sha256(&bytes))
    }
}

impl OciImage {
    /// Create an image with no layers and no labels.
    pub fn empty(platform: Platform) -> Self {
        Self {
            platform,
            labels: BTreeMap::new(),
            layers: Vec::new(),
        }
    }

    /// Assemble an image from a raw config blob and its layer blobs.
    ///
    /// `blobs` holds `(data, media_type)` pairs in manifest order; each is
    /// paired with the diff ID at the same position in `rootfs.diff_ids`.
    pub fn from_parts(config_bytes: &[u8], blobs: Vec<(Vec<u8>, String)>) -> Result<Self> {
        let config: ImageConfiguration = serde_json::from_slice(config_bytes)
            .map_err(|e| RenameError::decode("image config", e))?;

        let diff_ids = config.rootfs().diff_ids();
        if diff_ids.len() != blobs.len() {
            return Err(RenameError::OciImageError(format!(
                "Config lists {} diff IDs but manifest has {} layers",
                diff_ids.len(),
                blobs.len()
            )));
        }

        let layers = blobs
            .into_iter()
            .zip(diff_ids.iter())
            .map(|((data, media_type), diff_id)| Layer::from_blob(data, media_type, diff_id.as_str()))
            .collect::<Result<Vec<_>>>()?;

        let labels: BTreeMap<String, String> = config
            .config()
            .as_ref()
            .and_then(|c| c.labels().clone())
            .map(|l| l.into_iter().collect())
            .unwrap_or_default();

        Ok(Self {
            platform: Platform {
                os: config.os().to_string(),
                architecture: config.architecture().to_string(),
            },
            labels,
            layers,
        })
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// All config labels.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Get a label value by key.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(|s| s.as_str())
    }

    /// Set a raw string label, replacing any existing value.
    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    /// Layers in order, bottom to top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Find a layer by the digest of its uncompressed content.
    pub fn layer_by_diff_id(&self, diff_id: &str) -> Result<Layer> {
        parse_digest(diff_id)?;

        self.layers
            .iter()
            .find(|layer| layer.diff_id() == diff_id)
            .cloned()
            .ok_or_else(|| RenameError::LayerLookup {
                diff_id: diff_id.to_string(),
            })
    }

    /// Append layers on top of the existing ones, preserving their order.
    pub fn append_layers(mut self, layers: impl IntoIterator<Item = Layer>) -> Self {
        self.layers.extend(layers);
        self
    }

    /// Serialize the image config.
    ///
    /// Labels are kept in a `BTreeMap`, so equal images produce equal bytes.
    pub fn config_bytes(&self) -> Result<Vec<u8>> {
        let config = serde_json::json!({
            "architecture": self.platform.architecture,
            "os": self.platform.os,
            "config": {
                "Labels": self.labels,
            },
            "rootfs": {
                "type": "layers",
                "diff_ids": self.layers.iter().map(|l| l.diff_id()).collect::<Vec<_>>(),
            },
            "history": [],
        });
        Ok(serde_json::to_vec(&config)?)
    }

    /// Build the config, layer and manifest objects for this image.
    pub fn parts(&self) -> Result<ImageParts> {
        let layers: Vec<ImageLayer> = self
            .layers
            .iter()
            .map(|l| ImageLayer::new(l.data().to_vec(), l.media_type().to_string(), None))
            .collect();
        let config = Config::new(
            self.config_bytes()?,
            MEDIA_TYPE_IMAGE_CONFIG.to_string(),
            None,
        );
        let manifest = OciImageManifest::build(&layers, &config, None);

        Ok(ImageParts {
            layers,
            config,
            manifest,
        })
    }

    /// Manifest digest of this image (`sha256:<hex>`).
    pub fn digest(&self) -> Result<String> {
        self.parts()?.digest()
    }
}
