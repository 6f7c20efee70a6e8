//! Partition buildpack layer metadata and rebuild it under a new id.

use bp_rename_core::error::Result;

use super::metadata::BuildpackLayerMetadata;
use super::rewrite::rewrite_layer;
use crate::oci::{Layer, OciImage};

/// Metadata and layers for the renamed image.
#[derive(Debug, Clone)]
pub struct Remapped {
    /// New `io.buildpacks.buildpack.layers` value
    pub metadata: BuildpackLayerMetadata,

    /// One layer per input entry, in metadata iteration order
    pub layers: Vec<Layer>,
}

impl BuildpackLayerMetadata {
    /// Rebuild this metadata with `old_id` renamed to `new_id`.
    ///
    /// An entry is kept as-is only when both its id differs from `old_id`
    /// and its version differs from `old_version`. Every other entry has its
    /// layer rewritten and is filed under `new_id`, keeping its version.
    pub fn remap(
        &self,
        source: &OciImage,
        old_id: &str,
        old_version: &str,
        new_id: &str,
    ) -> Result<Remapped> {
        let mut metadata = BuildpackLayerMetadata::new();
        let mut layers = Vec::with_capacity(self.len());

        for (id, version, info) in self.iter() {
            let layer = source.layer_by_diff_id(&info.layer_diff_id)?;

            if version != old_version && id != old_id {
                tracing::debug!(id, version, diff_id = %info.layer_diff_id, "Keeping buildpack layer");
                metadata.insert(id, version, info.clone());
                layers.push(layer);
                continue;
            }

            tracing::debug!(
                id,
                version,
                new_id,
                diff_id = %info.layer_diff_id,
                "Rewriting buildpack layer"
            );

            let rewritten = rewrite_layer(&layer, old_id, new_id)?;
            let mut info = info.clone();
            info.layer_diff_id = rewritten.diff_id().to_string();

            if let Some(previous) = metadata.insert(new_id, version, info) {
                tracing::warn!(
                    id = new_id,
                    version,
                    replaced_diff_id = %previous.layer_diff_id,
                    "Multiple buildpacks renamed onto the same id and version; keeping the last"
                );
            }
            layers.push(rewritten);
        }

        Ok(Remapped { metadata, layers })
    }
}
