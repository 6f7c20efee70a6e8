//! Rename a buildpack inside a buildpackage image.
//!
//! The source image is fetched, its layer metadata remapped, and a fresh
//! image assembled from the remapped layers and relabelled metadata. Pushing
//! that image is the only side effect, and it happens last.

use bp_rename_core::error::{RenameError, Result};

use crate::buildpack::metadata::{LAYERS_LABEL, METADATA_LABEL};
use crate::buildpack::{BuildpackLayerMetadata, BuildpackageMetadata};
use crate::oci::{parse_reference, ImageRegistry, OciImage};

/// Result of a successful rename.
#[derive(Debug, Clone)]
pub struct RenameOutcome {
    /// `<target>@<digest>`
    pub identifier: String,

    /// Manifest digest of the pushed image
    pub digest: String,

    /// Layer metadata written to the new image
    pub metadata: BuildpackLayerMetadata,

    pub layer_count: usize,
}

/// Drives a rename against an image registry.
pub struct Renamer<R> {
    registry: R,
}

impl<R: ImageRegistry> Renamer<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Rename the top-level buildpack of `image` to `new_id` and push the
    /// result as `target`.
    ///
    /// Returns `"{target}@{digest}"` in [`RenameOutcome::identifier`].
    pub async fn rename(&self, image: &str, new_id: &str, target: &str) -> Result<RenameOutcome> {
        if new_id.is_empty() {
            return Err(RenameError::ConfigError(
                "New buildpack id must not be empty".to_string(),
            ));
        }
        let source_ref = parse_reference(image)?;
        let target_ref = parse_reference(target)?;

        let source = self.registry.fetch(&source_ref).await?;
        let (renamed, metadata) = rename_image(&source, new_id)?;
        let layer_count = renamed.layers().len();

        let pushed = self.registry.push(&target_ref, &renamed).await?;
        let identifier = format!("{}@{}", target, pushed.digest);

        tracing::info!(
            source = %source_ref,
            identifier = %identifier,
            new_id,
            layers = layer_count,
            "Buildpackage renamed"
        );

        Ok(RenameOutcome {
            identifier,
            digest: pushed.digest,
            metadata,
            layer_count,
        })
    }
}

/// Build the renamed image from a fetched buildpackage.
///
/// The buildpack being renamed is the one named by the buildpackage
/// metadata label. The new image keeps the source platform and carries only
/// the remapped layers and the two buildpack labels.
pub fn rename_image(source: &OciImage, new_id: &str) -> Result<(OciImage, BuildpackLayerMetadata)> {
    let mut top: BuildpackageMetadata = source.get_label(METADATA_LABEL)?;
    let layers: BuildpackLayerMetadata = source.get_label(LAYERS_LABEL)?;

    tracing::debug!(
        old_id = %top.id,
        old_version = %top.version,
        new_id,
        entries = layers.len(),
        "Remapping buildpack layers"
    );

    let remapped = layers.remap(source, &top.id, &top.version, new_id)?;

    let mut image = OciImage::empty(source.platform().clone()).append_layers(remapped.layers);
    top.id = new_id.to_string();
    image.set_labels([
        (LAYERS_LABEL, serde_json::to_value(&remapped.metadata)?),
        (METADATA_LABEL, serde_json::to_value(&top)?),
    ])?;

    Ok((image, remapped.metadata))
}
