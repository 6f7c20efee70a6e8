//! Buildpack-level pieces of a buildpackage image.
//!
//! - [`descriptor`]: `buildpack.toml` codec
//! - [`metadata`]: the JSON documents stored in image labels
//! - [`rewrite`]: renaming paths and descriptors inside a layer archive
//! - [`remap`]: partitioning layer metadata and rebuilding it under a new id

pub mod descriptor;
pub mod metadata;
pub mod remap;
pub mod rewrite;

pub use descriptor::{BuildpackDescriptor, BuildpackInfo};
pub use metadata::{
    BuildpackLayerInfo, BuildpackLayerMetadata, BuildpackRef, BuildpackageMetadata, OrderEntry,
    Stack,
};
pub use remap::Remapped;
pub use rewrite::{rewrite_archive, rewrite_layer};

/// File name of the descriptor shipped in every buildpack layer.
pub const DESCRIPTOR_FILE: &str = "buildpack.toml";

/// Directory-safe form of a buildpack id.
///
/// Buildpack ids may be namespaced (`paketo-buildpacks/node`); on disk the
/// `/` separators are flattened to `_`.
pub fn escape_id(id: &str) -> String {
    id.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_id() {
        assert_eq!(escape_id("paketo-buildpacks/node"), "paketo-buildpacks_node");
        assert_eq!(escape_id("a/b/c"), "a_b_c");
        assert_eq!(escape_id("plain"), "plain");
        assert_eq!(escape_id(""), "");
    }
}
