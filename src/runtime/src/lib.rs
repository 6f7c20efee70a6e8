//! bp-rename Runtime - buildpackage rename engine.
//!
//! This crate holds the OCI image model, registry access, the
//! `buildpack.toml` codec, the layer archive rewriter and the metadata remap
//! that together rename a buildpack inside a buildpackage image.

#![allow(clippy::result_large_err)]

pub mod buildpack;
pub mod oci;
pub mod rename;

// Re-export common types
pub use buildpack::{
    escape_id, BuildpackDescriptor, BuildpackLayerInfo, BuildpackLayerMetadata,
    BuildpackageMetadata, Remapped, DESCRIPTOR_FILE,
};
pub use buildpack::metadata::{LAYERS_LABEL, METADATA_LABEL};
pub use oci::{
    parse_reference, DockerKeychain, ImageRegistry, Layer, LayoutRegistry, OciImage, Platform,
    PushResult, RegistryAuth, RemoteRegistry,
};
pub use rename::{rename_image, RenameOutcome, Renamer};

/// bp-rename runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
