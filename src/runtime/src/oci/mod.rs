//! OCI image support.
//!
//! - In-memory image model (platform, labels, layers)
//! - Layer identity (blob digest and diff ID)
//! - Registry access over the distribution API or local OCI layouts
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    OCI Image Layout                          │
//! │                                                              │
//! │  image/                                                      │
//! │  ├── oci-layout           (OCI layout marker)               │
//! │  ├── index.json           (Image index)                     │
//! │  └── blobs/                                                 │
//! │      └── sha256/                                            │
//! │          ├── <manifest>   (Image manifest)                  │
//! │          ├── <config>     (Image configuration)             │
//! │          └── <layers>     (Filesystem layers)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod credentials;
pub mod image;
mod labels;
pub mod layer;
pub mod layout;
pub mod registry;

pub use credentials::DockerKeychain;
pub use image::{ImageParts, OciImage, Platform};
pub use layer::{Layer, MEDIA_TYPE_LAYER_GZIP, MEDIA_TYPE_LAYER_TAR};
pub use layout::LayoutRegistry;
pub use registry::{parse_reference, ImageRegistry, PushResult, RegistryAuth, RemoteRegistry};
