//! Images stored as OCI image layouts on disk.
//!
//! Each reference maps to its own layout directory under a root:
//!
//! ```text
//! <root>/<registry>/<repository>/<tag>/
//! ├── oci-layout
//! ├── index.json
//! └── blobs/sha256/<hex>
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bp_rename_core::error::{RenameError, Result};
use oci_distribution::Reference;
use oci_spec::image::{ImageIndex, ImageManifest};

use super::image::OciImage;
use super::layer::{parse_digest, prefixed_sha256};
use super::registry::{ImageRegistry, PushResult};

const MEDIA_TYPE_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
const MEDIA_TYPE_IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// Registry backed by a directory of OCI image layouts.
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    root: PathBuf,
}

impl LayoutRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Layout directory for a reference.
    pub fn image_dir(&self, reference: &Reference) -> PathBuf {
        let name = match (reference.tag(), reference.digest()) {
            (Some(tag), _) => tag.to_string(),
            (None, Some(digest)) => digest.replace(':', "_"),
            (None, None) => "latest".to_string(),
        };
        self.root
            .join(reference.registry())
            .join(reference.repository())
            .join(name)
    }
}

#[async_trait]
impl ImageRegistry for LayoutRegistry {
    async fn fetch(&self, reference: &Reference) -> Result<OciImage> {
        let dir = self.image_dir(reference);
        tracing::info!(reference = %reference, path = %dir.display(), "Reading image layout");

        read_layout(&dir).map_err(|e| RenameError::Fetch {
            reference: reference.to_string(),
            message: e.to_string(),
        })
    }

    async fn push(&self, reference: &Reference, image: &OciImage) -> Result<PushResult> {
        let dir = self.image_dir(reference);
        let digest = write_layout(&dir, image).map_err(|e| RenameError::Push {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;

        tracing::info!(
            reference = %reference,
            digest = %digest,
            path = %dir.display(),
            "Image layout written"
        );

        Ok(PushResult {
            digest,
            manifest_url: dir.display().to_string(),
        })
    }
}

/// Load an image from an OCI layout directory, verifying blob digests.
pub fn read_layout(dir: &Path) -> Result<OciImage> {
    validate_oci_layout(dir)?;

    let index_path = dir.join("index.json");
    let content = std::fs::read_to_string(&index_path).map_err(|e| {
        RenameError::OciImageError(format!(
            "Failed to read index.json at {}: {}",
            index_path.display(),
            e
        ))
    })?;
    let index: ImageIndex =
        serde_json::from_str(&content).map_err(|e| RenameError::decode("index.json", e))?;

    let manifest_digest = index
        .manifests()
        .first()
        .ok_or_else(|| RenameError::OciImageError("No manifests in index.json".to_string()))?
        .digest()
        .to_string();

    let manifest_bytes = read_blob(dir, &manifest_digest)?;
    let manifest: ImageManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| RenameError::decode("image manifest", e))?;

    let config = read_blob(dir, &manifest.config().digest().to_string())?;

    let mut blobs = Vec::with_capacity(manifest.layers().len());
    for layer in manifest.layers() {
        let data = read_blob(dir, &layer.digest().to_string())?;
        blobs.push((data, layer.media_type().to_string()));
    }

    OciImage::from_parts(&config, blobs)
}

/// Write an image as an OCI layout at `dir`, replacing anything there.
///
/// The layout is assembled in a sibling staging directory and renamed into
/// place, so `dir` never holds a partial image. Returns the manifest digest.
pub fn write_layout(dir: &Path, image: &OciImage) -> Result<String> {
    let parts = image.parts()?;
    let manifest_bytes = serde_json::to_vec(&parts.manifest)?;
    let manifest_digest = prefixed_sha256(&manifest_bytes);
    let config_bytes = image.config_bytes()?;

    let parent = dir.parent().ok_or_else(|| {
        RenameError::OciImageError(format!("Invalid layout path {}", dir.display()))
    })?;
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = parent.join(format!(".{}.partial", name));

    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    let blobs_dir = staging.join("blobs").join("sha256");
    std::fs::create_dir_all(&blobs_dir).map_err(|e| {
        RenameError::OciImageError(format!(
            "Failed to create blobs directory {}: {}",
            blobs_dir.display(),
            e
        ))
    })?;

    for layer in image.layers() {
        write_blob(&staging, layer.digest(), layer.data())?;
    }
    write_blob(&staging, &prefixed_sha256(&config_bytes), &config_bytes)?;
    write_blob(&staging, &manifest_digest, &manifest_bytes)?;

    let index = serde_json::json!({
        "schemaVersion": 2,
        "mediaType": MEDIA_TYPE_IMAGE_INDEX,
        "manifests": [{
            "mediaType": MEDIA_TYPE_IMAGE_MANIFEST,
            "digest": manifest_digest,
            "size": manifest_bytes.len()
        }]
    });
    std::fs::write(
        staging.join("index.json"),
        serde_json::to_string_pretty(&index)?,
    )
    .map_err(|e| RenameError::OciImageError(format!("Failed to write index.json: {}", e)))?;

    std::fs::write(
        staging.join("oci-layout"),
        r#"{"imageLayoutVersion":"1.0.0"}"#,
    )
    .map_err(|e| RenameError::OciImageError(format!("Failed to write oci-layout: {}", e)))?;

    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::rename(&staging, dir).map_err(|e| {
        RenameError::OciImageError(format!(
            "Failed to move layout {} -> {}: {}",
            staging.display(),
            dir.display(),
            e
        ))
    })?;

    tracing::debug!(
        path = %dir.display(),
        layers = image.layers().len(),
        "Wrote OCI layout"
    );

    Ok(manifest_digest)
}

/// Check the directory holds an OCI layout.
fn validate_oci_layout(dir: &Path) -> Result<()> {
    for required in ["oci-layout", "index.json", "blobs"] {
        if !dir.join(required).exists() {
            return Err(RenameError::OciImageError(format!(
                "Not a valid OCI layout: missing {} in {}",
                required,
                dir.display()
            )));
        }
    }
    Ok(())
}

fn blob_path(dir: &Path, digest: &str) -> Result<PathBuf> {
    let (algorithm, hex) = parse_digest(digest)?;
    Ok(dir.join("blobs").join(algorithm).join(hex))
}

fn read_blob(dir: &Path, digest: &str) -> Result<Vec<u8>> {
    let path = blob_path(dir, digest)?;
    let data = std::fs::read(&path).map_err(|e| {
        RenameError::OciImageError(format!("Failed to read blob {}: {}", path.display(), e))
    })?;

    if digest.starts_with("sha256:") && prefixed_sha256(&data) != digest {
        return Err(RenameError::OciImageError(format!(
            "Blob {} does not match its digest",
            digest
        )));
    }
    Ok(data)
}

fn write_blob(dir: &Path, digest: &str, data: &[u8]) -> Result<()> {
    let path = blob_path(dir, digest)?;
    std::fs::write(&path, data).map_err(|e| {
        RenameError::OciImageError(format!("Failed to write blob {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::image::Platform;
    use crate::oci::layer::Layer;
    use crate::oci::registry::parse_reference;
    use tempfile::TempDir;

    fn sample_image() -> OciImage {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "hello.txt", &b"hello"[..]).unwrap();
        let layer = Layer::from_tar(builder.into_inner().unwrap()).unwrap();

        let mut image = OciImage::empty(Platform {
            os: "linux".to_string(),
            architecture: "arm64".to_string(),
        })
        .append_layers(vec![layer]);
        image.set_label("io.example", "value");
        image
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image");
        let image = sample_image();

        let digest = write_layout(&path, &image).unwrap();
        assert_eq!(digest, image.digest().unwrap());
        assert!(path.join("oci-layout").exists());
        assert!(!dir.path().join(".image.partial").exists());

        let read = read_layout(&path).unwrap();
        assert_eq!(read.platform(), image.platform());
        assert_eq!(read.label("io.example"), Some("value"));
        assert_eq!(read.layers().len(), 1);
        assert_eq!(read.layers()[0].diff_id(), image.layers()[0].diff_id());
        assert_eq!(read.digest().unwrap(), digest);
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image");

        let first = sample_image();
        write_layout(&path, &first).unwrap();

        let mut second = sample_image();
        second.set_label("io.example", "changed");
        let digest = write_layout(&path, &second).unwrap();

        let read = read_layout(&path).unwrap();
        assert_eq!(read.label("io.example"), Some("changed"));
        assert_eq!(read.digest().unwrap(), digest);
    }

    #[test]
    fn test_read_missing_layout() {
        let dir = TempDir::new().unwrap();
        let result = read_layout(&dir.path().join("nothing"));
        assert!(matches!(result, Err(RenameError::OciImageError(_))));
    }

    #[test]
    fn test_read_detects_corrupt_blob() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image");
        let image = sample_image();
        write_layout(&path, &image).unwrap();

        let layer_digest = image.layers()[0].digest();
        let (_, hex) = parse_digest(layer_digest).unwrap();
        std::fs::write(path.join("blobs").join("sha256").join(hex), b"garbage").unwrap();

        assert!(read_layout(&path).is_err());
    }

    #[test]
    fn test_image_dir() {
        let registry = LayoutRegistry::new("/layouts");
        let reference = parse_reference("localhost:5000/acme/bp:1.0").unwrap();
        assert_eq!(
            registry.image_dir(&reference),
            PathBuf::from("/layouts/localhost:5000/acme/bp/1.0")
        );
    }

    #[tokio::test]
    async fn test_push_then_fetch() {
        let dir = TempDir::new().unwrap();
        let registry = LayoutRegistry::new(dir.path());
        let reference = parse_reference("example.com/acme/bp:2.0").unwrap();
        let image = sample_image();

        let pushed = registry.push(&reference, &image).await.unwrap();
        assert_eq!(pushed.digest, image.digest().unwrap());

        let fetched = registry.fetch(&reference).await.unwrap();
        assert_eq!(fetched.digest().unwrap(), pushed.digest);
    }

    #[tokio::test]
    async fn test_fetch_unknown_reference() {
        let dir = TempDir::new().unwrap();
        let registry = LayoutRegistry::new(dir.path());
        let reference = parse_reference("example.com/acme/missing:1.0").unwrap();

        let result = registry.fetch(&reference).await;
        assert!(matches!(result, Err(RenameError::Fetch { .. })));
    }
}
