//! OCI layer blobs and content identity.
//!
//! A [`Layer`] owns its blob bytes behind an `Arc`, so layers carried over
//! from a source image into a new image share storage instead of copying it.
//! Two digests identify a layer:
//!
//! - `digest`: sha256 of the blob as stored in the registry (possibly gzipped)
//! - `diff_id`: sha256 of the uncompressed tar stream, recorded in the image
//!   config and in buildpack layer metadata

use std::io::{Read, Write};
use std::sync::Arc;

use bp_rename_core::error::{RenameError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

/// Media type for gzip-compressed OCI layers.
pub const MEDIA_TYPE_LAYER_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";

/// Media type for uncompressed OCI layers.
pub const MEDIA_TYPE_LAYER_TAR: &str = "application/vnd.oci.image.layer.v1.tar";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A single image layer.
#[derive(Debug, Clone)]
pub struct Layer {
    data: Arc<Vec<u8>>,
    media_type: String,
    digest: String,
    diff_id: String,
}

impl Layer {
    /// Wrap a blob fetched from a registry or layout.
    ///
    /// The diff ID is taken from the image config rather than recomputed.
    pub fn from_blob(
        data: Vec<u8>,
        media_type: impl Into<String>,
        diff_id: impl Into<String>,
    ) -> Result<Self> {
        let diff_id = diff_id.into();
        parse_digest(&diff_id)?;

        Ok(Self {
            digest: prefixed_sha256(&data),
            data: Arc::new(data),
            media_type: media_type.into(),
            diff_id,
        })
    }

    /// Build a layer from an uncompressed tar stream.
    ///
    /// The diff ID is computed over `tar`, then the stream is gzipped and the
    /// blob digest computed over the compressed bytes.
    pub fn from_tar(tar: Vec<u8>) -> Result<Self> {
        let diff_id = prefixed_sha256(&tar);

        let mut encoder = GzEncoder::new(Vec::with_capacity(tar.len() / 2), Compression::default());
        encoder
            .write_all(&tar)
            .map_err(|e| RenameError::Archive(format!("Failed to compress layer: {}", e)))?;
        let data = encoder
            .finish()
            .map_err(|e| RenameError::Archive(format!("Failed to finalize layer: {}", e)))?;

        let digest = prefixed_sha256(&data);

        tracing::debug!(
            diff_id = %diff_id,
            digest = %digest,
            size = data.len(),
            "Computed layer identity"
        );

        Ok(Self {
            data: Arc::new(data),
            media_type: MEDIA_TYPE_LAYER_GZIP.to_string(),
            digest,
            diff_id,
        })
    }

    /// Reader over the uncompressed tar stream.
    ///
    /// Compression is detected from the blob's magic bytes, not the media type.
    pub fn uncompressed(&self) -> Box<dyn Read + '_> {
        if self.is_gzip() {
            Box::new(GzDecoder::new(self.data.as_slice()))
        } else {
            Box::new(self.data.as_slice())
        }
    }

    /// Whether the blob is gzip-compressed.
    pub fn is_gzip(&self) -> bool {
        self.data.starts_with(&GZIP_MAGIC)
    }

    /// Raw blob bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Blob digest (`sha256:<hex>`).
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Uncompressed content digest (`sha256:<hex>`).
    pub fn diff_id(&self) -> &str {
        &self.diff_id
    }

    /// Blob size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Split a digest string into `(algorithm, hex)`.
///
/// Accepts any lowercase algorithm name and a non-empty lowercase hex part.
pub fn parse_digest(digest: &str) -> Result<(&str, &str)> {
    let (algorithm, hex) = digest
        .split_once(':')
        .ok_or_else(|| RenameError::InvalidDigest(digest.to_string()))?;

    let algorithm_ok = !algorithm.is_empty()
        && algorithm
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c));
    let hex_ok = !hex.is_empty() && hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'));

    if !algorithm_ok || !hex_ok {
        return Err(RenameError::InvalidDigest(digest.to_string()));
    }

    Ok((algorithm, hex))
}

/// Compute SHA256 digest of raw bytes (hex, no prefix).
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 digest of raw bytes with the `sha256:` prefix.
pub fn prefixed_sha256(data: &[u8]) -> String {
    format!("sha256:{}", sha256_bytes(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tar_with(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_sha256_bytes() {
        assert_eq!(
            sha256_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(
            prefixed_sha256(b"hello"),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_from_tar_diff_id_is_uncompressed_digest() {
        let tar = tar_with(&[("hello.txt", b"hello")]);
        let expected = prefixed_sha256(&tar);

        let layer = Layer::from_tar(tar).unwrap();

        assert_eq!(layer.diff_id(), expected);
        assert_ne!(layer.digest(), layer.diff_id());
        assert_eq!(layer.digest(), prefixed_sha256(layer.data()));
        assert_eq!(layer.media_type(), MEDIA_TYPE_LAYER_GZIP);
        assert!(layer.is_gzip());
    }

    #[test]
    fn test_uncompressed_gzip_round_trip() {
        let tar = tar_with(&[("a.txt", b"a"), ("dir/b.txt", b"bb")]);
        let layer = Layer::from_tar(tar.clone()).unwrap();

        let mut out = Vec::new();
        layer.uncompressed().read_to_end(&mut out).unwrap();
        assert_eq!(out, tar);
    }

    #[test]
    fn test_uncompressed_plain_tar_blob() {
        let tar = tar_with(&[("a.txt", b"a")]);
        let diff_id = prefixed_sha256(&tar);
        let layer = Layer::from_blob(tar.clone(), MEDIA_TYPE_LAYER_TAR, diff_id).unwrap();

        assert!(!layer.is_gzip());
        let mut out = Vec::new();
        layer.uncompressed().read_to_end(&mut out).unwrap();
        assert_eq!(out, tar);
    }

    #[test]
    fn test_from_tar_is_deterministic() {
        let tar = tar_with(&[("x", b"x")]);
        let a = Layer::from_tar(tar.clone()).unwrap();
        let b = Layer::from_tar(tar).unwrap();
        assert_eq!(a.diff_id(), b.diff_id());
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_from_blob_rejects_bad_diff_id() {
        let result = Layer::from_blob(vec![1, 2, 3], MEDIA_TYPE_LAYER_TAR, "not-a-digest");
        assert!(matches!(result, Err(RenameError::InvalidDigest(_))));
    }

    #[test]
    fn test_clone_shares_blob() {
        let layer = Layer::from_tar(tar_with(&[("x", b"x")])).unwrap();
        let copy = layer.clone();
        assert!(std::ptr::eq(layer.data().as_ptr(), copy.data().as_ptr()));
    }

    #[test]
    fn test_parse_digest() {
        assert_eq!(parse_digest("sha256:abc123").unwrap(), ("sha256", "abc123"));
        assert_eq!(parse_digest("sha:aaa").unwrap(), ("sha", "aaa"));
        assert!(parse_digest("abc123").is_err());
        assert!(parse_digest("sha256:").is_err());
        assert!(parse_digest(":abc").is_err());
        assert!(parse_digest("sha256:XYZ").is_err());
        assert!(parse_digest("SHA256:abc").is_err());
    }
}
