//! Registry access for fetching and pushing images.
//!
//! [`ImageRegistry`] is the seam the rename runs against. [`RemoteRegistry`]
//! talks to container registries through `oci-distribution`; the layout
//! implementation in [`super::layout`] works on local directories.

use async_trait::async_trait;
use bp_rename_core::config::RegistryConfig;
use bp_rename_core::error::{RenameError, Result};
use oci_distribution::client::{ClientConfig, ClientProtocol, PushResponse};
use oci_distribution::manifest::{ImageIndexEntry, OciDescriptor};
use oci_distribution::secrets::RegistryAuth as OciRegistryAuth;
use oci_distribution::{Client, Reference};

use super::credentials::DockerKeychain;
use super::image::{OciImage, Platform};
use super::layer::{parse_digest, prefixed_sha256};

/// Source and destination of images.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Fetch an image with its config and all layer blobs.
    async fn fetch(&self, reference: &Reference) -> Result<OciImage>;

    /// Write an image under `reference`.
    async fn push(&self, reference: &Reference, image: &OciImage) -> Result<PushResult>;
}

/// Result of a successful image push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResult {
    /// Digest of the pushed manifest (`sha256:<hex>`).
    pub digest: String,
    /// Where the manifest was written.
    pub manifest_url: String,
}

/// Parse an image reference string.
pub fn parse_reference(reference: &str) -> Result<Reference> {
    reference
        .parse::<Reference>()
        .map_err(|e| RenameError::ReferenceParse {
            reference: reference.to_string(),
            message: e.to_string(),
        })
}

/// Authentication credentials for a container registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAuth {
    username: Option<String>,
    password: Option<String>,
}

impl RegistryAuth {
    /// Create anonymous authentication (no credentials).
    pub fn anonymous() -> Self {
        Self {
            username: None,
            password: None,
        }
    }

    /// Create basic authentication with username and password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Create authentication from environment variables.
    ///
    /// Reads `REGISTRY_USERNAME` and `REGISTRY_PASSWORD`.
    /// Falls back to anonymous if not set.
    pub fn from_env() -> Self {
        let username = std::env::var("REGISTRY_USERNAME").ok();
        let password = std::env::var("REGISTRY_PASSWORD").ok();

        if username.is_some() && password.is_some() {
            Self { username, password }
        } else {
            Self::anonymous()
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }

    fn to_oci_auth(&self) -> OciRegistryAuth {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => OciRegistryAuth::Basic(u.clone(), p.clone()),
            _ => OciRegistryAuth::Anonymous,
        }
    }
}

/// Image registry reached over the OCI distribution API.
pub struct RemoteRegistry {
    client: Client,
    keychain: DockerKeychain,
}

impl RemoteRegistry {
    /// Create a client from registry configuration.
    pub fn new(config: &RegistryConfig) -> Self {
        let keychain = match &config.docker_config {
            Some(path) => DockerKeychain::new(path.clone()),
            None => DockerKeychain::without_file(),
        };
        Self::with_keychain(config, keychain)
    }

    pub fn with_keychain(config: &RegistryConfig, keychain: DockerKeychain) -> Self {
        Self {
            client: Client::new(client_config(config)),
            keychain,
        }
    }

    fn auth_for(&self, reference: &Reference) -> Result<OciRegistryAuth> {
        let registry = reference.registry();
        let auth = self
            .keychain
            .resolve(registry)
            .map_err(|e| RenameError::RegistryError {
                registry: registry.to_string(),
                message: format!("Failed to resolve credentials: {}", e),
            })?;
        Ok(auth.to_oci_auth())
    }

    async fn pull_verified(
        &self,
        reference: &Reference,
        descriptor: &OciDescriptor,
    ) -> Result<Vec<u8>> {
        let mut data: Vec<u8> = Vec::new();
        self.client
            .pull_blob(reference, descriptor, &mut data)
            .await
            .map_err(|e| RenameError::Fetch {
                reference: reference.to_string(),
                message: format!("Failed to pull blob {}: {}", descriptor.digest, e),
            })?;

        verify_blob(&descriptor.digest, &data).map_err(|message| RenameError::Fetch {
            reference: reference.to_string(),
            message,
        })?;
        Ok(data)
    }
}

#[async_trait]
impl ImageRegistry for RemoteRegistry {
    async fn fetch(&self, reference: &Reference) -> Result<OciImage> {
        tracing::info!(reference = %reference, "Fetching image from registry");

        let auth = self.auth_for(reference)?;
        let (manifest, manifest_digest) = self
            .client
            .pull_image_manifest(reference, &auth)
            .await
            .map_err(|e| RenameError::Fetch {
                reference: reference.to_string(),
                message: format!("Failed to pull manifest: {}", e),
            })?;

        let config = self.pull_verified(reference, &manifest.config).await?;

        let mut blobs = Vec::with_capacity(manifest.layers.len());
        for layer in &manifest.layers {
            tracing::debug!(digest = %layer.digest, size = layer.size, "Pulling layer");
            let data = self.pull_verified(reference, layer).await?;
            blobs.push((data, layer.media_type.clone()));
        }

        let image = OciImage::from_parts(&config, blobs)?;

        tracing::info!(
            reference = %reference,
            digest = %manifest_digest,
            layers = image.layers().len(),
            "Image fetched"
        );
        Ok(image)
    }

    async fn push(&self, reference: &Reference, image: &OciImage) -> Result<PushResult> {
        let parts = image.parts()?;
        let digest = parts.digest()?;

        tracing::info!(
            reference = %reference,
            layers = parts.layers.len(),
            "Pushing image to registry"
        );

        let auth = self.auth_for(reference)?;
        let response: PushResponse = self
            .client
            .push(
                reference,
                &parts.layers,
                parts.config,
                &auth,
                Some(parts.manifest),
            )
            .await
            .map_err(|e| RenameError::Push {
                reference: reference.to_string(),
                message: e.to_string(),
            })?;

        tracing::info!(
            reference = %reference,
            digest = %digest,
            manifest_url = %response.manifest_url,
            "Image pushed successfully"
        );

        Ok(PushResult {
            digest,
            manifest_url: response.manifest_url,
        })
    }
}

/// Client settings derived from registry configuration.
fn client_config(config: &RegistryConfig) -> ClientConfig {
    let protocol = if config.insecure_registries.is_empty() {
        ClientProtocol::Https
    } else {
        ClientProtocol::HttpsExcept(config.insecure_registries.clone())
    };

    ClientConfig {
        protocol,
        platform_resolver: Some(Box::new(platform_resolver(config.platform_os.clone()))),
        ..Default::default()
    }
}

/// Platform resolver selecting `os` on the host CPU architecture.
fn platform_resolver(os: String) -> impl Fn(&[ImageIndexEntry]) -> Option<String> + Send + Sync {
    let arch = Platform::linux_host().architecture;

    move |manifests: &[ImageIndexEntry]| {
        manifests
            .iter()
            .find(|entry| {
                entry
                    .platform
                    .as_ref()
                    .is_some_and(|p| p.os == os && p.architecture == arch)
            })
            .map(|entry| entry.digest.clone())
    }
}

/// Check a pulled blob against its descriptor digest.
///
/// Only sha256 digests are recomputed; other algorithms are accepted as-is.
fn verify_blob(expected: &str, data: &[u8]) -> std::result::Result<(), String> {
    let (algorithm, _) = parse_digest(expected).map_err(|e| e.to_string())?;
    if algorithm != "sha256" {
        return Ok(());
    }

    let actual = prefixed_sha256(data);
    if actual != expected {
        return Err(format!(
            "Digest mismatch: expected {}, got {}",
            expected, actual
        ));
    }
    Ok(())
}
