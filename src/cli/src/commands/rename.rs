//! The rename command.

use std::path::PathBuf;

use clap::Args;

use bp_rename_core::config::{RegistryConfig, RenamerConfig};
use bp_rename_runtime::{DockerKeychain, LayoutRegistry, RemoteRegistry, Renamer};

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// The existing buildpackage image (e.g., "ghcr.io/org/buildpack:1.0")
    #[arg(long)]
    pub image: String,

    /// The new id of the buildpack
    #[arg(long)]
    pub id: String,

    /// The tag of the new buildpackage image
    #[arg(long)]
    pub tag: String,

    /// Read and write OCI image layouts under this directory instead of a registry
    #[arg(long, value_name = "DIR")]
    pub layout: Option<PathBuf>,

    /// Registry to contact over plain HTTP (repeatable)
    #[arg(long = "insecure-registry", value_name = "HOST")]
    pub insecure_registries: Vec<String>,

    /// Docker config.json to read credentials from
    /// [default: $DOCKER_CONFIG/config.json or ~/.docker/config.json]
    #[arg(long, value_name = "PATH")]
    pub docker_config: Option<PathBuf>,
}

impl RenameArgs {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            insecure_registries: self.insecure_registries.clone(),
            docker_config: self
                .docker_config
                .clone()
                .or_else(DockerKeychain::default_path),
            ..Default::default()
        }
    }
}

/// Run the rename, returning `<tag>@<digest>`.
pub async fn execute(
    args: &RenameArgs,
    config: &RenamerConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let outcome = match &args.layout {
        Some(root) => {
            tracing::debug!(root = %root.display(), "Using OCI layout storage");
            Renamer::new(LayoutRegistry::new(root))
                .rename(&args.image, &args.id, &args.tag)
                .await?
        }
        None => {
            Renamer::new(RemoteRegistry::new(&config.registry))
                .rename(&args.image, &args.id, &args.tag)
                .await?
        }
    };

    tracing::info!(
        identifier = %outcome.identifier,
        layers = outcome.layer_count,
        "Rename complete"
    );
    Ok(outcome.identifier)
}
