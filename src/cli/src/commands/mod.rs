//! CLI definition and dispatch.

mod rename;

use clap::Parser;

use bp_rename_core::config::{LogLevel, RenamerConfig};

pub use rename::RenameArgs;

/// Rename a buildpack inside a buildpackage image.
#[derive(Parser, Debug)]
#[command(name = "bp-rename", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub rename: RenameArgs,

    /// Log level when RUST_LOG is unset (debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: LogLevel,
}

impl Cli {
    /// Resolved configuration for this invocation.
    pub fn config(&self) -> RenamerConfig {
        RenamerConfig {
            registry: self.rename.registry_config(),
            log_level: self.log_level,
        }
    }
}

/// Run the parsed command, printing the renamed image identifier.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config();
    let identifier = rename::execute(&cli.rename, &config).await?;
    println!("{}", identifier);
    Ok(())
}
