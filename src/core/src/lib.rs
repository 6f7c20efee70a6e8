//! bp-rename Core - Foundational Types
//!
//! Error taxonomy and configuration shared by the runtime and CLI crates.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{LogLevel, RegistryConfig, RenamerConfig};
pub use error::{RenameError, Result};

/// bp-rename version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
