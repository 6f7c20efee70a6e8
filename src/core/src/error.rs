use thiserror::Error;

/// bp-rename error types
#[derive(Error, Debug)]
pub enum RenameError {
    /// Malformed image reference string
    #[error("Invalid image reference '{reference}': {message}")]
    ReferenceParse { reference: String, message: String },

    /// Source image could not be fetched
    #[error("Failed to fetch {reference}: {message}")]
    Fetch { reference: String, message: String },

    /// Destination image could not be pushed
    #[error("Failed to push {reference}: {message}")]
    Push { reference: String, message: String },

    /// Container registry error
    #[error("Registry error: {registry} - {message}")]
    RegistryError { registry: String, message: String },

    /// Required image label absent
    #[error("could not find label {0}")]
    LabelMissing(String),

    /// Malformed JSON or TOML document
    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    /// Digest string is not `algorithm:hex`
    #[error("Invalid digest '{0}'")]
    InvalidDigest(String),

    /// No layer with the given diff ID in the image
    #[error("Layer with diff ID {diff_id} not found in image")]
    LayerLookup { diff_id: String },

    /// Malformed or unwritable layer archive
    #[error("Archive error: {0}")]
    Archive(String),

    /// OCI image error
    #[error("OCI image error: {0}")]
    OciImageError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RenameError {
    /// Build a `Decode` error for the named document.
    pub fn decode(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        RenameError::Decode {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RenameError {
    fn from(err: serde_json::Error) -> Self {
        RenameError::SerializationError(err.to_string())
    }
}

/// Result type alias for bp-rename operations
pub type Result<T> = std::result::Result<T, RenameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_parse_error_display() {
        let error = RenameError::ReferenceParse {
            reference: "UPPER/Case".to_string(),
            message: "repository name must be lowercase".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid image reference 'UPPER/Case': repository name must be lowercase"
        );
    }

    #[test]
    fn test_fetch_error_display() {
        let error = RenameError::Fetch {
            reference: "gcr.io/org/bp:1".to_string(),
            message: "manifest unknown".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to fetch gcr.io/org/bp:1: manifest unknown"
        );
    }

    #[test]
    fn test_push_error_display() {
        let error = RenameError::Push {
            reference: "gcr.io/org/bp:2".to_string(),
            message: "denied".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to push gcr.io/org/bp:2: denied");
    }

    #[test]
    fn test_label_missing_display() {
        let error = RenameError::LabelMissing("io.buildpacks.buildpack.layers".to_string());
        assert_eq!(
            error.to_string(),
            "could not find label io.buildpacks.buildpack.layers"
        );
    }

    #[test]
    fn test_decode_helper() {
        let error = RenameError::decode("buildpack.toml", "missing field `id`");
        assert!(matches!(error, RenameError::Decode { .. }));
        assert_eq!(
            error.to_string(),
            "Failed to decode buildpack.toml: missing field `id`"
        );
    }

    #[test]
    fn test_layer_lookup_display() {
        let error = RenameError::LayerLookup {
            diff_id: "sha256:abc".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Layer with diff ID sha256:abc not found in image"
        );
    }

    #[test]
    fn test_registry_error_display() {
        let error = RenameError::RegistryError {
            registry: "ghcr.io".to_string(),
            message: "Authentication failed".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Registry error: ghcr.io - Authentication failed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: RenameError = io_error.into();
        assert!(matches!(error, RenameError::IoError(_)));
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let error: RenameError = result.unwrap_err().into();
        assert!(matches!(error, RenameError::SerializationError(_)));
    }
}
