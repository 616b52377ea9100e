//! Errors raised while loading a registry manifest.

use std::path::PathBuf;

use thiserror::Error;

/// The manifest could not be read or describes an invalid registry.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or has unknown keys.
    #[error("failed to parse manifest {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The manifest parsed but violates a registry rule (empty or duplicate names).
    #[error("invalid manifest: {message}")]
    Invalid { message: String },
}
