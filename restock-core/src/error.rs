//! Error types for restock-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.restock/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The registry YAML file did not exist at the expected path.
    #[error("registry not found at {path}")]
    RegistryNotFound { path: PathBuf },
}

/// A survey answer that cannot be mapped onto a known category.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown installation frequency answer '{0}'")]
    UnknownInstallationFrequency(String),

    #[error("unknown continuity answer '{0}'")]
    UnknownContinuityFeasibility(String),

    #[error("survey field '{0}' is empty")]
    EmptyField(&'static str),
}

/// Identifier generation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The sequence number does not fit the 3-digit field (valid range 1..=999).
    #[error("store counter {counter} is outside 1..=999; the 3-digit sequence field is exhausted")]
    CounterOutOfRange { counter: u32 },

    /// Not two category digits `1`-`3` followed by a 3-digit sequence.
    #[error("'{raw}' is not a store id (expected e.g. 11007)")]
    Malformed { raw: String },
}

/// Errors loading or validating `~/.restock/config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config not found at {path}; run `restock init` first")]
    NotFound { path: PathBuf },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A setting required by the requested operation is absent.
    #[error("missing configuration value: {0}")]
    Missing(&'static str),

    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
