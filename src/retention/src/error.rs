use std::fmt;
use thiserror::Error;

/// Boxed backend cause (`std::io::Error`, `object_store::Error`, ...).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures reported by a [`Store`](crate::Store) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The prefix could not be enumerated.
    #[error("Failed to list artifacts under '{prefix}': {source}")]
    ListFailed {
        prefix: String,
        #[source]
        source: BoxError,
    },

    /// The source is missing or the destination could not be written.
    #[error("Failed to copy '{source_path}' to '{destination}': {source}")]
    CopyFailed {
        source_path: String,
        destination: String,
        #[source]
        source: BoxError,
    },

    /// The artifact is missing or could not be removed.
    #[error("Failed to delete '{path}': {source}")]
    DeleteFailed {
        path: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn list(prefix: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ListFailed {
            prefix: prefix.into(),
            source: source.into(),
        }
    }

    pub fn copy(
        source_path: impl Into<String>,
        destination: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::CopyFailed {
            source_path: source_path.into(),
            destination: destination.into(),
            source: source.into(),
        }
    }

    pub fn delete(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::DeleteFailed {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Which half of an enforcement run a store failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Promotion,
    Pruning,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Promotion => write!(f, "promotion"),
            Stage::Pruning => write!(f, "pruning"),
        }
    }
}

/// Errors that can occur while building or enforcing a retention policy.
#[derive(Error, Debug)]
pub enum RetentionError {
    /// Tier or mode outside its enumeration, or an unusable combination.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Promotion requested but the root tier is empty.
    #[error("could not find latest snapshot")]
    NoSnapshotAvailable,

    /// A store operation failed. Earlier mutations are not rolled back.
    #[error("{stage} failed: {source}")]
    Store {
        stage: Stage,
        #[source]
        source: StoreError,
    },
}

impl RetentionError {
    pub(crate) fn during(stage: Stage) -> impl FnOnce(StoreError) -> Self {
        move |source| RetentionError::Store { stage, source }
    }

    /// Stage of a store failure, if this is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RetentionError::Store { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
