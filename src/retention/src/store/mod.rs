//! Storage backends for backup artifacts.
//!
//! Every backend implements the same [`Store`] contract so the retention
//! policy never needs to know which one it runs against:
//!
//! - `local`: a directory tree on the local filesystem
//! - `remote`: any `object_store` backend (S3, in-memory)
//! - `factory`: builds a store from the `[storage]` configuration

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::error::StoreError;

pub mod factory;
pub mod local;
pub mod remote;

pub use factory::{create_s3_builder, create_store};
pub use local::LocalStore;
pub use remote::RemoteStore;

/// List, copy and delete artifacts by `/`-separated path.
///
/// Implementations hold no state besides the handle to their namespace and
/// do not coordinate concurrent callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Artifacts immediately under `prefix`, in backend-defined order.
    ///
    /// Nested directories or common prefixes are excluded. An empty prefix
    /// lists the root. The result is complete, never a single page.
    async fn list(&self, prefix: &str) -> Result<Vec<Artifact>, StoreError>;

    /// Duplicate `source` at `destination`, creating intermediate structure.
    /// The source is left in place.
    async fn copy(&self, source: &str, destination: &str) -> Result<(), StoreError>;

    /// Remove exactly the artifact at `path`. Fails if it does not exist.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}
