use async_trait::async_trait;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use std::sync::Arc;

use super::Store;
use crate::artifact::Artifact;
use crate::error::StoreError;

/// Store backed by an object store bucket.
///
/// Listing uses the `/` delimiter so only immediate children of a prefix are
/// returned. `list_with_delimiter` follows continuation tokens internally, so
/// the result is always the complete set. Artifact creation time is the
/// object's last-modified time.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    object_store: Arc<dyn ObjectStore>,
    location: String,
}

impl RemoteStore {
    /// Wrap an object store. `location` is only used in log output.
    pub fn new(object_store: Arc<dyn ObjectStore>, location: impl Into<String>) -> Self {
        Self {
            object_store,
            location: location.into(),
        }
    }
}

#[async_trait]
impl Store for RemoteStore {
    async fn list(&self, prefix: &str) -> Result<Vec<Artifact>, StoreError> {
        let prefix_path = match prefix.trim_matches('/') {
            "" => None,
            trimmed => Some(ObjectPath::from(trimmed)),
        };

        let result = self
            .object_store
            .list_with_delimiter(prefix_path.as_ref())
            .await
            .map_err(|e| StoreError::list(prefix, e))?;

        let artifacts: Vec<Artifact> = result
            .objects
            .into_iter()
            .map(|meta| {
                Artifact::new(meta.location.to_string(), meta.last_modified).with_size(meta.size)
            })
            .collect();
        let total_bytes: u64 = artifacts.iter().map(|a| a.size_bytes).sum();

        tracing::debug!(
            location = %self.location,
            prefix = %prefix,
            count = artifacts.len(),
            total_bytes,
            skipped_prefixes = result.common_prefixes.len(),
            "Listed remote artifacts"
        );

        Ok(artifacts)
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), StoreError> {
        // Listed names are raw keys, so parse rather than re-encode them
        let from = ObjectPath::parse(source)
            .map_err(|e| StoreError::copy(source, destination, e))?;
        let to = ObjectPath::parse(destination)
            .map_err(|e| StoreError::copy(source, destination, e))?;

        self.object_store
            .copy(&from, &to)
            .await
            .map_err(|e| StoreError::copy(source, destination, e))?;

        tracing::debug!(
            location = %self.location,
            source = %from,
            destination = %to,
            "Copied remote artifact"
        );

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let target = ObjectPath::parse(path).map_err(|e| StoreError::delete(path, e))?;

        // Object store deletes succeed for missing keys
        self.object_store
            .head(&target)
            .await
            .map_err(|e| StoreError::delete(path, e))?;

        self.object_store
            .delete(&target)
            .await
            .map_err(|e| StoreError::delete(path, e))?;

        tracing::debug!(location = %self.location, path = %target, "Deleted remote artifact");
        Ok(())
    }
}
