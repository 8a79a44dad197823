use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::PathBuf;
use tokio::fs;

use super::Store;
use crate::artifact::Artifact;
use crate::error::StoreError;

/// Store backed by a directory on the local filesystem.
///
/// Artifact creation time is the file modification time.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a `/`-separated store path onto the filesystem below the root.
    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    fn key(prefix: &str, file_name: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{prefix}/{file_name}")
        }
    }

    async fn read_artifacts(&self, prefix: &str) -> io::Result<Vec<Artifact>> {
        let mut entries = fs::read_dir(self.resolve(prefix)).await?;
        let mut artifacts = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                continue;
            }

            let file_name = entry.file_name();
            let created_at: DateTime<Utc> = metadata.modified()?.into();
            artifacts.push(
                Artifact::new(Self::key(prefix, &file_name.to_string_lossy()), created_at)
                    .with_size(metadata.len()),
            );
        }

        Ok(artifacts)
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn list(&self, prefix: &str) -> Result<Vec<Artifact>, StoreError> {
        let artifacts = self
            .read_artifacts(prefix)
            .await
            .map_err(|e| StoreError::list(prefix, e))?;
        let total_bytes: u64 = artifacts.iter().map(|a| a.size_bytes).sum();

        tracing::debug!(
            root = %self.root.display(),
            prefix = %prefix,
            count = artifacts.len(),
            total_bytes,
            "Listed local artifacts"
        );

        Ok(artifacts)
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), StoreError> {
        let from = self.resolve(source);
        let to = self.resolve(destination);
        let fail = |e: io::Error| StoreError::copy(source, destination, e);

        let metadata = fs::metadata(&from).await.map_err(fail)?;
        if metadata.is_dir() {
            return Err(fail(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source is a directory",
            )));
        }

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await.map_err(fail)?;
        }

        let bytes = fs::copy(&from, &to).await.map_err(fail)?;

        tracing::debug!(
            source = %from.display(),
            destination = %to.display(),
            bytes,
            "Copied local artifact"
        );

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let target = self.resolve(path);
        fs::remove_file(&target)
            .await
            .map_err(|e| StoreError::delete(path, e))?;

        tracing::debug!(path = %target.display(), "Deleted local artifact");
        Ok(())
    }
}
