use anyhow::{Context, Result};
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use std::sync::Arc;
use url::Url;

use common::config::{StorageBackend, StorageConfig};

use super::{LocalStore, RemoteStore, Store};

/// Create a store from storage configuration
pub fn create_store(storage_config: &StorageConfig) -> Result<Box<dyn Store>> {
    let store: Box<dyn Store> = match storage_config.backend()? {
        StorageBackend::Local { dir } => {
            tracing::info!(dir = %dir, "Using local storage backend");
            Box::new(LocalStore::new(dir))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using empty in-memory storage backend, suitable for smoke testing only");
            Box::new(RemoteStore::new(Arc::new(InMemory::new()), "memory://"))
        }
        StorageBackend::S3 {
            bucket,
            endpoint,
            region,
        } => {
            tracing::info!(bucket = %bucket, "Using s3 storage backend");
            let object_store = create_s3_builder(&bucket, endpoint.as_ref(), region.as_deref())
                .build()
                .with_context(|| format!("Failed to build S3 client for bucket '{bucket}'"))?;
            Box::new(RemoteStore::new(
                Arc::new(object_store),
                format!("s3://{bucket}"),
            ))
        }
    };

    Ok(store)
}

/// Create an S3 builder for `bucket`.
///
/// Credentials and region come from the ambient `AWS_*` environment unless a
/// region is given explicitly. A custom endpoint switches to path-style
/// requests, which S3-compatible stores (MinIO etc) require.
pub fn create_s3_builder(
    bucket: &str,
    endpoint: Option<&Url>,
    region: Option<&str>,
) -> AmazonS3Builder {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

    if let Some(region) = region {
        builder = builder.with_region(region);
    }

    if let Some(endpoint) = endpoint {
        builder = builder
            .with_endpoint(endpoint.as_str().trim_end_matches('/'))
            .with_allow_http(endpoint.scheme() == "http")
            .with_virtual_hosted_style_request(false);
    }

    builder
}
