//! src/services/storage_service.rs
//!
//! Read-only access to the listed bucket: delimited listings and presigned
//! download links. The service never writes to storage.

use crate::models::listing::{ListingEntry, StoredObject};
use anyhow::Context;
use async_trait::async_trait;
use s3::{Bucket, Region, creds::Credentials, error::S3Error, serde_types::ListBucketResult};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("listing prefix `{prefix}` failed: {source}")]
    List {
        prefix: String,
        #[source]
        source: S3Error,
    },
    #[error("signing a download link for `{key}` failed: {source}")]
    Presign {
        key: String,
        #[source]
        source: S3Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage operations the listing pipeline needs.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// List entries under `prefix`, grouping keys that share the next
    /// `delimiter`-separated segment into one prefix entry.
    ///
    /// Entries come back in backend order.
    async fn list(&self, prefix: &str, delimiter: &str) -> StorageResult<Vec<ListingEntry>>;

    /// Build a time-limited GET link for `key`.
    async fn presign_get(&self, key: &str, ttl_secs: u32) -> StorageResult<String>;
}

/// Connection settings for [`S3Lister`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores; `None` targets AWS.
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_access_key: String,
}

/// [`ObjectLister`] over an S3 (or S3-compatible) bucket.
#[derive(Clone)]
pub struct S3Lister {
    bucket: Bucket,
}

impl S3Lister {
    pub fn new(settings: &S3Settings) -> anyhow::Result<Self> {
        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_access_key),
            None,
            None,
            None,
        )
        .context("building storage credentials")?;

        let region = match &settings.endpoint {
            Some(endpoint) => Region::Custom {
                region: settings.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => settings
                .region
                .parse::<Region>()
                .with_context(|| format!("parsing region `{}`", settings.region))?,
        };

        let mut bucket = Bucket::new(&settings.bucket, region, credentials)
            .with_context(|| format!("opening bucket `{}`", settings.bucket))?;
        // S3-compatible stores are usually addressed by path, not virtual host.
        if settings.endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectLister for S3Lister {
    async fn list(&self, prefix: &str, delimiter: &str) -> StorageResult<Vec<ListingEntry>> {
        debug!("listing prefix `{}` in bucket {}", prefix, self.bucket.name());
        let pages = self
            .bucket
            .list(prefix.to_string(), Some(delimiter.to_string()))
            .await
            .map_err(|source| StorageError::List {
                prefix: prefix.to_string(),
                source,
            })?;

        Ok(pages.into_iter().flat_map(page_entries).collect())
    }

    async fn presign_get(&self, key: &str, ttl_secs: u32) -> StorageResult<String> {
        self.bucket
            .presign_get(key, ttl_secs, None)
            .await
            .map_err(|source| StorageError::Presign {
                key: key.to_string(),
                source,
            })
    }
}

/// Flatten one result page, objects first and then common prefixes, the
/// order they appear in the ListBucketResult document.
fn page_entries(page: ListBucketResult) -> Vec<ListingEntry> {
    let objects = page.contents.into_iter().map(|object| {
        ListingEntry::Object(StoredObject {
            key: object.key,
            size: object.size,
            last_modified: object.last_modified,
        })
    });
    let prefixes = page
        .common_prefixes
        .unwrap_or_default()
        .into_iter()
        .map(|common| ListingEntry::Prefix(common.prefix));

    objects.chain(prefixes).collect()
}
