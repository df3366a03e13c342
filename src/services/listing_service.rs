//! src/services/listing_service.rs
//!
//! ListingService turns a path prefix into a rendered listing page and keeps
//! the page in the cache. A request either returns the cached page or
//! rebuilds it from storage and overwrites the cache entry.

use crate::{
    models::{
        entity::{Entity, FileEntry, FolderEntry},
        listing::ListingEntry,
    },
    services::{
        cache::PageCache,
        storage_service::{ObjectLister, StorageError},
    },
    views::{
        format::{FormatError, format_size, format_timestamp},
        templates,
    },
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

/// Delimiter that turns key segments into folders.
pub const DELIMITER: &str = "/";

#[derive(Debug, Error)]
pub enum ListingError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Clone)]
pub struct ListingService {
    lister: Arc<dyn ObjectLister>,
    cache: Arc<dyn PageCache>,
    /// How long a rendered page stays cached.
    cache_ttl: Duration,
    /// Lifetime of generated download links, in seconds.
    link_ttl: u32,
}

impl ListingService {
    pub fn new(
        lister: Arc<dyn ObjectLister>,
        cache: Arc<dyn PageCache>,
        cache_ttl: Duration,
        link_ttl: u32,
    ) -> Self {
        Self {
            lister,
            cache,
            cache_ttl,
            link_ttl,
        }
    }

    /// Return the listing page for `path`.
    ///
    /// `request_uri` is the path and query of the current request and is
    /// used for the refresh link. With `bypass_cache` the cached copy is
    /// ignored and replaced by a freshly built page.
    pub async fn render_listing(
        &self,
        path: &str,
        request_uri: &str,
        bypass_cache: bool,
    ) -> Result<String, ListingError> {
        let key = page_key(path);

        if !bypass_cache {
            match self.cache.get(&key).await {
                Ok(Some(page)) => {
                    debug!("serving `{}` from cache", path);
                    return Ok(page);
                }
                Ok(None) => debug!("cache miss for `{}`", path),
                Err(err) => warn!("cache read for `{}` failed, rebuilding: {}", path, err),
            }
        } else {
            debug!("cache bypass requested for `{}`", path);
        }

        let entities = self.build_entities(path).await?;
        let page = templates::render_listing(
            &display_path(path),
            &flush_url(request_uri, bypass_cache),
            &entities,
        );

        if let Err(err) = self.cache.set(&key, &page, self.cache_ttl).await {
            warn!("failed to update page cache for `{}`: {}", path, err);
        }

        Ok(page)
    }

    /// List `path` in storage and convert every entry, keeping backend order.
    pub async fn build_entities(&self, path: &str) -> Result<Vec<Entity>, ListingError> {
        let entries = self.lister.list(path, DELIMITER).await?;
        debug!("storage returned {} entries for `{}`", entries.len(), path);

        let mut entities = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = strip_listing_prefix(entry.key(), path).to_string();
            let entity = match entry {
                ListingEntry::Object(object) => Entity::File(FileEntry {
                    extension: FileEntry::extension_of(&name),
                    last_modified: format_timestamp(&object.last_modified)?,
                    size: format_size(object.size),
                    url: self.lister.presign_get(&object.key, self.link_ttl).await?,
                    name,
                }),
                ListingEntry::Prefix(_) => Entity::Folder(FolderEntry::new(name)),
            };
            entities.push(entity);
        }
        Ok(entities)
    }
}

/// Cache key for a listing path: hex MD5 of the path.
pub fn page_key(path: &str) -> String {
    format!("{:x}", md5::compute(path.as_bytes()))
}

/// Path shown in the page heading, always rooted.
pub fn display_path(path: &str) -> String {
    format!("/{}", path)
}

/// Refresh link for the page: the current URI with `flush=1` in place of
/// any existing `flush` parameter, or the URI unchanged when this request
/// already bypassed the cache.
pub fn flush_url(request_uri: &str, bypass_cache: bool) -> String {
    if bypass_cache {
        return request_uri.to_string();
    }
    let (path, query) = request_uri.split_once('?').unwrap_or((request_uri, ""));
    let mut params: Vec<&str> = query
        .split('&')
        .filter(|param| !param.is_empty())
        .filter(|param| param.split_once('=').map_or(*param, |(name, _)| name) != "flush")
        .collect();
    params.push("flush=1");
    format!("{}?{}", path, params.join("&"))
}

fn strip_listing_prefix<'a>(key: &'a str, path: &str) -> &'a str {
    key.strip_prefix(path).unwrap_or(key)
}
