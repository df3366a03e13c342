//! Entries returned by the storage backend for a delimited listing.

/// An object as reported by the storage listing, before any formatting.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    /// Full object key.
    pub key: String,

    /// Size in bytes.
    pub size: u64,

    /// Raw `LastModified` value, e.g. `2020-01-02T03:04:05.000Z`.
    pub last_modified: String,
}

/// One entry of a delimited listing, tagged by what the backend returned.
#[derive(Clone, Debug, PartialEq)]
pub enum ListingEntry {
    Object(StoredObject),
    /// A common prefix, keys sharing the next path segment.
    Prefix(String),
}

impl ListingEntry {
    pub fn key(&self) -> &str {
        match self {
            ListingEntry::Object(object) => &object.key,
            ListingEntry::Prefix(prefix) => prefix,
        }
    }
}
