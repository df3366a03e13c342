//! One row of a rendered listing: either a downloadable file or a folder.

use std::path::Path;

/// A listing row. The variant follows the storage entry it came from:
/// objects become files, common prefixes become folders.
#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
    File(FileEntry),
    Folder(FolderEntry),
}

impl Entity {
    /// Display name, i.e. the key with the listed prefix removed.
    pub fn name(&self) -> &str {
        match self {
            Entity::File(file) => &file.name,
            Entity::Folder(folder) => &folder.name,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Entity::File(file) => &file.url,
            Entity::Folder(folder) => &folder.url,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entity::Folder(_))
    }
}

/// A concrete object with display-ready metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct FileEntry {
    pub name: String,

    /// Modification time already formatted for display.
    pub last_modified: String,

    /// Size already formatted for display.
    pub size: String,

    /// Time-limited download link.
    pub url: String,

    /// Extension without the dot, empty when the name has none.
    pub extension: String,
}

impl FileEntry {
    pub fn extension_of(name: &str) -> String {
        Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A common prefix, linked back into the listing view.
#[derive(Clone, Debug, PartialEq)]
pub struct FolderEntry {
    pub name: String,
    pub url: String,
}

impl FolderEntry {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let url = format!("./{}", name);
        Self { name, url }
    }
}
