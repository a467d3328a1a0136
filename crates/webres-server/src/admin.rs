//! Read-only diagnostic inventory.
//!
//! Administration UIs consume this instead of touching the registry
//! directly; everything here is a snapshot, so a slow consumer never
//! holds the index lock.

use serde::Serialize;
use webres_core::{ResourceEntry, ResourceRegistry};

/// Descriptive metadata of one registered resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceInfo {
    /// Library the resource lives in; empty for the root library.
    pub library: String,
    /// File name within the library.
    pub file_name: String,
    /// Registered version, rendered.
    pub version: String,
    /// Metadata ETag, without quotes.
    pub etag: String,
    /// Content type derived at registration.
    pub content_type: String,
    /// Length of the raw bytes.
    pub raw_length: u64,
}

impl From<&ResourceEntry> for ResourceInfo {
    fn from(entry: &ResourceEntry) -> Self {
        Self {
            library: entry.library().to_string(),
            file_name: entry.file_name().to_string(),
            version: entry.version().to_string(),
            etag: entry.etag().to_string(),
            content_type: entry.content_type().to_string(),
            raw_length: entry.raw_length(),
        }
    }
}

/// A snapshot of every registered resource, sorted by library, file
/// name, and version.
pub fn inventory(registry: &ResourceRegistry) -> Vec<ResourceInfo> {
    let mut infos: Vec<ResourceInfo> = registry
        .enumerate()
        .iter()
        .map(|entry| ResourceInfo::from(entry.as_ref()))
        .collect();
    infos.sort_by(|a, b| {
        (&a.library, &a.file_name, &a.version).cmp(&(&b.library, &b.file_name, &b.version))
    });
    infos
}

/// The inventory as pretty-printed JSON, for the admin endpoint.
pub fn inventory_json(registry: &ResourceRegistry) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&inventory(registry))
}
