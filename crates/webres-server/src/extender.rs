//! Module-host integration.
//!
//! The module host tells us which modules are active and what their
//! resource manifests declare; this module turns those notifications
//! into registry mutations. It deliberately knows nothing about how
//! modules are discovered - it consumes two event shapes and nothing
//! else.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{info, warn};
use walkdir::WalkDir;
use webres_core::{
    FileSource, ModuleId, ResourceEntry, ResourceRegistry, ResourceSource, Version,
};

/// One file declared by a module's resource manifest.
#[derive(Debug)]
pub struct ManifestEntry {
    /// Path of the file within the module, including the resource folder
    /// prefix (e.g. `META-INF/resources/js/app.js`).
    pub relative_path: String,
    /// Where the bytes live; owned by the module host.
    pub source: Box<dyn ResourceSource>,
}

impl ManifestEntry {
    /// Creates a manifest entry.
    pub fn new(relative_path: impl Into<String>, source: impl ResourceSource + 'static) -> Self {
        Self {
            relative_path: relative_path.into(),
            source: Box::new(source),
        }
    }
}

/// A module's declared resource group: library prefix, resource folder,
/// version, and the files found under that folder.
#[derive(Debug)]
pub struct ModuleRegistration {
    /// The contributing module.
    pub owner: ModuleId,
    /// Library namespace prefix from the manifest; may be empty.
    pub library_prefix: String,
    /// Folder within the module that holds the resources.
    pub resource_folder: String,
    /// Version declared by the manifest, if any.
    pub version: Option<Version>,
    /// The module's own version - the fallback when the manifest does
    /// not declare one.
    pub module_version: Version,
    /// Files under the resource folder.
    pub entries: Vec<ManifestEntry>,
}

/// Registration and removal notifications from the module host.
#[derive(Debug)]
pub enum ModuleEvent {
    /// A module became active and contributes resources.
    Registered(ModuleRegistration),
    /// A module went away; all its resources must too.
    Removed {
        /// The departing module.
        owner: ModuleId,
    },
}

/// Applies module events to a shared registry.
#[derive(Debug, Clone)]
pub struct ResourceExtender {
    registry: std::sync::Arc<ResourceRegistry>,
}

impl ResourceExtender {
    /// Creates an extender feeding the given registry.
    pub fn new(registry: std::sync::Arc<ResourceRegistry>) -> Self {
        Self { registry }
    }

    /// Applies one event.
    pub fn apply(&self, event: ModuleEvent) {
        match event {
            ModuleEvent::Registered(registration) => {
                self.register(registration);
            }
            ModuleEvent::Removed { owner } => {
                self.registry.remove_by_owner(&owner);
            }
        }
    }

    /// Registers every entry of a module registration; returns how many
    /// made it into the registry.
    ///
    /// Manifest anomalies are tolerated with a warning rather than
    /// rejected: a library prefix with a trailing `/` is stripped, and an
    /// entry whose source cannot be read is skipped.
    pub fn register(&self, registration: ModuleRegistration) -> usize {
        let ModuleRegistration {
            owner,
            mut library_prefix,
            resource_folder,
            version,
            module_version,
            entries,
        } = registration;

        if library_prefix.ends_with('/') {
            warn!(
                owner = %owner,
                prefix = %library_prefix,
                "library prefix should not end with '/'"
            );
            library_prefix.pop();
        }

        let version = version.unwrap_or(module_version);

        let mut added = 0;
        for entry in entries {
            let Some(file_name) = file_name_of(&entry.relative_path) else {
                warn!(
                    owner = %owner,
                    path = %entry.relative_path,
                    "manifest entry has no file name"
                );
                continue;
            };
            let library = derive_library(
                &library_prefix,
                &resource_folder,
                &entry.relative_path,
                &file_name,
            );

            match ResourceEntry::new(
                owner.clone(),
                library,
                file_name,
                version.clone(),
                entry.source,
            ) {
                Ok(resource) => {
                    self.registry.add(resource);
                    added += 1;
                }
                Err(err) => {
                    warn!(
                        owner = %owner,
                        path = %entry.relative_path,
                        %err,
                        "skipping unreadable manifest entry"
                    );
                }
            }
        }

        info!(owner = %owner, added, "module registration applied");
        added
    }

    /// Consumes events until the channel closes.
    pub async fn run(self, mut events: mpsc::Receiver<ModuleEvent>) {
        while let Some(event) = events.recv().await {
            self.apply(event);
        }
        info!("module event channel closed");
    }
}

/// Enumerates the files of a module's resource folder on disk.
///
/// `module_root` is the module's content root; `resource_folder` the
/// manifest-declared folder under it. A missing folder yields an empty
/// list with a warning, mirroring the lenient manifest handling above.
pub fn scan_resource_folder(module_root: &Path, resource_folder: &str) -> Vec<ManifestEntry> {
    let folder = module_root.join(resource_folder);
    if !folder.is_dir() {
        warn!(folder = %folder.display(), "declared resource folder does not exist");
        return Vec::new();
    }

    let mut entries = Vec::new();
    for walked in WalkDir::new(&folder) {
        let walked = match walked {
            Ok(walked) => walked,
            Err(err) => {
                warn!(%err, "error walking resource folder");
                continue;
            }
        };
        if !walked.file_type().is_file() {
            continue;
        }
        let Ok(relative) = walked.path().strip_prefix(module_root) else {
            continue;
        };
        let relative_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(ManifestEntry::new(
            relative_path,
            FileSource::new(walked.path()),
        ));
    }
    entries
}

fn file_name_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Derives the library name for one manifest entry.
///
/// The resource-folder prefix is stripped from the entry path, the
/// remaining directory portion becomes the sub-library, and the join of
/// `library_prefix + "/" + sub_library` is normalized: doubled
/// separators collapse and leading/trailing separators go away. An
/// entry directly in the resource folder of a module without a prefix
/// lands in the root library (empty string).
fn derive_library(
    library_prefix: &str,
    resource_folder: &str,
    entry_path: &str,
    file_name: &str,
) -> String {
    let mut sub = entry_path
        .strip_prefix(resource_folder)
        .unwrap_or(entry_path);
    sub = sub
        .strip_suffix(file_name)
        .unwrap_or(sub)
        .trim_end_matches('/');

    let joined = format!("{library_prefix}/{sub}");
    let mut library = String::with_capacity(joined.len());
    let mut last_was_separator = false;
    for c in joined.chars() {
        if c == '/' {
            if !last_was_separator && !library.is_empty() {
                library.push('/');
            }
            last_was_separator = true;
        } else {
            library.push(c);
            last_was_separator = false;
        }
    }
    library.trim_end_matches('/').to_string()
}
