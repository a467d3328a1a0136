//! The concurrent resource index.
//!
//! Two cross-referenced maps live behind one lock: the primary index
//! (library → file name → [`VersionSet`]) that lookups descend, and an
//! owner index (module → registered triples) that makes unloading a
//! module a single bulk operation. Guarding both with the same
//! [`parking_lot::RwLock`] keeps them bijective under every interleaving
//! of adds, removals, and lookups - a reader either sees an entry in both
//! or in neither.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::entry::{ModuleId, ResourceEntry};
use crate::error::{Result, WebResourceError};
use crate::version::{Version, VersionConstraint};

/// All registered versions of one (library, file name) pair, kept sorted.
#[derive(Debug, Default)]
pub struct VersionSet {
	entries: BTreeMap<Version, Arc<ResourceEntry>>,
}

impl VersionSet {
	fn new() -> Self {
		Self::default()
	}

	fn insert(&mut self, entry: Arc<ResourceEntry>) -> Option<Arc<ResourceEntry>> {
		self.entries.insert(entry.version().clone(), entry)
	}

	fn remove(&mut self, version: &Version) -> Option<Arc<ResourceEntry>> {
		self.entries.remove(version)
	}

	/// Whether no versions remain; the registry prunes such sets.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Number of registered versions.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Resolves a constraint to the best-matching entry.
	///
	/// - [`VersionConstraint::Latest`] ⇒ the highest version
	/// - [`VersionConstraint::Exact`] ⇒ that version, or nothing
	/// - [`VersionConstraint::Range`] ⇒ the highest version inside the
	///   range; never an out-of-range fallback
	pub fn resolve(&self, constraint: &VersionConstraint) -> Option<Arc<ResourceEntry>> {
		match constraint {
			VersionConstraint::Latest => self.entries.values().next_back().cloned(),
			VersionConstraint::Exact(version) => self.entries.get(version).cloned(),
			VersionConstraint::Range(range) => {
				// BTreeMap::range panics on an inverted interval; an
				// empty range simply matches nothing.
				if range.is_empty() {
					return None;
				}
				let lower = if range.floor_inclusive {
					Bound::Included(&range.floor)
				} else {
					Bound::Excluded(&range.floor)
				};
				let upper = match &range.ceiling {
					None => Bound::Unbounded,
					Some(ceiling) if range.ceiling_inclusive => Bound::Included(ceiling),
					Some(ceiling) => Bound::Excluded(ceiling),
				};
				self.entries
					.range((lower, upper))
					.next_back()
					.map(|(_, entry)| Arc::clone(entry))
			}
		}
	}

	/// Registered versions in ascending order.
	pub fn versions(&self) -> impl Iterator<Item = &Version> {
		self.entries.keys()
	}
}

#[derive(Debug, Default)]
struct Inner {
	// library -> file name -> versions
	libraries: HashMap<String, HashMap<String, VersionSet>>,
	// module -> (library, file name, version) triples it registered
	owners: HashMap<ModuleId, HashSet<(String, String, Version)>>,
}

/// Concurrent index of every registered resource.
///
/// Shared between request-handling tasks (lookups, enumeration) and the
/// module host (adds, bulk removals). Mutations and reads are exclusive
/// at the index level; entry byte caches have their own narrower
/// synchronization inside [`ResourceEntry`], so the lock is never held
/// across I/O.
///
/// # Examples
///
/// ```
/// use webres_core::{
/// 	BytesSource, ModuleId, ResourceEntry, ResourceRegistry, Version, VersionConstraint,
/// };
///
/// let registry = ResourceRegistry::new();
/// let entry = ResourceEntry::new(
/// 	ModuleId::new("mod-a"),
/// 	"ui",
/// 	"app.js",
/// 	Version::new(1, 2, 0),
/// 	BytesSource::new(&b"console.log('hi');"[..]),
/// )
/// .unwrap();
/// registry.add(entry);
///
/// let found = registry
/// 	.lookup("ui", "app.js", &VersionConstraint::Latest)
/// 	.unwrap();
/// assert_eq!(found.version(), &Version::new(1, 2, 0));
/// ```
#[derive(Debug, Default)]
pub struct ResourceRegistry {
	inner: RwLock<Inner>,
}

impl ResourceRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers an entry in both indices.
	///
	/// An existing identical (library, file name, version) triple is
	/// replaced wholesale - idempotent re-registration. The cached
	/// variants of the replaced entry go away with it, so they are
	/// recomputed lazily from the new source.
	pub fn add(&self, entry: ResourceEntry) {
		let entry = Arc::new(entry);
		let triple = (
			entry.library().to_string(),
			entry.file_name().to_string(),
			entry.version().clone(),
		);

		let mut inner = self.inner.write();

		let replaced = inner
			.libraries
			.entry(triple.0.clone())
			.or_default()
			.entry(triple.1.clone())
			.or_insert_with(VersionSet::new)
			.insert(Arc::clone(&entry));

		if let Some(old) = replaced {
			debug!(
				library = %triple.0,
				file = %triple.1,
				version = %triple.2,
				old_owner = %old.owner(),
				new_owner = %entry.owner(),
				"replacing re-registered resource"
			);
			if let Some(triples) = inner.owners.get_mut(old.owner()) {
				triples.remove(&triple);
				if triples.is_empty() {
					inner.owners.remove(old.owner());
				}
			}
		}

		inner
			.owners
			.entry(entry.owner().clone())
			.or_default()
			.insert(triple);

		info!(
			owner = %entry.owner(),
			library = %entry.library(),
			file = %entry.file_name(),
			version = %entry.version(),
			"resource registered"
		);
	}

	/// Removes every entry registered by `owner`, pruning emptied version
	/// sets, file maps, and library levels. Returns how many entries went
	/// away.
	///
	/// Atomic with respect to lookups: an in-flight read sees the index
	/// either before or after the whole removal, never in between.
	pub fn remove_by_owner(&self, owner: &ModuleId) -> usize {
		let mut inner = self.inner.write();

		let Some(triples) = inner.owners.remove(owner) else {
			return 0;
		};

		let mut removed = 0;
		for (library, file_name, version) in triples {
			let file_map = inner
				.libraries
				.get_mut(&library)
				.unwrap_or_else(|| panic!("registry cross-reference violated: library '{library}' missing for owner {owner}"));
			let set = file_map
				.get_mut(&file_name)
				.unwrap_or_else(|| panic!("registry cross-reference violated: file '{library}/{file_name}' missing for owner {owner}"));

			if set.remove(&version).is_some() {
				removed += 1;
			} else {
				panic!(
					"registry cross-reference violated: version {version} of '{library}/{file_name}' missing for owner {owner}"
				);
			}

			if set.is_empty() {
				file_map.remove(&file_name);
			}
			if file_map.is_empty() {
				inner.libraries.remove(&library);
			}
		}

		info!(owner = %owner, removed, "module resources removed");
		removed
	}

	/// Looks up the entry best matching a constraint.
	///
	/// Unknown library, unknown file name, and "no version in range" all
	/// surface as the same [`WebResourceError::NotFound`].
	pub fn lookup(
		&self,
		library: &str,
		file_name: &str,
		constraint: &VersionConstraint,
	) -> Result<Arc<ResourceEntry>> {
		let inner = self.inner.read();
		inner
			.libraries
			.get(library)
			.and_then(|files| files.get(file_name))
			.and_then(|set| set.resolve(constraint))
			.ok_or_else(|| WebResourceError::NotFound {
				library: library.to_string(),
				file_name: file_name.to_string(),
			})
	}

	/// A snapshot of every registered entry, for diagnostic consumers.
	///
	/// Reflects the index at call time; later mutations do not affect the
	/// returned entries.
	pub fn enumerate(&self) -> Vec<Arc<ResourceEntry>> {
		let inner = self.inner.read();
		inner
			.libraries
			.values()
			.flat_map(|files| files.values())
			.flat_map(|set| set.entries.values())
			.cloned()
			.collect()
	}

	/// Total number of registered entries.
	pub fn len(&self) -> usize {
		let inner = self.inner.read();
		inner
			.libraries
			.values()
			.flat_map(|files| files.values())
			.map(|set| set.len())
			.sum()
	}

	/// Whether no entries are registered.
	pub fn is_empty(&self) -> bool {
		self.inner.read().libraries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::BytesSource;

	fn entry(owner: &str, library: &str, file: &str, version: &str) -> ResourceEntry {
		ResourceEntry::new(
			ModuleId::new(owner),
			library,
			file,
			version.parse().unwrap(),
			BytesSource::new(&b"content"[..]),
		)
		.unwrap()
	}

	#[test]
	fn test_lookup_latest_returns_max_version() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));
		registry.add(entry("mod-a", "ui", "app.js", "1.10.0"));
		registry.add(entry("mod-a", "ui", "app.js", "1.2.0"));

		let found = registry
			.lookup("ui", "app.js", &VersionConstraint::Latest)
			.unwrap();
		assert_eq!(found.version(), &Version::new(1, 10, 0));
	}

	#[test]
	fn test_lookup_exact() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));
		registry.add(entry("mod-a", "ui", "app.js", "2.0.0"));

		let constraint = VersionConstraint::Exact(Version::new(1, 0, 0));
		let found = registry.lookup("ui", "app.js", &constraint).unwrap();
		assert_eq!(found.version(), &Version::new(1, 0, 0));

		let missing = VersionConstraint::Exact(Version::new(3, 0, 0));
		assert!(registry.lookup("ui", "app.js", &missing).is_err());
	}

	#[test]
	fn test_lookup_range_picks_highest_in_range() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));
		registry.add(entry("mod-a", "ui", "app.js", "1.5.0"));
		registry.add(entry("mod-a", "ui", "app.js", "2.0.0"));

		let constraint = VersionConstraint::parse(Some("[1.0,2.0)")).unwrap();
		let found = registry.lookup("ui", "app.js", &constraint).unwrap();
		assert_eq!(found.version(), &Version::new(1, 5, 0));
	}

	#[test]
	fn test_lookup_inverted_range_is_not_found() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.5.0"));

		let constraint = VersionConstraint::parse(Some("[2.0,1.0)")).unwrap();
		let err = registry.lookup("ui", "app.js", &constraint).unwrap_err();
		assert!(matches!(err, WebResourceError::NotFound { .. }));
	}

	#[test]
	fn test_lookup_degenerate_exclusive_range_is_not_found() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));

		let constraint = VersionConstraint::parse(Some("(1.0,1.0)")).unwrap();
		assert!(registry.lookup("ui", "app.js", &constraint).is_err());

		// The inclusive point interval still matches.
		let point = VersionConstraint::parse(Some("[1.0,1.0]")).unwrap();
		assert!(registry.lookup("ui", "app.js", &point).is_ok());
	}

	#[test]
	fn test_lookup_range_never_falls_back_outside() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "3.0.0"));

		let constraint = VersionConstraint::parse(Some("[1.0,2.0)")).unwrap();
		assert!(registry.lookup("ui", "app.js", &constraint).is_err());
	}

	#[test]
	fn test_lookup_unknown_library_is_not_found() {
		let registry = ResourceRegistry::new();
		let err = registry
			.lookup("nope", "app.js", &VersionConstraint::Latest)
			.unwrap_err();
		assert!(matches!(err, WebResourceError::NotFound { .. }));
	}

	#[test]
	fn test_remove_by_owner_only_touches_that_owner() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));
		registry.add(entry("mod-a", "ui", "style.css", "1.0.0"));
		registry.add(entry("mod-b", "ui", "vendor.js", "2.0.0"));

		let removed = registry.remove_by_owner(&ModuleId::new("mod-a"));
		assert_eq!(removed, 2);

		assert!(
			registry
				.lookup("ui", "app.js", &VersionConstraint::Latest)
				.is_err()
		);
		assert!(
			registry
				.lookup("ui", "vendor.js", &VersionConstraint::Latest)
				.is_ok()
		);
	}

	#[test]
	fn test_remove_by_owner_prunes_empty_levels() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));
		registry.remove_by_owner(&ModuleId::new("mod-a"));

		assert!(registry.is_empty());
		assert_eq!(registry.len(), 0);
	}

	#[test]
	fn test_remove_unknown_owner_is_noop() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));
		assert_eq!(registry.remove_by_owner(&ModuleId::new("ghost")), 0);
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn test_reregistration_replaces_and_moves_ownership() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));
		registry.add(entry("mod-b", "ui", "app.js", "1.0.0"));
		assert_eq!(registry.len(), 1);

		// The old owner no longer holds the triple.
		assert_eq!(registry.remove_by_owner(&ModuleId::new("mod-a")), 0);
		assert_eq!(registry.len(), 1);

		assert_eq!(registry.remove_by_owner(&ModuleId::new("mod-b")), 1);
		assert!(registry.is_empty());
	}

	#[test]
	fn test_enumerate_is_a_snapshot() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "ui", "app.js", "1.0.0"));
		registry.add(entry("mod-a", "ui", "style.css", "1.0.0"));

		let snapshot = registry.enumerate();
		registry.remove_by_owner(&ModuleId::new("mod-a"));

		assert_eq!(snapshot.len(), 2);
		assert!(registry.is_empty());
	}

	#[test]
	fn test_root_library_lookup() {
		let registry = ResourceRegistry::new();
		registry.add(entry("mod-a", "", "favicon.ico", "1.0.0"));
		assert!(
			registry
				.lookup("", "favicon.ico", &VersionConstraint::Latest)
				.is_ok()
		);
	}
}
