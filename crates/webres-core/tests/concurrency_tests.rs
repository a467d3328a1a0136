//! Concurrency properties of the registry and the variant cache.

use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use webres_core::encoding::ContentEncoding;
use webres_core::{ModuleId, ResourceEntry, ResourceRegistry, Version, VersionConstraint};

/// Source that counts how many times it is opened.
#[derive(Debug)]
struct CountingSource {
	bytes: Vec<u8>,
	opens: Arc<AtomicUsize>,
}

impl webres_core::ResourceSource for CountingSource {
	fn len(&self) -> io::Result<u64> {
		Ok(self.bytes.len() as u64)
	}

	fn last_modified(&self) -> io::Result<SystemTime> {
		Ok(SystemTime::UNIX_EPOCH)
	}

	fn open(&self) -> io::Result<Box<dyn Read + Send>> {
		self.opens.fetch_add(1, Ordering::SeqCst);
		Ok(Box::new(Cursor::new(self.bytes.clone())))
	}
}

#[test]
fn test_compression_runs_at_most_once_under_races() {
	let opens = Arc::new(AtomicUsize::new(0));
	let entry = Arc::new(
		ResourceEntry::new(
			ModuleId::new("mod-a"),
			"ui",
			"app.js",
			Version::new(1, 0, 0),
			CountingSource {
				bytes: b"console.log('x');".repeat(200),
				opens: Arc::clone(&opens),
			},
		)
		.unwrap(),
	);

	let results: Vec<_> = std::thread::scope(|scope| {
		let handles: Vec<_> = (0..16)
			.map(|_| {
				let entry = Arc::clone(&entry);
				scope.spawn(move || entry.variant(ContentEncoding::Gzip).unwrap())
			})
			.collect();
		handles
			.into_iter()
			.map(|handle| handle.join().unwrap())
			.collect()
	});

	// The raw read behind the gzip transform happened exactly once.
	assert_eq!(opens.load(Ordering::SeqCst), 1);

	// Every racing caller observed byte-identical output.
	let first = &results[0];
	assert!(results.iter().all(|bytes| bytes == first));
}

#[test]
fn test_lookup_races_with_module_removal() {
	let registry = Arc::new(ResourceRegistry::new());
	for i in 0..50 {
		registry.add(
			ResourceEntry::new(
				ModuleId::new("mod-a"),
				"ui",
				format!("file{i}.js"),
				Version::new(1, 0, 0),
				webres_core::BytesSource::new(&b"data"[..]),
			)
			.unwrap(),
		);
	}
	registry.add(
		ResourceEntry::new(
			ModuleId::new("mod-b"),
			"ui",
			"keep.js",
			Version::new(1, 0, 0),
			webres_core::BytesSource::new(&b"data"[..]),
		)
		.unwrap(),
	);

	std::thread::scope(|scope| {
		let readers: Vec<_> = (0..8)
			.map(|_| {
				let registry = Arc::clone(&registry);
				scope.spawn(move || {
					for i in 0..50 {
						// Either present or already gone, never torn.
						let _ = registry.lookup(
							"ui",
							&format!("file{i}.js"),
							&VersionConstraint::Latest,
						);
					}
				})
			})
			.collect();

		let remover = {
			let registry = Arc::clone(&registry);
			scope.spawn(move || registry.remove_by_owner(&ModuleId::new("mod-a")))
		};

		for reader in readers {
			reader.join().unwrap();
		}
		assert_eq!(remover.join().unwrap(), 50);
	});

	// The other module's resources survive.
	assert!(
		registry
			.lookup("ui", "keep.js", &VersionConstraint::Latest)
			.is_ok()
	);
	assert_eq!(registry.len(), 1);
}

#[test]
fn test_concurrent_adds_from_distinct_modules() {
	let registry = Arc::new(ResourceRegistry::new());

	std::thread::scope(|scope| {
		for m in 0..4 {
			let registry = Arc::clone(&registry);
			scope.spawn(move || {
				for i in 0..25 {
					registry.add(
						ResourceEntry::new(
							ModuleId::new(format!("mod-{m}")),
							format!("lib{m}"),
							format!("file{i}.js"),
							Version::new(1, 0, 0),
							webres_core::BytesSource::new(&b"data"[..]),
						)
						.unwrap(),
					);
				}
			});
		}
	});

	assert_eq!(registry.len(), 100);
	assert_eq!(registry.enumerate().len(), 100);
}
