//! Immutable resource entries and their encoded-variant cache.

use std::io::{Cursor, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::encoding::{ContentEncoding, compressible};
use crate::error::Result;
use crate::source::ResourceSource;
use crate::version::Version;

/// Identifier of the module that contributed a resource.
///
/// Used only for bulk removal when the module is unloaded; it carries no
/// business meaning beyond ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
	/// Creates a module identifier.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// The identifier text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for ModuleId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ModuleId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

/// One concrete, immutable resource for a specific library + file name +
/// version.
///
/// Identity fields never change after creation; only the per-encoding
/// variant cells transition from absent to present, each at most once.
/// Replacing a re-registered triple therefore swaps the whole entry,
/// which is also what discards its cached variants.
///
/// # Examples
///
/// ```
/// use webres_core::{BytesSource, ModuleId, ResourceEntry, Version};
/// use webres_core::encoding::ContentEncoding;
///
/// let entry = ResourceEntry::new(
/// 	ModuleId::new("mod-a"),
/// 	"ui",
/// 	"app.js",
/// 	Version::new(1, 2, 0),
/// 	BytesSource::new(&b"console.log('hi');"[..]),
/// )
/// .unwrap();
///
/// assert_eq!(entry.raw_length(), 18);
/// assert_eq!(entry.content_length(ContentEncoding::Identity).unwrap(), 18);
/// assert!(entry.content_type().contains("javascript"));
/// ```
#[derive(Debug)]
pub struct ResourceEntry {
	owner: ModuleId,
	library: String,
	file_name: String,
	version: Version,
	content_type: String,
	raw_length: u64,
	last_modified: SystemTime,
	etag: String,
	source: Box<dyn ResourceSource>,
	// One cell per ContentEncoding::ALL slot.
	variants: [OnceCell<Bytes>; 3],
}

impl ResourceEntry {
	/// Creates an entry, reading length and modification time from the
	/// source once and deriving content type and ETag from them.
	///
	/// The ETag digests identity metadata (library, file name, version,
	/// length, mtime) rather than the full content, keeping registration
	/// O(1); that is sound because an entry's bytes are immutable for its
	/// registered lifetime.
	pub fn new(
		owner: ModuleId,
		library: impl Into<String>,
		file_name: impl Into<String>,
		version: Version,
		source: impl ResourceSource + 'static,
	) -> Result<Self> {
		let library = library.into();
		let file_name = file_name.into();

		let raw_length = source.len()?;
		let last_modified = source.last_modified()?;

		let content_type = mime_guess::from_path(&file_name)
			.first_or_octet_stream()
			.to_string();

		let modified_millis = last_modified
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis())
			.unwrap_or(0);
		let digest = md5::compute(format!(
			"{library}/{file_name}:{version}:{raw_length}:{modified_millis}"
		));
		let etag = format!("{digest:x}");

		Ok(Self {
			owner,
			library,
			file_name,
			version,
			content_type,
			raw_length,
			last_modified,
			etag,
			source: Box::new(source),
			variants: [OnceCell::new(), OnceCell::new(), OnceCell::new()],
		})
	}

	/// Owning module.
	pub fn owner(&self) -> &ModuleId {
		&self.owner
	}

	/// Library this entry belongs to; empty for the root library.
	pub fn library(&self) -> &str {
		&self.library
	}

	/// Final path segment, case-sensitive.
	pub fn file_name(&self) -> &str {
		&self.file_name
	}

	/// Registered version.
	pub fn version(&self) -> &Version {
		&self.version
	}

	/// Content type derived from the file extension at registration.
	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	/// Length of the raw (identity) bytes.
	pub fn raw_length(&self) -> u64 {
		self.raw_length
	}

	/// Modification time of the underlying source at registration.
	pub fn last_modified(&self) -> SystemTime {
		self.last_modified
	}

	/// Stable metadata digest, without surrounding quotes.
	pub fn etag(&self) -> &str {
		&self.etag
	}

	/// Encodings this entry can be served in.
	///
	/// Already-compressed content types only offer identity; everything
	/// else also offers gzip and deflate.
	pub fn available_encodings(&self) -> &'static [ContentEncoding] {
		if compressible(&self.content_type) {
			&ContentEncoding::ALL
		} else {
			&ContentEncoding::ALL[..1]
		}
	}

	/// The cached bytes of one encoding, computing them on first access.
	///
	/// Computation is at-most-once per (entry, encoding): racing first
	/// callers converge on a single run of the transform and all observe
	/// the same bytes. A failed attempt leaves the cell empty, so a later
	/// request retries.
	pub fn variant(&self, encoding: ContentEncoding) -> Result<Bytes> {
		let cell = &self.variants[Self::slot(encoding)];
		cell.get_or_try_init(|| self.materialize(encoding)).cloned()
	}

	/// Byte length of one encoding's variant, computing it if needed.
	pub fn content_length(&self, encoding: ContentEncoding) -> Result<u64> {
		Ok(self.variant(encoding)?.len() as u64)
	}

	/// A fresh reader over one encoding's cached bytes.
	///
	/// Readers share the immutable cache; any number of them can run
	/// concurrently without interfering.
	pub fn open_stream(&self, encoding: ContentEncoding) -> Result<impl Read + Send + use<>> {
		Ok(Cursor::new(self.variant(encoding)?))
	}

	fn slot(encoding: ContentEncoding) -> usize {
		match encoding {
			ContentEncoding::Identity => 0,
			ContentEncoding::Gzip => 1,
			ContentEncoding::Deflate => 2,
		}
	}

	fn materialize(&self, encoding: ContentEncoding) -> Result<Bytes> {
		match encoding {
			ContentEncoding::Identity => {
				let mut raw = Vec::with_capacity(self.raw_length as usize);
				self.source.open()?.read_to_end(&mut raw)?;
				debug!(
					library = %self.library,
					file = %self.file_name,
					len = raw.len(),
					"read raw resource bytes"
				);
				Ok(Bytes::from(raw))
			}
			ContentEncoding::Gzip => {
				let raw = self.variant(ContentEncoding::Identity)?;
				let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
				encoder.write_all(&raw)?;
				let compressed = encoder.finish()?;
				debug!(
					library = %self.library,
					file = %self.file_name,
					raw = raw.len(),
					compressed = compressed.len(),
					"gzip variant materialized"
				);
				Ok(Bytes::from(compressed))
			}
			ContentEncoding::Deflate => {
				let raw = self.variant(ContentEncoding::Identity)?;
				let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
				encoder.write_all(&raw)?;
				Ok(Bytes::from(encoder.finish()?))
			}
		}
	}
}
