//! Byte sources behind registered resources.
//!
//! The module host owns where resource bytes actually live; the registry
//! only ever reads through this trait. Sources are consulted once for
//! metadata at registration and once per encoding when a variant is
//! first materialized.

use std::fmt;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::time::SystemTime;

use bytes::Bytes;

/// Opaque handle to the raw bytes of one contributed resource.
pub trait ResourceSource: Send + Sync + fmt::Debug {
	/// Raw byte length.
	fn len(&self) -> io::Result<u64>;

	/// Last modification time of the underlying data.
	fn last_modified(&self) -> io::Result<SystemTime>;

	/// Opens a fresh reader over the raw bytes.
	fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

impl ResourceSource for Box<dyn ResourceSource> {
	fn len(&self) -> io::Result<u64> {
		(**self).len()
	}

	fn last_modified(&self) -> io::Result<SystemTime> {
		(**self).last_modified()
	}

	fn open(&self) -> io::Result<Box<dyn Read + Send>> {
		(**self).open()
	}
}

/// A resource backed by a file on disk - the common case for module
/// resource folders.
#[derive(Debug, Clone)]
pub struct FileSource {
	path: PathBuf,
}

impl FileSource {
	/// Creates a source reading from `path`.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// The backing path.
	pub fn path(&self) -> &std::path::Path {
		&self.path
	}
}

impl ResourceSource for FileSource {
	fn len(&self) -> io::Result<u64> {
		Ok(std::fs::metadata(&self.path)?.len())
	}

	fn last_modified(&self) -> io::Result<SystemTime> {
		std::fs::metadata(&self.path)?.modified()
	}

	fn open(&self) -> io::Result<Box<dyn Read + Send>> {
		Ok(Box::new(std::fs::File::open(&self.path)?))
	}
}

/// An in-memory resource, used for embedded assets and tests.
#[derive(Debug, Clone)]
pub struct BytesSource {
	bytes: Bytes,
	modified: SystemTime,
}

impl BytesSource {
	/// Creates a source over the given bytes, stamped with the current
	/// time.
	pub fn new(bytes: impl Into<Bytes>) -> Self {
		Self {
			bytes: bytes.into(),
			modified: SystemTime::now(),
		}
	}

	/// Overrides the modification timestamp.
	pub fn with_modified(mut self, modified: SystemTime) -> Self {
		self.modified = modified;
		self
	}
}

impl ResourceSource for BytesSource {
	fn len(&self) -> io::Result<u64> {
		Ok(self.bytes.len() as u64)
	}

	fn last_modified(&self) -> io::Result<SystemTime> {
		Ok(self.modified)
	}

	fn open(&self) -> io::Result<Box<dyn Read + Send>> {
		Ok(Box::new(Cursor::new(self.bytes.clone())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::TempDir;

	#[test]
	fn test_file_source_reads_bytes() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("app.js");
		let mut file = std::fs::File::create(&path).unwrap();
		write!(file, "console.log('hi');").unwrap();

		let source = FileSource::new(&path);
		assert_eq!(source.len().unwrap(), 18);

		let mut buf = String::new();
		source.open().unwrap().read_to_string(&mut buf).unwrap();
		assert_eq!(buf, "console.log('hi');");
	}

	#[test]
	fn test_file_source_missing_file_errors() {
		let source = FileSource::new("/nonexistent/app.js");
		assert!(source.len().is_err());
		assert!(source.open().is_err());
	}

	#[test]
	fn test_bytes_source_roundtrip() {
		let source = BytesSource::new(&b"body { color: red; }"[..]);
		assert_eq!(source.len().unwrap(), 20);

		let mut buf = Vec::new();
		source.open().unwrap().read_to_end(&mut buf).unwrap();
		assert_eq!(buf, b"body { color: red; }");
	}
}
