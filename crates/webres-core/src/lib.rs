//! # Webres Core
//!
//! Versioned resource registry and content-encoding cache.
//!
//! This crate holds the algorithmic heart of webres:
//!
//! - A concurrent two-level index (library → file name → version set)
//!   that modules populate and drain at runtime while requests are in
//!   flight ([`registry`])
//! - Version-range resolution over totally ordered three-part versions
//!   ([`version`])
//! - Immutable resource entries with lazily computed, memoized encoded
//!   variants - compression runs at most once per entry and encoding no
//!   matter how many requests race to trigger it ([`entry`])
//! - Accept-Encoding negotiation with q-weights and a compressibility
//!   policy keyed by content type ([`encoding`])
//!
//! No HTTP or async machinery lives here; the transport is a separate
//! crate that drives this one.
//!
//! ## Module Structure
//!
//! - [`version`] - versions, ranges, and constraint parsing
//! - [`encoding`] - content encodings and negotiation
//! - [`source`] - opaque byte sources contributed by module hosts
//! - [`entry`] - immutable resource entries and their variant cache
//! - [`registry`] - the concurrent index
//! - [`error`] - error types

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod encoding;
pub mod entry;
pub mod error;
pub mod registry;
pub mod source;
pub mod version;

pub use encoding::{AcceptEncoding, ContentEncoding};
pub use entry::{ModuleId, ResourceEntry};
pub use error::{Result, WebResourceError};
pub use registry::{ResourceRegistry, VersionSet};
pub use source::{BytesSource, FileSource, ResourceSource};
pub use version::{Version, VersionConstraint, VersionRange};
