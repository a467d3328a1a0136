//! Error types for the resource registry.

use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, WebResourceError>;

/// Errors surfaced by the resource registry and its collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WebResourceError {
	/// The client supplied a version constraint with invalid syntax.
	///
	/// Must never be conflated with [`WebResourceError::NotFound`]: the
	/// request layer maps this to a 400-class response with the message
	/// in the body.
	#[error("invalid version constraint '{input}': {reason}")]
	InvalidConstraint {
		/// The constraint text as received.
		input: String,
		/// Why it failed to parse.
		reason: String,
	},

	/// A version string could not be parsed.
	#[error("invalid version '{input}'")]
	InvalidVersion {
		/// The version text as received.
		input: String,
	},

	/// No entry matches the requested library, file name, and constraint.
	///
	/// Unknown library, unknown file name, and "no version in range" all
	/// collapse into this variant; callers get no hint of which level
	/// missed or which other versions exist.
	#[error("resource not found: {library}/{file_name}")]
	NotFound {
		/// Requested library.
		library: String,
		/// Requested file name.
		file_name: String,
	},

	/// Reading the underlying source or compressing it failed.
	#[error("resource I/O error: {0}")]
	Io(#[from] std::io::Error),
}
