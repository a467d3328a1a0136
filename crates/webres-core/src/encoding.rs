//! Content encodings and Accept-Encoding negotiation.

use std::fmt;

/// A content-coding a resource variant can be served in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
	/// The raw bytes as contributed by the module.
	Identity,
	/// gzip-compressed variant.
	Gzip,
	/// deflate-compressed variant.
	Deflate,
}

impl ContentEncoding {
	/// Every supported encoding, identity first.
	pub const ALL: [ContentEncoding; 3] = [
		ContentEncoding::Identity,
		ContentEncoding::Gzip,
		ContentEncoding::Deflate,
	];

	/// The value used in `Content-Encoding` and `Accept-Encoding` headers.
	pub fn header_value(&self) -> &'static str {
		match self {
			ContentEncoding::Identity => "identity",
			ContentEncoding::Gzip => "gzip",
			ContentEncoding::Deflate => "deflate",
		}
	}

	/// Parses a single coding token; unknown codings yield `None`.
	pub fn from_token(token: &str) -> Option<Self> {
		match token.trim().to_ascii_lowercase().as_str() {
			"identity" => Some(ContentEncoding::Identity),
			"gzip" | "x-gzip" => Some(ContentEncoding::Gzip),
			"deflate" => Some(ContentEncoding::Deflate),
			_ => None,
		}
	}

	/// Rank used to break quality ties: smaller transfers win.
	fn tie_rank(&self) -> u8 {
		match self {
			ContentEncoding::Gzip => 2,
			ContentEncoding::Deflate => 1,
			ContentEncoding::Identity => 0,
		}
	}
}

impl fmt::Display for ContentEncoding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.header_value())
	}
}

/// A parsed `Accept-Encoding` header: known codings with their q-weights.
///
/// # Examples
///
/// ```
/// use webres_core::{AcceptEncoding, ContentEncoding};
///
/// let accept = AcceptEncoding::parse("gzip;q=0.8, identity;q=1.0");
/// let chosen = accept.negotiate(&[ContentEncoding::Identity, ContentEncoding::Gzip]);
/// assert_eq!(chosen, ContentEncoding::Identity);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AcceptEncoding {
	prefs: Vec<(ContentEncoding, f32)>,
}

impl AcceptEncoding {
	/// Parses an `Accept-Encoding` header value.
	///
	/// Comma-separated codings, each with an optional `;q=` weight per
	/// RFC 7231. Unknown codings are ignored; a malformed q counts as
	/// zero, which excludes the coding.
	pub fn parse(header: &str) -> Self {
		let mut prefs = Vec::new();
		for part in header.split(',') {
			let mut pieces = part.split(';');
			let token = match pieces.next() {
				Some(t) => t,
				None => continue,
			};
			let Some(encoding) = ContentEncoding::from_token(token) else {
				continue;
			};

			let mut quality = 1.0f32;
			for param in pieces {
				if let Some((key, value)) = param.split_once('=') {
					if key.trim().eq_ignore_ascii_case("q") {
						quality = value.trim().parse().unwrap_or(0.0);
					}
				}
			}
			prefs.push((encoding, quality.clamp(0.0, 1.0)));
		}
		Self { prefs }
	}

	/// An empty header: no stated preferences.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Chooses one encoding from what the entry can produce.
	///
	/// The intersection of client-acceptable codings (q > 0) and
	/// `available` wins on the highest stated q; ties go to the better
	/// compression. An empty intersection falls back to identity - a
	/// request is never failed over an encoding mismatch alone.
	pub fn negotiate(&self, available: &[ContentEncoding]) -> ContentEncoding {
		available
			.iter()
			.filter_map(|encoding| {
				self.prefs
					.iter()
					.find(|(candidate, _)| candidate == encoding)
					.filter(|(_, q)| *q > 0.0)
					.map(|(_, q)| (*encoding, *q))
			})
			.max_by(|(a_enc, a_q), (b_enc, b_q)| {
				a_q.partial_cmp(b_q)
					.unwrap_or(std::cmp::Ordering::Equal)
					.then_with(|| a_enc.tie_rank().cmp(&b_enc.tie_rank()))
			})
			.map(|(encoding, _)| encoding)
			.unwrap_or(ContentEncoding::Identity)
	}
}

/// Content types served verbatim because they are already compressed.
///
/// Compressing these again wastes CPU for no transfer win, so entries
/// with such a type only offer the identity variant.
const INCOMPRESSIBLE_TYPES: &[&str] = &[
	"application/zip",
	"application/gzip",
	"application/x-gzip",
	"application/x-bzip2",
	"application/x-7z-compressed",
	"application/x-rar-compressed",
	"font/woff",
	"font/woff2",
	"application/font-woff",
];

/// Returns `true` when a content type benefits from gzip/deflate.
pub fn compressible(content_type: &str) -> bool {
	let essence = content_type
		.split(';')
		.next()
		.unwrap_or(content_type)
		.trim()
		.to_ascii_lowercase();

	if essence == "image/svg+xml" {
		return true;
	}
	if essence.starts_with("image/")
		|| essence.starts_with("audio/")
		|| essence.starts_with("video/")
	{
		return false;
	}
	!INCOMPRESSIBLE_TYPES.contains(&essence.as_str())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn test_parse_accept_encoding() {
		let accept = AcceptEncoding::parse("gzip, deflate;q=0.5, identity;q=0.1");
		assert_eq!(accept.prefs.len(), 3);
		assert_eq!(accept.prefs[0], (ContentEncoding::Gzip, 1.0));
	}

	#[test]
	fn test_unknown_codings_ignored() {
		let accept = AcceptEncoding::parse("br, zstd, gzip");
		assert_eq!(accept.prefs.len(), 1);
	}

	#[test]
	fn test_negotiate_prefers_highest_quality() {
		let accept = AcceptEncoding::parse("gzip;q=0.8, identity;q=1.0");
		let chosen = accept.negotiate(&[ContentEncoding::Identity, ContentEncoding::Gzip]);
		assert_eq!(chosen, ContentEncoding::Identity);
	}

	#[test]
	fn test_negotiate_tie_prefers_compression() {
		let accept = AcceptEncoding::parse("gzip, identity");
		let chosen = accept.negotiate(&[ContentEncoding::Identity, ContentEncoding::Gzip]);
		assert_eq!(chosen, ContentEncoding::Gzip);
	}

	#[test]
	fn test_negotiate_zero_quality_excludes() {
		let accept = AcceptEncoding::parse("gzip;q=0");
		let chosen = accept.negotiate(&[ContentEncoding::Identity, ContentEncoding::Gzip]);
		assert_eq!(chosen, ContentEncoding::Identity);
	}

	#[test]
	fn test_negotiate_empty_intersection_falls_back_to_identity() {
		let accept = AcceptEncoding::parse("deflate");
		let chosen = accept.negotiate(&[ContentEncoding::Identity, ContentEncoding::Gzip]);
		assert_eq!(chosen, ContentEncoding::Identity);
	}

	#[test]
	fn test_negotiate_only_available_encodings() {
		// Entry is incompressible: only identity on offer.
		let accept = AcceptEncoding::parse("gzip");
		let chosen = accept.negotiate(&[ContentEncoding::Identity]);
		assert_eq!(chosen, ContentEncoding::Identity);
	}

	#[rstest]
	#[case("text/css", true)]
	#[case("application/javascript", true)]
	#[case("image/svg+xml", true)]
	#[case("image/png", false)]
	#[case("video/mp4", false)]
	#[case("application/zip", false)]
	#[case("font/woff2", false)]
	#[case("text/html; charset=utf-8", true)]
	fn test_compressible_policy(#[case] content_type: &str, #[case] expected: bool) {
		assert_eq!(compressible(content_type), expected);
	}
}
