//! Versions, version ranges, and client constraints.
//!
//! A resource version is three numeric parts plus an optional textual
//! qualifier (`major.minor.micro.qualifier`). Versions are totally
//! ordered: numerically on the three parts, then by qualifier, where a
//! missing qualifier sorts before any present one.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::WebResourceError;

/// A three-part ordered version with an optional qualifier.
///
/// Missing numeric segments default to zero, so `"1"`, `"1.0"` and
/// `"1.0.0"` denote the same version.
///
/// # Examples
///
/// ```
/// use webres_core::Version;
///
/// let a: Version = "1.2".parse().unwrap();
/// let b: Version = "1.2.0".parse().unwrap();
/// let c: Version = "1.2.0.beta".parse().unwrap();
/// assert_eq!(a, b);
/// assert!(b < c);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
	/// Major segment.
	pub major: u32,
	/// Minor segment.
	pub minor: u32,
	/// Micro segment.
	pub micro: u32,
	/// Optional qualifier, compared lexicographically.
	pub qualifier: Option<String>,
}

impl Version {
	/// Creates a version from its three numeric segments.
	pub fn new(major: u32, minor: u32, micro: u32) -> Self {
		Self {
			major,
			minor,
			micro,
			qualifier: None,
		}
	}

	/// Attaches a qualifier to this version.
	pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
		self.qualifier = Some(qualifier.into());
		self
	}
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> Ordering {
		(self.major, self.minor, self.micro)
			.cmp(&(other.major, other.minor, other.micro))
			.then_with(|| self.qualifier.cmp(&other.qualifier))
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl fmt::Display for Version {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
		if let Some(q) = &self.qualifier {
			write!(f, ".{}", q)?;
		}
		Ok(())
	}
}

impl FromStr for Version {
	type Err = WebResourceError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(WebResourceError::InvalidVersion {
				input: s.to_string(),
			});
		}

		let mut numeric = [0u32; 3];
		let mut qualifier = None;
		for (i, part) in s.splitn(4, '.').enumerate() {
			if i < 3 {
				numeric[i] =
					part.parse()
						.map_err(|_| WebResourceError::InvalidVersion {
							input: s.to_string(),
						})?;
			} else {
				if part.is_empty()
					|| !part
						.chars()
						.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
				{
					return Err(WebResourceError::InvalidVersion {
						input: s.to_string(),
					});
				}
				qualifier = Some(part.to_string());
			}
		}

		Ok(Self {
			major: numeric[0],
			minor: numeric[1],
			micro: numeric[2],
			qualifier,
		})
	}
}

/// A version interval with a floor and an optional ceiling.
///
/// Parsed from mathematical interval syntax: `[` / `]` for inclusive
/// bounds, `(` / `)` for exclusive ones. An empty ceiling leaves the
/// range open-ended upwards.
///
/// # Examples
///
/// ```
/// use webres_core::{Version, VersionRange};
///
/// let range: VersionRange = "[1.0,2.0)".parse().unwrap();
/// assert!(range.contains(&Version::new(1, 0, 0)));
/// assert!(range.contains(&Version::new(1, 9, 9)));
/// assert!(!range.contains(&Version::new(2, 0, 0)));
///
/// let open: VersionRange = "[1.5,)".parse().unwrap();
/// assert!(open.contains(&Version::new(40, 0, 0)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
	/// Lower bound.
	pub floor: Version,
	/// Whether the lower bound itself is inside the range.
	pub floor_inclusive: bool,
	/// Upper bound; `None` means unbounded.
	pub ceiling: Option<Version>,
	/// Whether the upper bound itself is inside the range.
	pub ceiling_inclusive: bool,
}

impl VersionRange {
	/// Returns `true` when no version can satisfy the range: the floor
	/// exceeds the ceiling, or they are equal with an exclusive bound.
	///
	/// Such ranges parse fine (`[2.0,1.0)` is syntactically valid), so
	/// resolution must treat them as matching nothing rather than
	/// rejecting the request.
	pub fn is_empty(&self) -> bool {
		let Some(ceiling) = &self.ceiling else {
			return false;
		};
		match self.floor.cmp(ceiling) {
			Ordering::Greater => true,
			Ordering::Equal => !(self.floor_inclusive && self.ceiling_inclusive),
			Ordering::Less => false,
		}
	}

	/// Returns `true` when `version` satisfies both bounds.
	pub fn contains(&self, version: &Version) -> bool {
		let above_floor = if self.floor_inclusive {
			*version >= self.floor
		} else {
			*version > self.floor
		};
		if !above_floor {
			return false;
		}
		match &self.ceiling {
			None => true,
			Some(ceiling) if self.ceiling_inclusive => version <= ceiling,
			Some(ceiling) => version < ceiling,
		}
	}
}

impl fmt::Display for VersionRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}{},",
			if self.floor_inclusive { '[' } else { '(' },
			self.floor
		)?;
		if let Some(ceiling) = &self.ceiling {
			write!(f, "{}", ceiling)?;
		}
		write!(f, "{}", if self.ceiling_inclusive { ']' } else { ')' })
	}
}

impl FromStr for VersionRange {
	type Err = WebResourceError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = |reason: &str| WebResourceError::InvalidConstraint {
			input: s.to_string(),
			reason: reason.to_string(),
		};

		let trimmed = s.trim();
		let mut chars = trimmed.chars();
		let floor_inclusive = match chars.next() {
			Some('[') => true,
			Some('(') => false,
			_ => return Err(invalid("range must start with '[' or '('")),
		};
		let ceiling_inclusive = match chars.next_back() {
			Some(']') => true,
			Some(')') => false,
			_ => return Err(invalid("range must end with ']' or ')'")),
		};

		let inner = &trimmed[1..trimmed.len() - 1];
		let (floor_text, ceiling_text) = inner
			.split_once(',')
			.ok_or_else(|| invalid("range must contain a ','"))?;

		let floor = floor_text
			.trim()
			.parse()
			.map_err(|_| invalid("floor is not a valid version"))?;

		let ceiling_text = ceiling_text.trim();
		let ceiling = if ceiling_text.is_empty() {
			None
		} else {
			Some(
				ceiling_text
					.parse()
					.map_err(|_| invalid("ceiling is not a valid version"))?,
			)
		};

		Ok(Self {
			floor,
			floor_inclusive,
			ceiling,
			ceiling_inclusive,
		})
	}
}

/// A client-supplied version requirement.
///
/// Derived from the optional `version` query parameter:
///
/// - absent or empty ⇒ [`VersionConstraint::Latest`] (newest wins)
/// - interval syntax ⇒ [`VersionConstraint::Range`]
/// - a bare version ⇒ [`VersionConstraint::Exact`]
/// - anything else ⇒ [`WebResourceError::InvalidConstraint`], never
///   silently downgraded to "no constraint"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
	/// No constraint; resolve to the highest registered version.
	Latest,
	/// Exactly this version, or nothing.
	Exact(Version),
	/// The highest version inside the interval, or nothing.
	Range(VersionRange),
}

impl VersionConstraint {
	/// Parses the raw `version` query parameter.
	///
	/// # Examples
	///
	/// ```
	/// use webres_core::{Version, VersionConstraint};
	///
	/// assert_eq!(
	/// 	VersionConstraint::parse(None).unwrap(),
	/// 	VersionConstraint::Latest,
	/// );
	/// assert_eq!(
	/// 	VersionConstraint::parse(Some("1.2.0")).unwrap(),
	/// 	VersionConstraint::Exact(Version::new(1, 2, 0)),
	/// );
	/// assert!(matches!(
	/// 	VersionConstraint::parse(Some("[1.0,2.0)")).unwrap(),
	/// 	VersionConstraint::Range(_),
	/// ));
	/// assert!(VersionConstraint::parse(Some("not-a-version")).is_err());
	/// ```
	pub fn parse(raw: Option<&str>) -> Result<Self, WebResourceError> {
		let raw = match raw {
			None => return Ok(Self::Latest),
			Some(r) if r.trim().is_empty() => return Ok(Self::Latest),
			Some(r) => r.trim(),
		};

		if raw.starts_with('[') || raw.starts_with('(') {
			return raw.parse().map(Self::Range);
		}

		match raw.parse() {
			Ok(version) => Ok(Self::Exact(version)),
			Err(_) => Err(WebResourceError::InvalidConstraint {
				input: raw.to_string(),
				reason: "expected a version or an interval like [1.0,2.0)".to_string(),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("1", Version::new(1, 0, 0))]
	#[case("1.2", Version::new(1, 2, 0))]
	#[case("1.2.3", Version::new(1, 2, 3))]
	#[case("1.2.3.beta-1", Version::new(1, 2, 3).with_qualifier("beta-1"))]
	#[case(" 2.0.1 ", Version::new(2, 0, 1))]
	fn test_version_parse(#[case] input: &str, #[case] expected: Version) {
		assert_eq!(input.parse::<Version>().unwrap(), expected);
	}

	#[rstest]
	#[case("")]
	#[case("a.b.c")]
	#[case("1.2.x")]
	#[case("1..3")]
	#[case("1.2.3.")]
	#[case("1.2.3.qual!fier")]
	fn test_version_parse_rejects(#[case] input: &str) {
		assert!(input.parse::<Version>().is_err());
	}

	#[test]
	fn test_version_ordering() {
		let mut versions: Vec<Version> = ["2.0.0", "1.10.0", "1.2.0", "1.2.0.beta", "1.2.10"]
			.iter()
			.map(|s| s.parse().unwrap())
			.collect();
		versions.sort();

		let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
		assert_eq!(
			rendered,
			vec!["1.2.0", "1.2.0.beta", "1.2.10", "1.10.0", "2.0.0"]
		);
	}

	#[test]
	fn test_qualifier_sorts_after_plain_release() {
		let plain: Version = "1.0.0".parse().unwrap();
		let qualified: Version = "1.0.0.alpha".parse().unwrap();
		assert!(plain < qualified);
	}

	#[rstest]
	#[case("[1.0,2.0)", "1.0.0", true)]
	#[case("[1.0,2.0)", "1.9.9", true)]
	#[case("[1.0,2.0)", "2.0.0", false)]
	#[case("[1.0,2.0]", "2.0.0", true)]
	#[case("(1.0,2.0]", "1.0.0", false)]
	#[case("[1.5,)", "99.0.0", true)]
	#[case("[1.5,)", "1.4.9", false)]
	fn test_range_contains(#[case] range: &str, #[case] version: &str, #[case] expected: bool) {
		let range: VersionRange = range.parse().unwrap();
		let version: Version = version.parse().unwrap();
		assert_eq!(range.contains(&version), expected);
	}

	#[rstest]
	#[case("[2.0,1.0)", true)]
	#[case("(1.0,1.0)", true)]
	#[case("[1.0,1.0)", true)]
	#[case("(1.0,1.0]", true)]
	#[case("[1.0,1.0]", false)]
	#[case("[1.0,2.0)", false)]
	#[case("[1.0,)", false)]
	fn test_range_emptiness(#[case] input: &str, #[case] empty: bool) {
		let range: VersionRange = input.parse().unwrap();
		assert_eq!(range.is_empty(), empty);
	}

	#[rstest]
	#[case("[1.0 2.0)")]
	#[case("1.0,2.0)")]
	#[case("[1.0,2.0")]
	#[case("[x,2.0)")]
	#[case("[1.0,y)")]
	fn test_range_parse_rejects(#[case] input: &str) {
		assert!(input.parse::<VersionRange>().is_err());
	}

	#[test]
	fn test_constraint_empty_is_latest() {
		assert_eq!(
			VersionConstraint::parse(Some("   ")).unwrap(),
			VersionConstraint::Latest
		);
	}

	#[test]
	fn test_constraint_error_keeps_input() {
		let err = VersionConstraint::parse(Some("garbage")).unwrap_err();
		assert!(err.to_string().contains("garbage"));
	}
}
