//! Free-text address decomposition.
//!
//! Buyer addresses are stored as a single line such as
//! `"123 Main St, Brgy. San Isidro"`. The carrier wants the barangay
//! (district) in its own field, so the barangay segment is split out of the
//! line before the request is built.

use once_cell::sync::Lazy;
use regex::Regex;

/// District value sent when no barangay can be determined.
pub const UNKNOWN_DISTRICT: &str = "N/A";

/// `Brgy. <name>` or `Barangay <name>` running up to the next comma or the
/// end of the line, together with the comma separating it from what precedes.
static BARANGAY_SEGMENT: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"(?i)(?:,\s*)?\b(?:brgy\.?|barangay)\s+([^,]+)")
		.expect("barangay pattern is a valid regex")
});

/// An address line with its barangay segment split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposedAddress {
	/// The line with the barangay segment removed.
	pub line: String,
	/// Barangay name, if the line contained one.
	pub district: Option<String>,
}

/// Splits the first barangay segment out of `line`.
///
/// A line without a barangay segment is returned trimmed but otherwise
/// unmodified.
pub fn decompose(line: &str) -> DecomposedAddress {
	let line = line.trim();

	let found = BARANGAY_SEGMENT.captures(line).and_then(|caps| {
		let segment = caps.get(0)?;
		let name = caps.get(1)?.as_str().trim();
		(!name.is_empty()).then(|| (segment.range(), name.to_string()))
	});

	match found {
		Some((range, district)) => {
			let mut remaining = String::with_capacity(line.len());
			remaining.push_str(&line[..range.start]);
			remaining.push_str(&line[range.end..]);
			DecomposedAddress {
				line: trim_separators(&remaining).to_string(),
				district: Some(district),
			}
		},
		None => DecomposedAddress {
			line: line.to_string(),
			district: None,
		},
	}
}

/// Returns the barangay in `line`, falling back to `fallback` and then to
/// [`UNKNOWN_DISTRICT`].
pub fn district_or(decomposed: &DecomposedAddress, fallback: Option<&str>) -> String {
	decomposed
		.district
		.clone()
		.or_else(|| {
			fallback
				.map(str::trim)
				.filter(|f| !f.is_empty())
				.map(str::to_string)
		})
		.unwrap_or_else(|| UNKNOWN_DISTRICT.to_string())
}

fn trim_separators(input: &str) -> &str {
	input.trim_matches(|c: char| c == ',' || c.is_whitespace())
}
