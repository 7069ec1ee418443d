//! String formatting utilities.

/// Truncates an identifier for log output.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Truncates a string to at most `max` characters on a char boundary.
pub fn truncate_chars(input: &str, max: usize) -> String {
	input.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("12345678"), "12345678");
		assert_eq!(truncate_id("123456789"), "12345678..");
		assert_eq!(truncate_id("short"), "short");
	}

	#[test]
	fn test_truncate_chars_respects_multibyte() {
		assert_eq!(truncate_chars("Piña cloth", 4), "Piña");
		assert_eq!(truncate_chars("abc", 10), "abc");
	}
}
