//! Shipping reference number generation.

use std::sync::atomic::{AtomicI64, Ordering};

/// Generates `<prefix>-<order id>-<timestamp>` reference numbers.
///
/// The timestamp is in microseconds and strictly increasing per generator,
/// so two calls never return the same value even within one clock tick.
pub struct ReferenceGenerator {
	prefix: String,
	last_micros: AtomicI64,
}

impl ReferenceGenerator {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			last_micros: AtomicI64::new(0),
		}
	}

	/// Returns a fresh reference number for one creation attempt of
	/// `order_id`.
	pub fn next(&self, order_id: &str) -> String {
		let now = chrono::Utc::now().timestamp_micros();
		let previous = self
			.last_micros
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
				Some(now.max(last + 1))
			})
			.unwrap_or_else(|last| last);
		let stamp = now.max(previous + 1);

		format!("{}-{}-{}", self.prefix, order_id, stamp)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;
	use std::sync::Arc;

	#[test]
	fn test_format() {
		let generator = ReferenceGenerator::new("MKT");
		let reference = generator.next("ord-1");

		let mut parts = reference.splitn(3, '-');
		assert_eq!(parts.next(), Some("MKT"));
		let rest = reference.trim_start_matches("MKT-ord-1-");
		assert!(rest.parse::<i64>().is_ok(), "{reference}");
	}

	#[test]
	fn test_unique_under_concurrency() {
		let generator = Arc::new(ReferenceGenerator::new("MKT"));
		let handles: Vec<_> = (0..8)
			.map(|worker| {
				let generator = Arc::clone(&generator);
				std::thread::spawn(move || {
					(0..250)
						.map(|_| generator.next(&format!("ord-{}", worker % 2)))
						.collect::<Vec<_>>()
				})
			})
			.collect();

		let mut seen = HashSet::new();
		for handle in handles {
			for reference in handle.join().unwrap() {
				assert!(seen.insert(reference), "duplicate reference number");
			}
		}
		assert_eq!(seen.len(), 2000);
	}
}
