use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[cfg(test)]
use mockall::automock;

/// The metrics capability the Cache Manager emits through.
///
/// The concrete registry/reporting backend is out of scope for this crate -
/// a host wires its own implementation (Prometheus, StatsD, ...) outside
/// this crate. [`AtomicMetrics`] is the bundled, dependency-free default so
/// the crate is usable standalone and in tests.
#[cfg_attr(test, automock)]
pub trait MetricsSink: Send + Sync {
	/// Bytes successfully written to the page store.
	fn bytes_written(&self, amount: u64);
	/// Bytes removed by eviction.
	fn bytes_evicted(&self, amount: u64);
	/// Pages removed by eviction.
	fn pages_evicted(&self, amount: u64);
	fn put_error(&self);
	fn get_error(&self);
	fn delete_error(&self);
	/// `cache_size - PageStore.bytes()`.
	fn set_space_available(&self, bytes: usize);
	/// `PageStore.bytes()`.
	fn set_space_used(&self, bytes: usize);
}

/// Dependency-free [`MetricsSink`] built from plain atomics. Values can be
/// read back, which is convenient both for a host that wants to poll rather
/// than push and for assertions in tests.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
	bytes_written: AtomicU64,
	bytes_evicted: AtomicU64,
	pages_evicted: AtomicU64,
	put_errors: AtomicU64,
	get_errors: AtomicU64,
	delete_errors: AtomicU64,
	space_available: AtomicUsize,
	space_used: AtomicUsize,
}

impl AtomicMetrics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn bytes_written(&self) -> u64 {
		self.bytes_written.load(Ordering::Relaxed)
	}

	pub fn bytes_evicted(&self) -> u64 {
		self.bytes_evicted.load(Ordering::Relaxed)
	}

	pub fn pages_evicted(&self) -> u64 {
		self.pages_evicted.load(Ordering::Relaxed)
	}

	pub fn put_errors(&self) -> u64 {
		self.put_errors.load(Ordering::Relaxed)
	}

	pub fn get_errors(&self) -> u64 {
		self.get_errors.load(Ordering::Relaxed)
	}

	pub fn delete_errors(&self) -> u64 {
		self.delete_errors.load(Ordering::Relaxed)
	}

	pub fn space_available(&self) -> usize {
		self.space_available.load(Ordering::Relaxed)
	}

	pub fn space_used(&self) -> usize {
		self.space_used.load(Ordering::Relaxed)
	}
}

impl MetricsSink for AtomicMetrics {
	fn bytes_written(&self, amount: u64) {
		self.bytes_written.fetch_add(amount, Ordering::Relaxed);
	}

	fn bytes_evicted(&self, amount: u64) {
		self.bytes_evicted.fetch_add(amount, Ordering::Relaxed);
	}

	fn pages_evicted(&self, amount: u64) {
		self.pages_evicted.fetch_add(amount, Ordering::Relaxed);
	}

	fn put_error(&self) {
		self.put_errors.fetch_add(1, Ordering::Relaxed);
	}

	fn get_error(&self) {
		self.get_errors.fetch_add(1, Ordering::Relaxed);
	}

	fn delete_error(&self) {
		self.delete_errors.fetch_add(1, Ordering::Relaxed);
	}

	fn set_space_available(&self, bytes: usize) {
		self.space_available.store(bytes, Ordering::Relaxed);
	}

	fn set_space_used(&self, bytes: usize) {
		self.space_used.store(bytes, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accumulates_counters_and_meters() {
		let metrics = AtomicMetrics::new();
		metrics.bytes_written(512);
		metrics.bytes_written(512);
		metrics.put_error();

		assert_eq!(metrics.bytes_written(), 1024);
		assert_eq!(metrics.put_errors(), 1);
	}

	#[test]
	fn gauges_are_set_not_accumulated() {
		let metrics = AtomicMetrics::new();
		metrics.set_space_used(100);
		metrics.set_space_used(50);

		assert_eq!(metrics.space_used(), 50);
	}
}
