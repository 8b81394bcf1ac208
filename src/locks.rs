use std::hash::{Hash, Hasher};
use std::{collections::hash_map::DefaultHasher, iter};

use parking_lot::{lock_api::RawRwLock as _, RawRwLock};
use static_assertions::assert_impl_all;

use crate::id::PageId;

/// Which stripe a `PageId` hashes to, in `0..LOCK_STRIPES`.
#[inline]
pub fn stripe_of(page_id: &PageId, num_stripes: usize) -> usize {
	let mut hasher = DefaultHasher::new();
	page_id.file_id.hash(&mut hasher);
	page_id.page_index.hash(&mut hasher);
	(hasher.finish() as usize) % num_stripes
}

#[must_use = "the page lock is released as soon as the guard is dropped"]
pub struct PageReadGuard<'a> {
	lock: &'a RawRwLock,
}

impl<'a> Drop for PageReadGuard<'a> {
	fn drop(&mut self) {
		// Safety: the existence of this guard guarantees the shared lock is held.
		unsafe { self.lock.unlock_shared() };
	}
}

#[must_use = "the page lock is released as soon as the guard is dropped"]
pub struct PageWriteGuard<'a> {
	lock: &'a RawRwLock,
}

impl<'a> Drop for PageWriteGuard<'a> {
	fn drop(&mut self) {
		// Safety: the existence of this guard guarantees the exclusive lock is held.
		unsafe { self.lock.unlock_exclusive() };
	}
}

/// A fixed-size striped array of page-level read/write locks.
///
/// Two `PageId`s that hash to the same stripe are serialized even though
/// they're unrelated; this trades a little concurrency for `O(1)` memory
/// instead of one lock per distinct page ever seen. The stripe index is
/// `hash(file_id, page_index) % num_stripes`.
pub struct PageLocker {
	locks: Box<[RawRwLock]>,
}

impl PageLocker {
	pub fn new(num_stripes: usize) -> Self {
		assert!(num_stripes > 0, "PageLocker needs at least one stripe");
		Self {
			locks: iter::repeat_with(|| RawRwLock::INIT)
				.take(num_stripes)
				.collect(),
		}
	}

	#[inline]
	pub fn num_stripes(&self) -> usize {
		self.locks.len()
	}

	#[inline]
	pub fn stripe_of(&self, page_id: &PageId) -> usize {
		stripe_of(page_id, self.locks.len())
	}

	pub fn read(&self, stripe: usize) -> PageReadGuard<'_> {
		let lock = &self.locks[stripe];
		lock.lock_shared();
		PageReadGuard { lock }
	}

	pub fn write(&self, stripe: usize) -> PageWriteGuard<'_> {
		let lock = &self.locks[stripe];
		lock.lock_exclusive();
		PageWriteGuard { lock }
	}

	/// Acquires the write side of both stripes in ascending index order,
	/// acquiring the lock only once if both pages hash to the same stripe.
	pub fn write_two(&self, a: usize, b: usize) -> (PageWriteGuard<'_>, Option<PageWriteGuard<'_>>) {
		if a == b {
			(self.write(a), None)
		} else {
			let (low, high) = if a < b { (a, b) } else { (b, a) };
			let low_guard = self.write(low);
			let high_guard = self.write(high);
			// Preserve (a, b) order in the return so callers don't need to remember
			// which of the two guards corresponds to which input index.
			if a < b {
				(low_guard, Some(high_guard))
			} else {
				(high_guard, Some(low_guard))
			}
		}
	}
}

// Safety: PageLocker's only interior-mutable state is the raw locks, which
// are designed for concurrent shared access across threads.
unsafe impl Send for PageLocker {}
unsafe impl Sync for PageLocker {}

assert_impl_all!(PageLocker: Send, Sync);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_stripe_is_locked_once() {
		let locker = PageLocker::new(4);
		let (_low, high) = locker.write_two(2, 2);
		assert!(high.is_none());
	}

	#[test]
	fn distinct_stripes_both_lock() {
		let locker = PageLocker::new(4);
		let (_low, high) = locker.write_two(1, 3);
		assert!(high.is_some());
	}

	#[test]
	fn stripe_assignment_is_deterministic() {
		let id = PageId::new("f", 7);
		assert_eq!(stripe_of(&id, 1024), stripe_of(&id, 1024));
	}

	#[test]
	fn read_locks_are_shareable() {
		let locker = PageLocker::new(4);
		let _a = locker.read(0);
		let _b = locker.read(0);
	}
}
