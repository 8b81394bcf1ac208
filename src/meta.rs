use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;

use crate::id::PageId;

/// Immutable record of a resident page: its id and the size of its body, in
/// bytes. Recorded once, on `add`, and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
	pub page_id: PageId,
	pub page_size: usize,
}

impl PageInfo {
	pub fn new(page_id: PageId, page_size: usize) -> Self {
		Self { page_id, page_size }
	}
}

/// The in-memory index of resident pages and their sizes.
///
/// Thread-safety is provided externally by the Cache Manager's metadata
/// lock; implementations need not be internally synchronized, and must not
/// hold internal locks across a callback (there are none here, but the
/// contract is part of the interface).
#[cfg_attr(test, automock)]
pub trait MetaStoreApi {
	fn has(&self, page_id: &PageId) -> bool;
	fn add(&mut self, info: PageInfo);
	fn info(&self, page_id: &PageId) -> Option<PageInfo>;
	fn remove(&mut self, page_id: &PageId) -> Option<PageInfo>;
	fn len(&self) -> usize;
	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Plain hash-map-backed [`MetaStoreApi`] - no locking of its own, since
/// thread-safety is provided externally by the Cache Manager's metadata
/// lock.
#[derive(Debug, Default)]
pub struct InMemoryMetaStore {
	pages: HashMap<PageId, PageInfo>,
}

impl InMemoryMetaStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl MetaStoreApi for InMemoryMetaStore {
	fn has(&self, page_id: &PageId) -> bool {
		self.pages.contains_key(page_id)
	}

	fn add(&mut self, info: PageInfo) {
		self.pages.insert(info.page_id.clone(), info);
	}

	fn info(&self, page_id: &PageId) -> Option<PageInfo> {
		self.pages.get(page_id).cloned()
	}

	fn remove(&mut self, page_id: &PageId) -> Option<PageInfo> {
		self.pages.remove(page_id)
	}

	fn len(&self) -> usize {
		self.pages.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_then_has_and_info() {
		let mut store = InMemoryMetaStore::new();
		let id = PageId::new("f", 0);
		store.add(PageInfo::new(id.clone(), 512));

		assert!(store.has(&id));
		assert_eq!(store.info(&id), Some(PageInfo::new(id, 512)));
	}

	#[test]
	fn remove_returns_previous_info_once() {
		let mut store = InMemoryMetaStore::new();
		let id = PageId::new("f", 0);
		store.add(PageInfo::new(id.clone(), 512));

		assert_eq!(store.remove(&id), Some(PageInfo::new(id.clone(), 512)));
		assert_eq!(store.remove(&id), None);
		assert!(!store.has(&id));
	}

	#[test]
	fn at_most_one_entry_per_id() {
		let mut store = InMemoryMetaStore::new();
		let id = PageId::new("f", 0);
		store.add(PageInfo::new(id.clone(), 512));
		store.add(PageInfo::new(id.clone(), 512));

		assert_eq!(store.len(), 1);
	}
}
