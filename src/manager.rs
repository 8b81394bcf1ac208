use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use static_assertions::assert_impl_all;

use crate::{
	config::CacheConfig,
	consts::LOCK_STRIPES,
	error::ConstructError,
	evictor::EvictorApi,
	id::PageId,
	locks::PageLocker,
	meta::{MetaStoreApi, PageInfo},
	metrics::MetricsSink,
	page_store::PageStoreApi,
};

/// Coordinates `put`/`get`/`delete` across a [`MetaStoreApi`], a
/// [`PageStoreApi`] and an [`EvictorApi`], preserving byte-exact capacity
/// bounds (I2) and metadata/page-store consistency (I3) under concurrent
/// access.
///
/// Generic over the three collaborator traits so the hot path monomorphizes
/// instead of paying for dynamic dispatch; only the metrics sink, a much
/// colder path, is taken as a trait object.
pub struct CacheManager<M: MetaStoreApi, P: PageStoreApi, E: EvictorApi> {
	config: CacheConfig,
	meta: RwLock<M>,
	page_store: P,
	evictor: Mutex<E>,
	locker: PageLocker,
	metrics: Arc<dyn MetricsSink>,
}

assert_impl_all!(CacheManager<crate::meta::InMemoryMetaStore, crate::page_store::FilePageStore, crate::evictor::S3FifoEvictor>: Send, Sync);

impl<M: MetaStoreApi, P: PageStoreApi, E: EvictorApi> CacheManager<M, P, E> {
	/// Rebuilds `meta` and primes `evictor` from whatever pages `page_store`
	/// currently enumerates. `page_size_max` and `cache_size_bytes` are the
	/// two raw configuration keys; the effective byte budget is resolved
	/// against the page store's reported overhead ratio.
	pub fn new(
		page_store: P,
		mut meta: M,
		mut evictor: E,
		metrics: Arc<dyn MetricsSink>,
		page_size_max: usize,
		cache_size_bytes: usize,
	) -> Result<Self, ConstructError> {
		let config = CacheConfig::new(page_size_max, cache_size_bytes, page_store.overhead_ratio())
			.map_err(ConstructError::Config)?;

		let pages = match page_store.pages() {
			Ok(pages) => pages,
			Err(err) => {
				page_store.close();
				return Err(ConstructError::Enumerate(err));
			}
		};
		for info in pages {
			evictor.update_on_put(&info.page_id);
			meta.add(info);
		}

		let manager = Self {
			config,
			meta: RwLock::new(meta),
			page_store,
			evictor: Mutex::new(evictor),
			locker: PageLocker::new(LOCK_STRIPES),
			metrics,
		};
		manager.record_space_gauges();
		Ok(manager)
	}

	#[inline]
	pub fn config(&self) -> &CacheConfig {
		&self.config
	}

	/// Inserts `bytes` as the body of `page_id`, evicting a victim if the
	/// cache is full. Returns `false` - without failing the process - if the
	/// page is already resident, a concurrent racer won or lost the same
	/// decision, or the underlying I/O failed.
	pub fn put(&self, page_id: &PageId, bytes: &[u8]) -> bool {
		assert!(
			bytes.len() <= self.config.page_size_max(),
			"put({page_id}): body of {} bytes exceeds page_size_max of {}",
			bytes.len(),
			self.config.page_size_max()
		);

		let stripe = self.locker.stripe_of(page_id);
		let page_guard = self.locker.write(stripe);
		let mut meta = self.meta.write();

		if meta.has(page_id) {
			return false;
		}

		let enough_space = self.page_store.bytes() + bytes.len() <= self.config.cache_size();
		if enough_space {
			meta.add(PageInfo::new(page_id.clone(), bytes.len()));
			drop(meta);
			let result = self.write_new_page(page_id, bytes);
			drop(page_guard);
			return result;
		}

		// The evictor is consulted, and the locks it was consulted under are
		// released, before we ever touch a second stripe - picking a sorted pair
		// of locks requires giving up the single lock we're already holding.
		let victim = self.evictor.lock().evict();
		drop(meta);
		drop(page_guard);

		let Some(victim) = victim else {
			return false;
		};
		self.put_with_eviction(page_id, bytes, victim)
	}

	fn put_with_eviction(&self, page_id: &PageId, bytes: &[u8], victim: PageId) -> bool {
		let stripe_new = self.locker.stripe_of(page_id);
		let stripe_victim = self.locker.stripe_of(&victim);
		let (_low, _high) = self.locker.write_two(stripe_new, stripe_victim);

		let mut meta = self.meta.write();
		if meta.has(page_id) {
			return false;
		}
		let Some(victim_info) = meta.info(&victim) else {
			// Another thread already evicted our victim; this implementation
			// doesn't retry, per design - the caller may retry if it wants to.
			return false;
		};
		meta.remove(&victim);

		let enough_space = self
			.page_store
			.bytes()
			.saturating_sub(victim_info.page_size)
			+ bytes.len()
			<= self.config.cache_size();
		if enough_space {
			meta.add(PageInfo::new(page_id.clone(), bytes.len()));
		}
		drop(meta);

		// `victim` is already gone from MetaStore (line above) regardless of
		// whether the physical delete below succeeds; the Evictor must be told
		// either way or it keeps tracking a PageId no longer in MetaStore (I4).
		self.evictor.lock().update_on_delete(&victim);

		match self.page_store.delete(&victim, victim_info.page_size) {
			Ok(()) => {
				self.metrics.bytes_evicted(victim_info.page_size as u64);
				self.metrics.pages_evicted(1);
			}
			Err(err) => {
				log::error!("evicting {victim} to make room for {page_id} failed: {err}");
				self.metrics.put_error();
				// The victim's own MetaStore entry is already gone and its body is
				// now an orphan (tolerated per I3); but if we'd provisionally added
				// `page_id`'s entry for a body we never got to write, that entry
				// would have no body at all, which I3 does not tolerate.
				if enough_space {
					self.meta.write().remove(page_id);
				}
				return false;
			}
		}

		if enough_space {
			self.write_new_page(page_id, bytes)
		} else {
			false
		}
	}

	/// Writes a page body that's already recorded in `meta`, notifying the
	/// evictor and metrics on success. Shared by the fast path and the
	/// post-eviction path. On failure the MetaStore entry is rolled back -
	/// I3 only tolerates a body with no MetaStore entry (an orphan), never
	/// the reverse.
	fn write_new_page(&self, page_id: &PageId, bytes: &[u8]) -> bool {
		match self.page_store.put(page_id, bytes) {
			Ok(()) => {
				self.evictor.lock().update_on_put(page_id);
				self.metrics.bytes_written(bytes.len() as u64);
				self.record_space_gauges();
				true
			}
			Err(err) => {
				log::error!("put({page_id}) failed: {err}");
				self.metrics.put_error();
				self.meta.write().remove(page_id);
				false
			}
		}
	}

	/// Returns the page body starting at `page_offset`, or `None` if the
	/// page isn't resident. `page_offset` beyond `page_size_max` is a
	/// programmer error and panics rather than returning `None`.
	pub fn get(&self, page_id: &PageId, page_offset: usize) -> Option<Vec<u8>> {
		assert!(
			page_offset <= self.config.page_size_max(),
			"get({page_id}): offset {page_offset} exceeds page_size_max of {}",
			self.config.page_size_max()
		);

		let stripe = self.locker.stripe_of(page_id);
		let _page_guard = self.locker.read(stripe);

		let resident = {
			let meta = self.meta.read();
			meta.has(page_id)
		};
		if !resident {
			return None;
		}

		match self.page_store.get(page_id, page_offset) {
			Ok(bytes) => {
				self.evictor.lock().update_on_get(page_id);
				Some(bytes)
			}
			Err(err) => {
				log::error!("get({page_id}) failed: {err}");
				self.metrics.get_error();
				None
			}
		}
	}

	/// Removes `page_id` if resident. Returns `false` - without failing the
	/// process - if the page was missing or the underlying delete failed.
	pub fn delete(&self, page_id: &PageId) -> bool {
		let stripe = self.locker.stripe_of(page_id);
		let _page_guard = self.locker.write(stripe);

		let info = {
			let mut meta = self.meta.write();
			meta.remove(page_id)
		};

		let Some(info) = info else {
			log::warn!("delete({page_id}): page was not resident");
			self.metrics.delete_error();
			return false;
		};

		// The MetaStore removal above already happened; the Evictor must be
		// told regardless of whether the physical delete below succeeds, or
		// it keeps tracking a PageId no longer in MetaStore (I4).
		self.evictor.lock().update_on_delete(page_id);

		match self.page_store.delete(page_id, info.page_size) {
			Ok(()) => {
				self.record_space_gauges();
				true
			}
			Err(err) => {
				log::error!("delete({page_id}) failed: {err}");
				self.metrics.delete_error();
				false
			}
		}
	}

	/// Closes the underlying page store. Calling any other method afterward
	/// is undefined.
	pub fn close(&self) {
		self.page_store.close();
	}

	fn record_space_gauges(&self) {
		let used = self.page_store.bytes();
		let available = self.config.cache_size().saturating_sub(used);
		self.metrics.set_space_available(available);
		self.metrics.set_space_used(used);
	}
}
