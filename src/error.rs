use std::io;

use thiserror::Error;

use crate::{config::ConfigError, id::PageId};

/// Errors surfaced by a [`crate::page_store::PageStoreApi`] implementation.
///
/// These never escape [`crate::manager::CacheManager::put`]/`get`/`delete` as
/// a `Result` - the manager logs them, increments the matching
/// [`crate::metrics::MetricsSink`] counter, and folds them into a plain
/// `bool`/`Option` return instead.
#[derive(Debug, Error)]
pub enum PageStoreError {
	#[error("page {0} already has a body in the page store")]
	AlreadyExists(PageId),

	#[error("page {0} has no body in the page store")]
	NotFound(PageId),

	#[error("page {page_id} expected {expected} bytes on delete but found {found}")]
	SizeMismatch {
		page_id: PageId,
		expected: usize,
		found: usize,
	},

	#[error("I/O error accessing page {0}: {1}")]
	Io(PageId, #[source] io::Error),

	#[error("failed to scan the page store: {0}")]
	Scan(#[source] io::Error),
}

/// Errors that can abort [`crate::manager::CacheManager::new`] while
/// rebuilding the MetaStore and priming the Evictor from the PageStore's
/// enumeration.
#[derive(Debug, Error)]
pub enum ConstructError {
	#[error("invalid cache configuration: {0}")]
	Config(#[source] ConfigError),

	#[error("failed to enumerate pages in the page store: {0}")]
	Enumerate(#[source] PageStoreError),
}
