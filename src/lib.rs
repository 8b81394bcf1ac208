#![allow(dead_code)]

//! A paged, on-disk cache for pages of remote files.
//!
//! [`CacheManager`] coordinates three collaborators behind striped locking:
//! a [`MetaStoreApi`](meta::MetaStoreApi) tracking which pages are resident,
//! a [`PageStoreApi`](page_store::PageStoreApi) holding page bodies, and an
//! [`EvictorApi`](evictor::EvictorApi) deciding what to reclaim when the
//! configured byte budget is exceeded. All three are pluggable; this crate
//! ships one default implementation of each ([`InMemoryMetaStore`],
//! [`FilePageStore`], [`S3FifoEvictor`]) which is what most callers want.

pub mod config;
pub mod consts;
pub mod error;
pub mod evictor;
pub mod id;
pub mod locks;
pub mod manager;
pub mod meta;
pub mod metrics;
pub mod page_store;
mod utils;

pub use config::{CacheConfig, ConfigError};
pub use error::{ConstructError, PageStoreError};
pub use evictor::{EvictorApi, S3FifoEvictor};
pub use id::PageId;
pub use manager::CacheManager;
pub use meta::{InMemoryMetaStore, MetaStoreApi, PageInfo};
pub use metrics::{AtomicMetrics, MetricsSink};
pub use page_store::{FilePageStore, OpenError, PageStoreApi};
