use crate::utils::units::*;

/// Number of page-lock stripes in the [`crate::locks::PageLocker`]. A tunable
/// constant rather than a per-instance parameter, per design note: stripe
/// collisions only serialize unrelated pages, they don't affect correctness.
pub const LOCK_STRIPES: usize = 1024;

pub const DEFAULT_PAGE_SIZE_MAX: usize = 16 * KiB;
pub const DEFAULT_CACHE_SIZE: usize = 64 * MiB;
