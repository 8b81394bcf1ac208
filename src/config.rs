use thiserror::Error;

use crate::utils::units::display_size;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("page_size_max must be greater than zero")]
	ZeroPageSize,

	#[error("cache_size_bytes must be greater than zero")]
	ZeroCacheSize,

	#[error(
		"cache_size_bytes ({}) combined with a page store overhead ratio of {overhead_ratio} overflows",
		display_size(*cache_size_bytes)
	)]
	CacheSizeOverflow {
		cache_size_bytes: usize,
		overhead_ratio: f64,
	},
}

/// Resolved, immutable configuration for a [`crate::manager::CacheManager`].
///
/// `cache_size` is the effective byte budget: `cache_size_bytes / (1 +
/// overhead_ratio)`, computed once at construction so the PageStore's
/// reported byte counter - which does not itself account for filesystem or
/// format overhead - stays under the configured raw budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
	page_size_max: usize,
	cache_size: usize,
}

impl CacheConfig {
	/// Validates and resolves the two host-facing configuration keys,
	/// `page_size` (`page_size_max`) and `cache_size_bytes`, combined with
	/// the page store's reported overhead ratio.
	pub fn new(
		page_size_max: usize,
		cache_size_bytes: usize,
		overhead_ratio: f64,
	) -> Result<Self, ConfigError> {
		if page_size_max == 0 {
			return Err(ConfigError::ZeroPageSize);
		}
		if cache_size_bytes == 0 {
			return Err(ConfigError::ZeroCacheSize);
		}

		let divisor = 1.0 + overhead_ratio;
		#[allow(clippy::cast_precision_loss)]
		let cache_size = (cache_size_bytes as f64 / divisor).floor();
		if !cache_size.is_finite() || cache_size < 0.0 || cache_size > usize::MAX as f64 {
			return Err(ConfigError::CacheSizeOverflow {
				cache_size_bytes,
				overhead_ratio,
			});
		}

		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		Ok(Self {
			page_size_max,
			cache_size: cache_size as usize,
		})
	}

	#[inline]
	pub fn page_size_max(&self) -> usize {
		self.page_size_max
	}

	#[inline]
	pub fn cache_size(&self) -> usize {
		self.cache_size
	}
}
