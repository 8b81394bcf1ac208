use std::{
	collections::hash_map::DefaultHasher,
	fs, io,
	hash::{Hash, Hasher},
	io::{Read, Seek, SeekFrom, Write},
	path::{Path, PathBuf},
	sync::atomic::{AtomicUsize, Ordering},
};

#[cfg(test)]
use mockall::automock;

use thiserror::Error;

use crate::{
	error::PageStoreError,
	id::PageId,
	meta::PageInfo,
};

#[derive(Debug, Error)]
pub enum OpenError {
	#[error("the directory {} doesn't exist", _0.display())]
	NoSuchDir(PathBuf),

	#[error("{} is not a directory", _0.display())]
	NotADirectory(PathBuf),

	#[error("failed to scan the page store directory: {0}")]
	Scan(#[source] io::Error),
}

/// The durable key-to-bytes backend a Cache Manager writes pages through.
///
/// `pages()` and `overhead_ratio()` are invoked only at construction time;
/// `bytes()` must be monotone with respect to completed `put`/`delete`
/// calls, since the Cache Manager trusts it for capacity accounting (I2).
#[cfg_attr(test, automock)]
pub trait PageStoreApi {
	fn put(&self, page_id: &PageId, bytes: &[u8]) -> Result<(), PageStoreError>;
	fn get(&self, page_id: &PageId, offset: usize) -> Result<Vec<u8>, PageStoreError>;
	fn delete(&self, page_id: &PageId, expected_size: usize) -> Result<(), PageStoreError>;
	fn bytes(&self) -> usize;
	fn pages(&self) -> Result<Vec<PageInfo>, PageStoreError>;
	fn overhead_ratio(&self) -> f64;
	fn close(&self);
}

fn file_name_for(page_id: &PageId) -> String {
	let mut hasher = DefaultHasher::new();
	page_id.file_id.hash(&mut hasher);
	page_id.page_index.hash(&mut hasher);
	format!("{:016x}.page", hasher.finish())
}

/// A default, filesystem-backed [`PageStoreApi`]: one file per page under a
/// root directory. Each file embeds its own `(file_id, page_index)` so
/// `pages()` can enumerate bodies back into [`PageInfo`] with nothing but a
/// directory scan - this is what makes reloading after an unclean shutdown
/// hold with no separate, independently-corruptible index file.
///
/// This on-disk layout is a default, not a contract other code may depend on.
pub struct FilePageStore {
	root: PathBuf,
	bytes_used: AtomicUsize,
}

const OVERHEAD_RATIO: f64 = 0.02;

impl FilePageStore {
	pub fn open(root: impl Into<PathBuf>) -> Result<Self, OpenError> {
		let root = root.into();
		if !root.exists() {
			return Err(OpenError::NoSuchDir(root));
		}
		if !root.is_dir() {
			return Err(OpenError::NotADirectory(root));
		}

		let mut bytes_used = 0;
		for entry in fs::read_dir(&root).map_err(OpenError::Scan)? {
			let entry = entry.map_err(OpenError::Scan)?;
			if !entry.file_type().map_err(OpenError::Scan)?.is_file() {
				continue;
			}
			if let Some(info) = read_page_info(&entry.path()).map_err(OpenError::Scan)? {
				bytes_used += info.page_size;
			}
		}

		Ok(Self {
			root,
			bytes_used: AtomicUsize::new(bytes_used),
		})
	}

	fn path_for(&self, page_id: &PageId) -> PathBuf {
		self.root.join(file_name_for(page_id))
	}
}

fn write_header(file: &mut fs::File, page_id: &PageId) -> io::Result<()> {
	let file_id_bytes = page_id.file_id.as_bytes();
	file.write_all(&(file_id_bytes.len() as u64).to_le_bytes())?;
	file.write_all(file_id_bytes)?;
	file.write_all(&page_id.page_index.to_le_bytes())?;
	Ok(())
}

fn header_len(page_id: &PageId) -> u64 {
	8 + page_id.file_id.as_bytes().len() as u64 + 8
}

fn read_page_info(path: &Path) -> io::Result<Option<PageInfo>> {
	let mut file = fs::File::open(path)?;
	let total_len = file.metadata()?.len();

	let mut len_buf = [0u8; 8];
	if file.read_exact(&mut len_buf).is_err() {
		return Ok(None);
	}
	let file_id_len = u64::from_le_bytes(len_buf);

	let mut file_id_buf = vec![0u8; file_id_len as usize];
	if file.read_exact(&mut file_id_buf).is_err() {
		return Ok(None);
	}
	let Ok(file_id) = String::from_utf8(file_id_buf) else {
		return Ok(None);
	};

	let mut index_buf = [0u8; 8];
	if file.read_exact(&mut index_buf).is_err() {
		return Ok(None);
	}
	let page_index = u64::from_le_bytes(index_buf);

	let header = 8 + file_id_len + 8;
	let page_size = total_len.saturating_sub(header) as usize;

	Ok(Some(PageInfo::new(PageId::new(file_id, page_index), page_size)))
}

impl PageStoreApi for FilePageStore {
	fn put(&self, page_id: &PageId, bytes: &[u8]) -> Result<(), PageStoreError> {
		let path = self.path_for(page_id);
		let mut file = fs::OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(&path)
			.map_err(|err| {
				if err.kind() == io::ErrorKind::AlreadyExists {
					PageStoreError::AlreadyExists(page_id.clone())
				} else {
					PageStoreError::Io(page_id.clone(), err)
				}
			})?;

		write_header(&mut file, page_id).map_err(|err| PageStoreError::Io(page_id.clone(), err))?;
		file
			.write_all(bytes)
			.map_err(|err| PageStoreError::Io(page_id.clone(), err))?;

		self.bytes_used.fetch_add(bytes.len(), Ordering::SeqCst);
		Ok(())
	}

	fn get(&self, page_id: &PageId, offset: usize) -> Result<Vec<u8>, PageStoreError> {
		let path = self.path_for(page_id);
		let mut file = fs::File::open(&path).map_err(|err| {
			if err.kind() == io::ErrorKind::NotFound {
				PageStoreError::NotFound(page_id.clone())
			} else {
				PageStoreError::Io(page_id.clone(), err)
			}
		})?;

		file
			.seek(SeekFrom::Start(header_len(page_id) + offset as u64))
			.map_err(|err| PageStoreError::Io(page_id.clone(), err))?;

		let mut buf = Vec::new();
		file
			.read_to_end(&mut buf)
			.map_err(|err| PageStoreError::Io(page_id.clone(), err))?;
		Ok(buf)
	}

	fn delete(&self, page_id: &PageId, expected_size: usize) -> Result<(), PageStoreError> {
		let path = self.path_for(page_id);
		let metadata = fs::metadata(&path).map_err(|err| {
			if err.kind() == io::ErrorKind::NotFound {
				PageStoreError::NotFound(page_id.clone())
			} else {
				PageStoreError::Io(page_id.clone(), err)
			}
		})?;
		let found = metadata.len().saturating_sub(header_len(page_id)) as usize;
		if found != expected_size {
			return Err(PageStoreError::SizeMismatch {
				page_id: page_id.clone(),
				expected: expected_size,
				found,
			});
		}

		fs::remove_file(&path).map_err(|err| PageStoreError::Io(page_id.clone(), err))?;
		self.bytes_used.fetch_sub(expected_size, Ordering::SeqCst);
		Ok(())
	}

	fn bytes(&self) -> usize {
		self.bytes_used.load(Ordering::SeqCst)
	}

	fn pages(&self) -> Result<Vec<PageInfo>, PageStoreError> {
		let entries = fs::read_dir(&self.root).map_err(PageStoreError::Scan)?;

		let mut pages = Vec::new();
		for entry in entries {
			let entry = entry.map_err(PageStoreError::Scan)?;
			if let Some(info) = read_page_info(&entry.path()).unwrap_or(None) {
				pages.push(info);
			}
		}
		Ok(pages)
	}

	fn overhead_ratio(&self) -> f64 {
		OVERHEAD_RATIO
	}

	fn close(&self) {
		// Plain files need no explicit close beyond what `Drop` already does
		// for the open handles used per-call; nothing to release here.
	}
}

#[cfg(test)]
mod tests {
	use tempfile::tempdir;

	use super::*;

	#[test]
	fn put_then_get_round_trips() {
		let dir = tempdir().unwrap();
		let store = FilePageStore::open(dir.path()).unwrap();
		let id = PageId::new("f", 0);

		store.put(&id, &[0x41; 512]).unwrap();
		let body = store.get(&id, 0).unwrap();

		assert_eq!(body, vec![0x41; 512]);
		assert_eq!(store.bytes(), 512);
	}

	#[test]
	fn get_with_offset_skips_prefix() {
		let dir = tempdir().unwrap();
		let store = FilePageStore::open(dir.path()).unwrap();
		let id = PageId::new("f", 0);

		store.put(&id, b"hello world").unwrap();
		let body = store.get(&id, 6).unwrap();

		assert_eq!(body, b"world");
	}

	#[test]
	fn double_put_is_rejected() {
		let dir = tempdir().unwrap();
		let store = FilePageStore::open(dir.path()).unwrap();
		let id = PageId::new("f", 0);

		store.put(&id, &[1]).unwrap();
		let result = store.put(&id, &[2]);

		assert!(matches!(result, Err(PageStoreError::AlreadyExists(_))));
	}

	#[test]
	fn get_missing_is_not_found() {
		let dir = tempdir().unwrap();
		let store = FilePageStore::open(dir.path()).unwrap();

		let result = store.get(&PageId::new("f", 0), 0);
		assert!(matches!(result, Err(PageStoreError::NotFound(_))));
	}

	#[test]
	fn delete_then_bytes_reflects_removal() {
		let dir = tempdir().unwrap();
		let store = FilePageStore::open(dir.path()).unwrap();
		let id = PageId::new("f", 0);

		store.put(&id, &[0; 256]).unwrap();
		store.delete(&id, 256).unwrap();

		assert_eq!(store.bytes(), 0);
		assert!(matches!(
			store.get(&id, 0),
			Err(PageStoreError::NotFound(_))
		));
	}

	#[test]
	fn reload_enumerates_surviving_pages() {
		let dir = tempdir().unwrap();
		{
			let store = FilePageStore::open(dir.path()).unwrap();
			store.put(&PageId::new("f", 0), &[0; 100]).unwrap();
			store.put(&PageId::new("f", 1), &[0; 200]).unwrap();
		}

		let reopened = FilePageStore::open(dir.path()).unwrap();
		assert_eq!(reopened.bytes(), 300);

		let mut pages = reopened.pages().unwrap();
		pages.sort_by_key(|info| info.page_id.page_index);
		assert_eq!(pages[0].page_size, 100);
		assert_eq!(pages[1].page_size, 200);
	}
}
