use std::path::Path;

use super::{DatasetKey, GroupId, Layout, validate_name};
use crate::error::{Error, Result};
use crate::io;

/// Raw corpus files, one per dataset under `<group>/inputs/`.
///
/// `put` replaces an existing corpus of the same name.
#[derive(Clone, Debug)]
pub struct CorpusStore {
	layout: Layout,
}

impl CorpusStore {
	pub fn new(root: impl AsRef<Path>) -> Self {
		Self { layout: Layout::new(root.as_ref()) }
	}

	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	/// Stores (or replaces) the corpus of a dataset.
	pub fn put(&self, group: GroupId, name: &str, bytes: &[u8]) -> Result<()> {
		validate_name(name)?;
		let path = self.layout.corpus_path(&DatasetKey::new(group, name));
		io::write_atomic(&path, bytes).map_err(|e| Error::storage(path, e))
	}

	/// Reads the corpus of a dataset.
	///
	/// # Errors
	/// `NotFound` if the group or dataset has no corpus.
	pub fn get(&self, group: GroupId, name: &str) -> Result<Vec<u8>> {
		validate_name(name)?;
		let key = DatasetKey::new(group, name);
		let path = self.layout.corpus_path(&key);
		match io::read_file(&path) {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound { what: "corpus", key }),
			Err(e) => Err(Error::storage(path, e)),
		}
	}

	pub fn contains(&self, group: GroupId, name: &str) -> bool {
		validate_name(name).is_ok() && self.layout.corpus_path(&DatasetKey::new(group, name)).is_file()
	}

	/// Names of the group's corpora, sorted. Empty for an unknown group.
	pub fn list(&self, group: GroupId) -> Result<Vec<String>> {
		let dir = self.layout.inputs_dir(group);
		io::list_files(&dir, None).map_err(|e| Error::storage(dir, e))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn put_get_and_overwrite() {
		let dir = tempfile::tempdir().unwrap();
		let store = CorpusStore::new(dir.path());

		store.put(1, "ds", b"first").unwrap();
		assert_eq!(store.get(1, "ds").unwrap(), b"first");
		store.put(1, "ds", b"second").unwrap();
		assert_eq!(store.get(1, "ds").unwrap(), b"second");
		assert!(store.contains(1, "ds"));
	}

	#[test]
	fn get_missing_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let store = CorpusStore::new(dir.path());
		store.put(1, "ds", b"text").unwrap();

		assert!(store.get(1, "other").unwrap_err().is_not_found());
		assert!(store.get(2, "ds").unwrap_err().is_not_found());
	}

	#[test]
	fn list_is_per_group_and_empty_for_unknown_group() {
		let dir = tempfile::tempdir().unwrap();
		let store = CorpusStore::new(dir.path());
		store.put(1, "b", b"text").unwrap();
		store.put(1, "a", b"text").unwrap();
		store.put(2, "c", b"text").unwrap();

		assert_eq!(store.list(1).unwrap(), vec!["a", "b"]);
		assert_eq!(store.list(2).unwrap(), vec!["c"]);
		assert!(store.list(3).unwrap().is_empty());
	}

	#[test]
	fn rejects_path_like_names() {
		let dir = tempfile::tempdir().unwrap();
		let store = CorpusStore::new(dir.path());

		assert!(matches!(store.put(1, "../escape", b"x"), Err(Error::InvalidName(_))));
		assert!(!store.contains(1, "../escape"));
	}
}
