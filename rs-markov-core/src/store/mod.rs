//! Durable storage of corpora and models, plus the in-memory model cache.
//!
//! Everything lives under one data directory, one subtree per group:
//!
//! ```text
//! <data_dir>/<group_id>/inputs/<name>        raw corpus
//! <data_dir>/<group_id>/cache/<name>.chain   serialized model
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Model cache: serialized files plus the group -> name -> model map.
pub mod cache;

/// Raw corpus files.
pub mod corpus;

/// Per-dataset reader/writer locks.
pub mod locks;

pub use cache::ModelCache;
pub use corpus::CorpusStore;
pub use locks::KeyLocks;

/// Identifier of the owning group (a community or server).
pub type GroupId = u64;

/// Extension of serialized model files.
pub const MODEL_EXTENSION: &str = "chain";

const MAX_NAME_LEN: usize = 100;

/// A dataset name within its group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetKey {
	pub group: GroupId,
	pub name: String,
}

impl DatasetKey {
	pub fn new(group: GroupId, name: impl Into<String>) -> Self {
		Self { group, name: name.into() }
	}
}

impl fmt::Display for DatasetKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.group, self.name)
	}
}

/// Checks that a dataset name can be used as a file name.
///
/// # Errors
/// `InvalidName` if the name is empty, longer than 100 bytes, starts with a
/// dot, or holds a path separator or control character.
pub fn validate_name(name: &str) -> Result<()> {
	let valid = !name.is_empty()
		&& name.len() <= MAX_NAME_LEN
		&& !name.starts_with('.')
		&& !name.chars().any(|c| c == '/' || c == '\\' || c.is_control());
	if valid { Ok(()) } else { Err(Error::InvalidName(name.to_owned())) }
}

/// Paths of the per-group directory tree.
#[derive(Clone, Debug)]
pub struct Layout {
	root: PathBuf,
}

impl Layout {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn group_dir(&self, group: GroupId) -> PathBuf {
		self.root.join(group.to_string())
	}

	pub fn inputs_dir(&self, group: GroupId) -> PathBuf {
		self.group_dir(group).join("inputs")
	}

	pub fn cache_dir(&self, group: GroupId) -> PathBuf {
		self.group_dir(group).join("cache")
	}

	pub fn corpus_path(&self, key: &DatasetKey) -> PathBuf {
		self.inputs_dir(key.group).join(&key.name)
	}

	pub fn model_path(&self, key: &DatasetKey) -> PathBuf {
		self.cache_dir(key.group).join(format!("{}.{MODEL_EXTENSION}", key.name))
	}
}
