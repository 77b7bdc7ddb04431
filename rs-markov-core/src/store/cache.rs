use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};

use super::{DatasetKey, GroupId, KeyLocks, Layout, MODEL_EXTENSION, validate_name};
use crate::error::{Error, Result};
use crate::io;
use crate::model::ChainModel;
use crate::tokenizer::Tokenizer;

type GroupModels = HashMap<String, Arc<ChainModel>>;

/// Serialized models on disk plus a two-level in-memory map
/// (group -> dataset name -> loaded model).
///
/// # Responsibilities
/// - Persist models atomically, one file per dataset
/// - Serve loaded models from memory, reading the disk only on a miss
/// - Keep memory and disk in agreement about which datasets exist: a model
///   enters memory only after its file is written, and leaves memory only
///   after its file is deleted
///
/// Methods do not lock; callers hold the key's lock from [`ModelCache::locks`]
/// around each read-modify-persist sequence.
///
/// Loaded models are never expired: memory grows with the number of
/// distinct datasets used during the lifetime of the cache.
#[derive(Debug)]
pub struct ModelCache {
	layout: Layout,
	tokenizer: Arc<dyn Tokenizer>,
	memory: RwLock<HashMap<GroupId, GroupModels>>,
	locks: KeyLocks,
}

impl ModelCache {
	/// Creates an empty cache over `root`. Models already on disk are
	/// loaded lazily, decoded with `tokenizer`.
	pub fn new(root: impl AsRef<Path>, tokenizer: Arc<dyn Tokenizer>) -> Self {
		Self {
			layout: Layout::new(root.as_ref()),
			tokenizer,
			memory: RwLock::new(HashMap::new()),
			locks: KeyLocks::new(),
		}
	}

	pub fn locks(&self) -> &KeyLocks {
		&self.locks
	}

	pub fn layout(&self) -> &Layout {
		&self.layout
	}

	pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
		&self.tokenizer
	}

	/// Returns the model if it is already in memory.
	pub fn cached(&self, key: &DatasetKey) -> Option<Arc<ChainModel>> {
		let memory = self.memory.read().unwrap_or_else(PoisonError::into_inner);
		memory.get(&key.group)?.get(&key.name).cloned()
	}

	fn insert(&self, key: &DatasetKey, model: Arc<ChainModel>) {
		let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
		memory.entry(key.group).or_default().insert(key.name.clone(), model);
	}

	fn remove(&self, key: &DatasetKey) -> bool {
		let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
		let Some(group) = memory.get_mut(&key.group) else {
			return false;
		};
		let removed = group.remove(&key.name).is_some();
		if group.is_empty() {
			memory.remove(&key.group);
		}
		removed
	}

	/// Writes the model to disk, then makes it the cached model of `key`,
	/// replacing any previous one.
	pub fn install(&self, key: &DatasetKey, model: ChainModel) -> Result<Arc<ChainModel>> {
		validate_name(&key.name)?;
		let path = self.layout.model_path(key);
		let bytes = model.serialize()?;
		io::write_atomic(&path, &bytes).map_err(|e| Error::storage(&path, e))?;

		let model = Arc::new(model);
		self.insert(key, Arc::clone(&model));
		debug!("cached model {key} ({} bytes on disk)", bytes.len());
		Ok(model)
	}

	/// Returns the model of `key`, reading it from disk on a cache miss.
	///
	/// # Errors
	/// - `NotFound` if neither memory nor disk holds the model
	/// - `CorruptCache` if the file cannot be decoded; it is never taken
	///   for an empty model
	pub fn load(&self, key: &DatasetKey) -> Result<Arc<ChainModel>> {
		if let Some(model) = self.cached(key) {
			debug!("cache hit for {key}");
			return Ok(model);
		}

		validate_name(&key.name)?;
		let path = self.layout.model_path(key);
		let bytes = match io::read_file(&path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(Error::NotFound { what: "model", key: key.clone() });
			}
			Err(e) => return Err(Error::storage(path, e)),
		};

		let model = ChainModel::deserialize(&bytes, Arc::clone(&self.tokenizer)).map_err(|e| e.at_path(&path))?;
		let model = Arc::new(model);
		self.insert(key, Arc::clone(&model));
		info!("loaded model {key} from {}", path.display());
		Ok(model)
	}

	/// Deletes the model file of `key` and drops it from memory.
	///
	/// # Errors
	/// `NotFound` if there was nothing to remove.
	pub fn evict(&self, key: &DatasetKey) -> Result<()> {
		validate_name(&key.name)?;
		let path = self.layout.model_path(key);
		let on_disk = io::remove_file(&path).map_err(|e| Error::storage(&path, e))?;
		let in_memory = self.remove(key);

		if on_disk || in_memory { Ok(()) } else { Err(Error::NotFound { what: "model", key: key.clone() }) }
	}

	/// Whether a model exists for `key`, in memory or on disk.
	pub fn contains(&self, key: &DatasetKey) -> bool {
		self.cached(key).is_some() || (validate_name(&key.name).is_ok() && self.layout.model_path(key).is_file())
	}

	/// Names of the group's persisted models, sorted.
	pub fn list(&self, group: GroupId) -> Result<Vec<String>> {
		let dir = self.layout.cache_dir(group);
		io::list_files(&dir, Some(MODEL_EXTENSION)).map_err(|e| Error::storage(dir, e))
	}

	/// Names of the group's models currently held in memory, sorted.
	pub fn loaded(&self, group: GroupId) -> Vec<String> {
		let memory = self.memory.read().unwrap_or_else(PoisonError::into_inner);
		let mut names: Vec<String> = memory.get(&group).map(|models| models.keys().cloned().collect()).unwrap_or_default();
		names.sort();
		names
	}

	/// Drops every loaded model. Files are untouched and will be reloaded
	/// on demand.
	pub fn clear_memory(&self) {
		self.memory.write().unwrap_or_else(PoisonError::into_inner).clear();
	}
}
