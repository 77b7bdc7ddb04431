use std::borrow::Cow;
use std::sync::Arc;

use log::{info, warn};

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::model::ChainModel;
use crate::store::{CorpusStore, DatasetKey, GroupId, ModelCache, validate_name};
use crate::tokenizer::{TaggedTokenizer, Tokenizer};

/// Fewest sentences `generate` produces.
pub const MIN_SENTENCES: usize = 1;

/// Most sentences `generate` produces.
pub const MAX_SENTENCES: usize = 10;

/// Clamps a requested sentence count to `[MIN_SENTENCES, MAX_SENTENCES]`.
pub fn clamp_sentence_count(count: usize) -> usize {
	count.clamp(MIN_SENTENCES, MAX_SENTENCES)
}

/// Dataset lifecycle: add, regenerate, remove, combine and generate.
///
/// Each dataset moves between two states. It is absent until an `add`,
/// `regenerate` or `combine` persists and caches a model for it, and absent
/// again after `remove`. After a restart the files remain and models are
/// reloaded on first use.
///
/// # Concurrency
/// Mutations of a dataset hold its exclusive lock from the first read to
/// the cache update, generation holds its shared lock, so a generation never
/// observes a model that a concurrent mutation has already superseded.
/// Operations on different datasets run independently.
///
/// All methods block; building runs on `build_threads` worker threads.
/// Front ends with an event loop should call them from a blocking pool.
#[derive(Debug)]
pub struct DatasetService {
	config: ServiceConfig,
	corpus: CorpusStore,
	cache: Arc<ModelCache>,
}

impl DatasetService {
	/// Creates a service over existing stores.
	///
	/// The cache is owned by the caller and may outlive the service.
	pub fn new(config: ServiceConfig, corpus: CorpusStore, cache: Arc<ModelCache>) -> Self {
		Self { config, corpus, cache }
	}

	/// Creates a service with the default tokenizer, storing everything
	/// under `config.data_dir`.
	pub fn open(config: ServiceConfig) -> Self {
		let tokenizer: Arc<dyn Tokenizer> = Arc::new(TaggedTokenizer::default());
		let corpus = CorpusStore::new(&config.data_dir);
		let cache = Arc::new(ModelCache::new(&config.data_dir, tokenizer));
		Self::new(config, corpus, cache)
	}

	pub fn config(&self) -> &ServiceConfig {
		&self.config
	}

	pub fn cache(&self) -> &Arc<ModelCache> {
		&self.cache
	}

	fn build(&self, key: &DatasetKey, raw: &[u8], order: usize) -> Result<ChainModel> {
		let text = String::from_utf8_lossy(raw);
		if let Cow::Owned(_) = text {
			warn!("corpus of {key} is not valid UTF-8, invalid sequences were replaced");
		}
		ChainModel::build_with_threads(&text, order, Arc::clone(self.cache.tokenizer()), self.config.build_threads)
	}

	/// Stores a corpus and caches a model built from it with the default
	/// order. An existing dataset of the same name is replaced.
	///
	/// Nothing is written if the model cannot be built.
	pub fn add(&self, group: GroupId, name: &str, raw: &[u8]) -> Result<()> {
		validate_name(name)?;
		let key = DatasetKey::new(group, name);

		self.cache.locks().exclusive(&key, || {
			let model = self.build(&key, raw, self.config.default_order)?;
			let states = model.state_count();
			self.corpus.put(group, name, raw)?;
			self.cache.install(&key, model)?;
			info!("added dataset {key}: {} bytes, {states} states", raw.len());
			Ok(())
		})
	}

	/// Rebuilds a dataset's model from its stored corpus with `order`.
	///
	/// # Errors
	/// `NotFound` if the dataset has no corpus (combined datasets never do).
	pub fn regenerate(&self, group: GroupId, name: &str, order: usize) -> Result<()> {
		validate_name(name)?;
		let key = DatasetKey::new(group, name);

		self.cache.locks().exclusive(&key, || {
			let raw = self.corpus.get(group, name)?;
			let model = self.build(&key, &raw, order)?;
			self.cache.install(&key, model)?;
			info!("regenerated dataset {key} with order {order}");
			Ok(())
		})
	}

	/// Deletes a dataset's model from disk and memory. Its corpus is kept,
	/// so the dataset can be regenerated later.
	///
	/// # Errors
	/// `NotFound` if the dataset has no model.
	pub fn remove(&self, group: GroupId, name: &str) -> Result<()> {
		validate_name(name)?;
		let key = DatasetKey::new(group, name);

		self.cache.locks().exclusive(&key, || self.cache.evict(&key))?;
		info!("removed dataset {key}");
		Ok(())
	}

	/// Caches the combination of two datasets' models under `new_name`.
	///
	/// No corpus is stored for the result, so it cannot be regenerated or
	/// downloaded.
	///
	/// # Errors
	/// - `NotFound` if either source has no model
	/// - `Combine` if the sources have different orders
	pub fn combine(&self, group: GroupId, new_name: &str, left: &str, right: &str) -> Result<()> {
		validate_name(new_name)?;
		validate_name(left)?;
		validate_name(right)?;
		let key = DatasetKey::new(group, new_name);
		let left_key = DatasetKey::new(group, left);
		let right_key = DatasetKey::new(group, right);

		// The target may be one of the sources: reading and replacing it is
		// a single section under its exclusive lock.
		self.cache.locks().exclusive_with_shared(&key, &[&left_key, &right_key], || {
			let left_model = self.cache.load(&left_key)?;
			let right_model = self.cache.load(&right_key)?;
			let combined = ChainModel::combine(&left_model, &right_model)?;
			self.cache.install(&key, combined)
		})?;
		info!("combined {left} and {right} into dataset {key}");
		Ok(())
	}

	/// Generates `sentence_count` sentences (clamped to 1..=10) from a
	/// dataset's model, loading it from disk if needed.
	///
	/// # Errors
	/// - `NotFound` if the dataset has no model
	/// - `Generation` if the model could not end a sentence
	pub fn generate(&self, group: GroupId, name: &str, sentence_count: usize) -> Result<String> {
		validate_name(name)?;
		let key = DatasetKey::new(group, name);

		self.cache.locks().shared(&key, || {
			let model = self.cache.load(&key)?;
			model.generate_sentences(clamp_sentence_count(sentence_count), &self.config.generation)
		})
	}

	/// Raw corpus of a dataset.
	///
	/// # Errors
	/// `NotFound` if no corpus is stored, which is always the case for
	/// combined datasets.
	pub fn corpus(&self, group: GroupId, name: &str) -> Result<Vec<u8>> {
		validate_name(name)?;
		let key = DatasetKey::new(group, name);
		self.cache.locks().shared(&key, || self.corpus.get(group, name))
	}

	/// Names of the group's stored corpora.
	pub fn list_datasets(&self, group: GroupId) -> Result<Vec<String>> {
		self.corpus.list(group)
	}

	/// Names of the group's generatable datasets.
	pub fn list_cached(&self, group: GroupId) -> Result<Vec<String>> {
		self.cache.list(group)
	}

	/// Generatable datasets whose name contains `query`, ignoring case.
	pub fn search_cached(&self, group: GroupId, query: &str) -> Result<Vec<String>> {
		let query = query.to_lowercase();
		let mut names = self.cache.list(group)?;
		names.retain(|name| name.to_lowercase().contains(&query));
		Ok(names)
	}

	/// Names of the group's models currently held in memory.
	pub fn list_loaded(&self, group: GroupId) -> Vec<String> {
		self.cache.loaded(group)
	}
}
