use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::GenerationConfig;

pub const ENV_DATA_DIR: &str = "RS_MARKOV_DATA_DIR";
pub const ENV_ORDER: &str = "RS_MARKOV_ORDER";
pub const ENV_BUILD_THREADS: &str = "RS_MARKOV_BUILD_THREADS";
pub const ENV_MAX_ATTEMPTS: &str = "RS_MARKOV_MAX_ATTEMPTS";

/// Settings of a [`DatasetService`](crate::service::DatasetService).
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
	/// Root of the per-group directory tree.
	pub data_dir: PathBuf,

	/// Order used by `add`.
	pub default_order: usize,

	/// Workers used to build a model.
	pub build_threads: usize,

	pub generation: GenerationConfig,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("./data"),
			default_order: 2,
			build_threads: num_cpus::get(),
			generation: GenerationConfig::default(),
		}
	}
}

impl ServiceConfig {
	pub fn new(data_dir: impl Into<PathBuf>) -> Self {
		Self { data_dir: data_dir.into(), ..Self::default() }
	}

	/// Defaults overridden by the `RS_MARKOV_*` environment variables.
	///
	/// # Errors
	/// `Config` if a variable is set to an unusable value.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let mut config = Self::default();

		if let Some(dir) = lookup(ENV_DATA_DIR) {
			config.data_dir = PathBuf::from(dir);
		}
		if let Some(order) = parse(&lookup, ENV_ORDER)? {
			if order == 0 {
				return Err(Error::Config { key: ENV_ORDER, reason: "must be at least 1".to_owned() });
			}
			config.default_order = order;
		}
		if let Some(threads) = parse::<usize>(&lookup, ENV_BUILD_THREADS)? {
			config.build_threads = threads.max(1);
		}
		if let Some(attempts) = parse(&lookup, ENV_MAX_ATTEMPTS)? {
			config
				.generation
				.set_max_attempts(attempts)
				.map_err(|reason| Error::Config { key: ENV_MAX_ATTEMPTS, reason })?;
		}

		Ok(config)
	}
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	lookup(key)
		.map(|value| value.trim().parse::<T>().map_err(|e| Error::Config { key, reason: format!("{value:?}: {e}") }))
		.transpose()
}
