use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::DatasetKey;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the engine can report to a front end.
///
/// None of these are fatal for the host process: missing datasets and
/// malformed input are expected, recoverable conditions. Only `Storage`
/// may indicate a subsystem the engine cannot work around.
#[derive(Error, Debug)]
pub enum Error {
	/// Corpus, model or group absent.
	#[error("{what} not found for dataset {key}")]
	NotFound { what: &'static str, key: DatasetKey },

	/// Dataset name unusable as a file name.
	#[error("invalid dataset name {0:?}")]
	InvalidName(String),

	/// Chain order outside the supported range.
	#[error("invalid chain order {0}, expected at least 1")]
	InvalidOrder(usize),

	/// Input too short for the requested order.
	#[error("cannot build a chain of order {order} from {tokens} token(s)")]
	Build { order: usize, tokens: usize },

	/// Models with different orders cannot be combined.
	#[error("cannot combine models of order {left} and {right}")]
	Combine { left: usize, right: usize },

	/// Retry ceiling exhausted without a terminal sentence.
	#[error("no sentence could be generated after {attempts} attempt(s)")]
	Generation { attempts: usize },

	/// I/O failure on a corpus or cache file.
	#[error("storage error on {}: {source}", path.display())]
	Storage {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	/// Serialized model data could not be decoded.
	#[error("corrupt model data{}: {reason}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
	CorruptCache { path: Option<PathBuf>, reason: String },

	/// A model build thread panicked.
	#[error("build worker failed: {0}")]
	Worker(String),

	/// Unusable configuration value.
	#[error("invalid configuration for {key}: {reason}")]
	Config { key: &'static str, reason: String },
}

impl Error {
	/// Convenience for front ends that map absence to a dedicated reply.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::NotFound { .. })
	}

	pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
		Error::Storage { path: path.into(), source }
	}

	pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
		Error::CorruptCache { path: None, reason: reason.into() }
	}

	/// Attaches the offending file to a `CorruptCache` error; other kinds
	/// pass through untouched.
	pub(crate) fn at_path(self, at: impl Into<PathBuf>) -> Self {
		match self {
			Error::CorruptCache { path: None, reason } => Error::CorruptCache { path: Some(at.into()), reason },
			other => other,
		}
	}
}
