//! Dataset and model lifecycle engine for Markov text generation.
//!
//! This crate turns named text corpora into statistical chain models and
//! generates new sentences from them:
//! - Part-of-speech aware tokenization (`tokenizer`)
//! - Order-`k` Markov chains with a versioned binary format (`model`)
//! - Corpus files, model files and the in-memory model cache (`store`)
//! - The orchestrating `DatasetService`
//!
//! ```no_run
//! use rs_markov_core::{DatasetService, ServiceConfig};
//!
//! let service = DatasetService::open(ServiceConfig::new("./data"));
//! service.add(1, "cats", b"The cat sat. The cat ran.")?;
//! println!("{}", service.generate(1, "cats", 2)?);
//! # Ok::<(), rs_markov_core::Error>(())
//! ```

/// Service settings and environment overrides.
pub mod config;

/// Error taxonomy shared by every component.
pub mod error;

/// Chain models and sentence generation.
pub mod model;

/// Orchestration of the dataset lifecycle.
pub mod service;

/// Corpus and model persistence, in-memory cache and key locks.
pub mod store;

/// Segmentation and part-of-speech annotation.
pub mod tokenizer;

/// File helpers (atomic writes, listings).
///
/// Not exposed
pub(crate) mod io;

pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use model::{ChainModel, GenerationConfig};
pub use service::DatasetService;
pub use store::{CorpusStore, DatasetKey, GroupId, ModelCache};
pub use tokenizer::{TaggedTokenizer, Token, Tokenizer};
