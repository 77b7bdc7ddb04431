//! Statistical chain models and sentence generation.
//!
//! This module provides:
//! - The chain alphabet and state keys (`Symbol`, `State`)
//! - Weighted next-symbol distributions (`Transitions`)
//! - The order-`k` Markov chain itself (`ChainModel`)
//! - Limits applied during generation (`GenerationConfig`)
//! - The versioned binary format models are persisted in

/// Order-`k` Markov chain over annotated tokens.
///
/// Supports parallel construction, combination,
/// serialization and bounded sentence generation.
pub mod chain_model;

/// Generation limits (walk length, retries, minimum length).
pub mod generation;

/// Versioned binary encoding of a model.
pub mod snapshot;

/// Chain alphabet, state keys and transition distributions.
pub mod state;

pub use chain_model::ChainModel;
pub use generation::GenerationConfig;
pub use snapshot::FORMAT_VERSION;
pub use state::{State, Symbol, Transitions};
