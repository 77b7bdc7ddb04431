//! Versioned binary encoding of a chain model.
//!
//! Layout: 4-byte magic `RSMC`, little-endian `u16` format version, then a
//! postcard body holding the order, the states sorted by key (each with its
//! transitions sorted by symbol) and the sorted training sentences. Sorting
//! makes the encoding of a given model byte-stable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::chain_model::ChainModel;
use super::state::{State, Symbol, Transitions};
use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;

const MAGIC: &[u8; 4] = b"RSMC";

/// Current on-disk format version.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + size_of::<u16>();

#[derive(Serialize)]
struct SnapshotRef<'a> {
	order: u32,
	states: Vec<(&'a State, Vec<(&'a Symbol, u64)>)>,
	sentences: Vec<&'a str>,
}

#[derive(Deserialize)]
struct Snapshot {
	order: u32,
	states: Vec<(State, Vec<(Symbol, u64)>)>,
	sentences: Vec<String>,
}

pub(crate) fn encode(model: &ChainModel) -> Result<Vec<u8>> {
	let (states, sentences) = model.parts();

	let mut states: Vec<_> = states
		.iter()
		.map(|(state, transitions)| {
			let mut next: Vec<_> = transitions.iter().collect();
			next.sort();
			(state, next)
		})
		.collect();
	states.sort_by(|a, b| a.0.cmp(b.0));

	let mut sentences: Vec<&str> = sentences.iter().map(String::as_str).collect();
	sentences.sort_unstable();

	let order = u32::try_from(model.order()).map_err(|_| Error::InvalidOrder(model.order()))?;
	let body = postcard::to_stdvec(&SnapshotRef { order, states, sentences })
		.map_err(|e| Error::corrupt(format!("cannot encode model: {e}")))?;

	let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
	bytes.extend_from_slice(MAGIC);
	bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
	bytes.extend_from_slice(&body);
	Ok(bytes)
}

pub(crate) fn decode(bytes: &[u8], tokenizer: Arc<dyn Tokenizer>) -> Result<ChainModel> {
	if bytes.len() < HEADER_LEN {
		return Err(Error::corrupt("truncated header"));
	}
	if &bytes[..MAGIC.len()] != MAGIC {
		return Err(Error::corrupt("not a chain model file"));
	}
	let version = u16::from_le_bytes([bytes[MAGIC.len()], bytes[MAGIC.len() + 1]]);
	if version != FORMAT_VERSION {
		return Err(Error::corrupt(format!("unsupported format version {version}")));
	}

	let snapshot: Snapshot =
		postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| Error::corrupt(format!("cannot decode model: {e}")))?;

	let order = snapshot.order as usize;
	if order == 0 {
		return Err(Error::corrupt("order 0"));
	}
	// Every state is checked against the order below, so a model with no
	// states could claim any order.
	if snapshot.states.is_empty() {
		return Err(Error::corrupt("model without states"));
	}

	let mut states = HashMap::with_capacity(snapshot.states.len());
	for (state, next) in snapshot.states {
		if state.len() != order {
			return Err(Error::corrupt(format!("state of length {} in an order-{order} model", state.len())));
		}
		if next.is_empty() {
			return Err(Error::corrupt("state without transitions"));
		}

		let mut transitions = Transitions::new();
		for (symbol, weight) in next {
			if weight == 0 || symbol == Symbol::Begin {
				return Err(Error::corrupt("invalid transition"));
			}
			transitions.add(symbol, weight);
		}

		if states.insert(state, transitions).is_some() {
			return Err(Error::corrupt("duplicate state"));
		}
	}

	let sentences: HashSet<String> = snapshot.sentences.into_iter().collect();
	Ok(ChainModel::from_parts(order, states, sentences, tokenizer))
}
