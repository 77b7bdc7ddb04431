use std::collections::BTreeMap;

use rand::Rng;

use serde::{Deserialize, Serialize};

use crate::tokenizer::Token;

/// The chain alphabet: annotated tokens framed by sentence sentinels.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
	Begin,
	Word(Token),
	End,
}

/// The last `order` symbols seen, used as the chain's lookup key.
///
/// Equality and hashing cover the whole tuple.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(Vec<Symbol>);

impl State {
	/// The state every sentence starts from: `order` begin sentinels.
	pub fn initial(order: usize) -> Self {
		Self(vec![Symbol::Begin; order])
	}

	pub fn from_symbols(symbols: Vec<Symbol>) -> Self {
		Self(symbols)
	}

	pub fn symbols(&self) -> &[Symbol] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Drops the oldest symbol and appends `next`.
	pub(crate) fn advance(&mut self, next: Symbol) {
		if !self.0.is_empty() {
			self.0.remove(0);
			self.0.push(next);
		}
	}
}

/// Weighted distribution over the symbols that may follow one state.
///
/// ## Invariants
/// - Each weight is strictly positive
/// - Weights are raw observation counts, never normalized
/// - Symbols are kept in order, so a seeded RNG always draws the same way
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Transitions {
	/// Example: { Word(cat::NN) => 42, End => 3 }
	counts: BTreeMap<Symbol, u64>,
}

impl Transitions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records `weight` more observations of `next`. Zero weights are ignored.
	pub fn add(&mut self, next: Symbol, weight: u64) {
		if weight == 0 {
			return;
		}
		*self.counts.entry(next).or_insert(0) += weight;
	}

	/// Weight of one transition, zero if never observed.
	pub fn weight(&self, next: &Symbol) -> u64 {
		self.counts.get(next).copied().unwrap_or(0)
	}

	pub fn total(&self) -> u64 {
		self.counts.values().sum()
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&Symbol, u64)> {
		self.counts.iter().map(|(symbol, weight)| (symbol, *weight))
	}

	/// Picks the next symbol with probability proportional to its weight.
	///
	/// Returns `None` if the distribution is empty.
	pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<&Symbol> {
		let total = self.total();
		if total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..total);

		let mut fallback = None;
		for (symbol, weight) in &self.counts {
			if r < *weight {
				return Some(symbol);
			}
			r -= weight;
			fallback = Some(symbol);
		}

		fallback
	}

	/// Sums the weights of `other` into this distribution.
	pub fn merge(&mut self, other: &Self) {
		for (symbol, weight) in &other.counts {
			self.add(symbol.clone(), *weight);
		}
	}
}
