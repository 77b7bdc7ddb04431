use std::collections::{HashMap, HashSet};
use std::iter;
use std::sync::{Arc, OnceLock};
use std::thread;

use log::{debug, warn};
use rand::Rng;

use super::generation::GenerationConfig;
use super::snapshot;
use super::state::{State, Symbol, Transitions};
use crate::error::{Error, Result};
use crate::tokenizer::{Token, Tokenizer, split_sentences};

/// A Markov chain over part-of-speech annotated tokens.
///
/// Each state is the tuple of the last `order` symbols; its distribution
/// counts which symbol followed it in the corpus. Every sentence starts from
/// `order` begin sentinels and ends with an end sentinel, so a random walk
/// knows where sentences start and stop.
///
/// # Responsibilities
/// - Build the chain from raw text, in parallel over sentence chunks
/// - Generate sentences by weighted random walks with bounded retries
/// - Combine with another chain of the same order
/// - Encode to and decode from the versioned on-disk format
///
/// # Invariants
/// - `order` is always >= 1
/// - Every state key holds exactly `order` symbols
/// - Every state has at least one transition, all weights are counts >= 1
///
/// The model is never mutated once built; `combine` returns a new one.
#[derive(Clone, Debug)]
pub struct ChainModel {
	order: usize,
	states: HashMap<State, Transitions>,
	/// Training sentences, lowercased, used to recognize overlap with the corpus.
	sentences: HashSet<String>,
	/// `sentences` laid out for run searches, built on first use.
	corpus_index: OnceLock<String>,
	tokenizer: Arc<dyn Tokenizer>,
}

impl PartialEq for ChainModel {
	fn eq(&self, other: &Self) -> bool {
		self.order == other.order && self.states == other.states && self.sentences == other.sentences
	}
}

impl ChainModel {
	/// Builds a model of the given order using one worker per CPU.
	///
	/// # Errors
	/// - `InvalidOrder` if `order` is zero
	/// - `Build` if the text holds fewer tokens than `order`
	pub fn build(text: &str, order: usize, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
		Self::build_with_threads(text, order, tokenizer, num_cpus::get())
	}

	/// Splits the text into sentences, tokenizes them on `threads` scoped
	/// workers, then learns a partial model per chunk and merges the partials.
	///
	/// The corpus is measured before any state is allocated, so an order
	/// larger than the token count fails without touching memory.
	///
	/// # Errors
	/// Same as [`ChainModel::build`], plus `Worker` if a worker panicked.
	pub fn build_with_threads(text: &str, order: usize, tokenizer: Arc<dyn Tokenizer>, threads: usize) -> Result<Self> {
		if order == 0 {
			return Err(Error::InvalidOrder(order));
		}

		let sentences = split_sentences(text);
		let tokenized: Vec<Vec<Token>> = in_chunks(&sentences, threads, |chunk| {
			chunk.iter().map(|sentence| tokenizer.tokenize(sentence)).filter(|tokens| !tokens.is_empty()).collect::<Vec<_>>()
		})?
		.into_iter()
		.flatten()
		.collect();

		let tokens: usize = tokenized.iter().map(Vec::len).sum();
		if tokens == 0 || tokens < order {
			return Err(Error::Build { order, tokens });
		}

		let partials = in_chunks(&tokenized, threads, |chunk| {
			let mut partial = ChainModel::empty(order, Arc::clone(&tokenizer));
			for sentence in chunk {
				partial.learn(sentence);
			}
			partial
		})?;

		let mut model = ChainModel::empty(order, tokenizer);
		for partial in &partials {
			model.merge_from(partial);
		}

		debug!(
			"built order-{} chain: {} sentences, {} tokens, {} states",
			order,
			tokenized.len(),
			tokens,
			model.states.len()
		);
		Ok(model)
	}

	fn empty(order: usize, tokenizer: Arc<dyn Tokenizer>) -> Self {
		Self { order, states: HashMap::new(), sentences: HashSet::new(), corpus_index: OnceLock::new(), tokenizer }
	}

	/// Feeds one tokenized sentence into the counts.
	///
	/// The sentence is framed as `[Begin; order] ++ tokens ++ [End]`.
	fn learn(&mut self, tokens: &[Token]) {
		self.sentences.insert(self.tokenizer.detokenize(tokens).to_lowercase());

		let mut state = State::initial(self.order);
		for symbol in tokens.iter().cloned().map(Symbol::Word).chain(iter::once(Symbol::End)) {
			self.states.entry(state.clone()).or_default().add(symbol.clone(), 1);
			state.advance(symbol);
		}
	}

	fn merge_from(&mut self, other: &Self) {
		for (state, transitions) in &other.states {
			self.states.entry(state.clone()).or_default().merge(transitions);
		}
		self.sentences.extend(other.sentences.iter().cloned());
		self.corpus_index = OnceLock::new();
	}

	/// Combines two models of the same order.
	///
	/// States are unioned and per-transition weights summed, so each source
	/// keeps an influence proportional to the size of its corpus.
	///
	/// # Errors
	/// `Combine` if the orders differ.
	pub fn combine(left: &Self, right: &Self) -> Result<Self> {
		if left.order != right.order {
			return Err(Error::Combine { left: left.order, right: right.order });
		}

		let mut combined = left.clone();
		combined.merge_from(right);
		Ok(combined)
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn state_count(&self) -> usize {
		self.states.len()
	}

	/// Every state produced by construction. All of them are reachable from
	/// the initial state.
	pub fn states(&self) -> impl Iterator<Item = &State> {
		self.states.keys()
	}

	pub fn transitions(&self, state: &State) -> Option<&Transitions> {
		self.states.get(state)
	}

	/// Weight of `state -> next`, zero if never observed.
	pub fn weight(&self, state: &State, next: &Symbol) -> u64 {
		self.states.get(state).map_or(0, |transitions| transitions.weight(next))
	}

	pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
		&self.tokenizer
	}

	pub(crate) fn parts(&self) -> (&HashMap<State, Transitions>, &HashSet<String>) {
		(&self.states, &self.sentences)
	}

	pub(crate) fn from_parts(
		order: usize,
		states: HashMap<State, Transitions>,
		sentences: HashSet<String>,
		tokenizer: Arc<dyn Tokenizer>,
	) -> Self {
		Self { order, states, sentences, corpus_index: OnceLock::new(), tokenizer }
	}

	/// Encodes the model in the versioned on-disk format.
	pub fn serialize(&self) -> Result<Vec<u8>> {
		snapshot::encode(self)
	}

	/// Decodes a model written by [`ChainModel::serialize`].
	///
	/// # Errors
	/// `CorruptCache` if the data is truncated, from an unknown format
	/// version, or violates a model invariant.
	pub fn deserialize(bytes: &[u8], tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
		snapshot::decode(bytes, tokenizer)
	}

	/// One weighted random walk from the initial state.
	///
	/// Returns `None` if the walk runs into an unknown state or has not
	/// reached the end sentinel after `max_steps` symbols.
	fn walk<R: Rng>(&self, max_steps: usize, rng: &mut R) -> Option<Vec<Token>> {
		let mut state = State::initial(self.order);
		let mut tokens = Vec::new();

		for _ in 0..max_steps {
			match self.states.get(&state)?.sample(rng)? {
				Symbol::End => return Some(tokens),
				Symbol::Word(token) => {
					tokens.push(token.clone());
					state.advance(Symbol::Word(token.clone()));
				}
				Symbol::Begin => return None,
			}
		}

		None
	}

	/// Training sentences padded with spaces and separated by newlines, so a
	/// padded run only matches whole tokens inside a single sentence.
	fn corpus_index(&self) -> &str {
		self.corpus_index.get_or_init(|| {
			self.sentences.iter().map(|sentence| format!(" {sentence} ")).collect::<Vec<_>>().join("\n")
		})
	}

	/// Whether `tokens` shares a run longer than `config.overlap_limit` with
	/// one training sentence. Runs are compared case-insensitively.
	fn overlaps_corpus(&self, tokens: &[Token], config: &GenerationConfig) -> bool {
		let limit = config.overlap_limit(tokens.len());
		let runs = tokens.len().saturating_sub(limit).max(1);
		let index = self.corpus_index();

		(0..runs).any(|start| {
			let end = (start + limit + 1).min(tokens.len());
			let run = self.tokenizer.detokenize(&tokens[start..end]).to_lowercase();
			index.contains(&format!(" {run} "))
		})
	}

	/// Generates one sentence using the thread-local RNG.
	pub fn generate_sentence(&self, config: &GenerationConfig) -> Option<String> {
		self.generate_sentence_with(config, &mut rand::rng())
	}

	/// Generates one sentence, or `None` if no walk produced an acceptable one.
	///
	/// Up to `config.tries()` walks are made. A walk is acceptable if it ends
	/// and holds at least `config.min_words` words. When corpus overlap is
	/// avoided, a sentence repeating a long run of one training sentence is
	/// only returned if no other sentence turned up.
	///
	/// `None` is an expected outcome; callers retry.
	pub fn generate_sentence_with<R: Rng>(&self, config: &GenerationConfig, rng: &mut R) -> Option<String> {
		let mut fallback = None;

		for _ in 0..config.tries() {
			let Some(tokens) = self.walk(config.max_steps(), rng) else {
				continue;
			};
			let words = tokens.iter().filter(|token| token.is_word()).count();
			if tokens.is_empty() || words < config.min_words {
				continue;
			}

			let sentence = self.tokenizer.detokenize(&tokens);
			if !config.avoid_corpus_overlap || !self.overlaps_corpus(&tokens, config) {
				return Some(sentence);
			}
			fallback.get_or_insert(sentence);
		}

		fallback
	}

	/// Generates `count` sentences using the thread-local RNG.
	pub fn generate_sentences(&self, count: usize, config: &GenerationConfig) -> Result<String> {
		self.generate_sentences_with(count, config, &mut rand::rng())
	}

	/// Generates `count` sentences (at least one) joined by single spaces.
	///
	/// # Errors
	/// `Generation` if a sentence could not be produced within
	/// `config.max_attempts()` calls.
	pub fn generate_sentences_with<R: Rng>(&self, count: usize, config: &GenerationConfig, rng: &mut R) -> Result<String> {
		let count = count.max(1);
		let mut sentences = Vec::with_capacity(count);

		for _ in 0..count {
			let sentence = (0..config.max_attempts())
				.find_map(|_| self.generate_sentence_with(config, rng))
				.ok_or_else(|| {
					warn!("chain of order {} failed to end a sentence in {} attempts", self.order, config.max_attempts());
					Error::Generation { attempts: config.max_attempts() }
				})?;
			sentences.push(sentence);
		}

		Ok(sentences.join(" "))
	}
}

/// Runs `work` over `threads` contiguous chunks of `items` on scoped
/// threads and returns the per-chunk results in order.
fn in_chunks<T, U, F>(items: &[T], threads: usize, work: F) -> Result<Vec<U>>
where
	T: Sync,
	U: Send,
	F: Fn(&[T]) -> U + Sync,
{
	let chunk_size = items.len().div_ceil(threads.max(1)).max(1);
	let work = &work;

	thread::scope(|scope| {
		let handles: Vec<_> = items.chunks(chunk_size).map(|chunk| scope.spawn(move || work(chunk))).collect();

		handles
			.into_iter()
			.map(|handle| handle.join().map_err(|_| Error::Worker("model build thread panicked".to_owned())))
			.collect()
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokenizer::{PosTag, TaggedTokenizer};

	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn tokenizer() -> Arc<dyn Tokenizer> {
		Arc::new(TaggedTokenizer::default())
	}

	fn build(text: &str, order: usize) -> ChainModel {
		ChainModel::build(text, order, tokenizer()).unwrap()
	}

	fn surfaces(sentence: &str) -> Vec<&str> {
		sentence.split_whitespace().collect()
	}

	const CORPUS: &str = "The cat sat on the mat. The dog sat on the rug. A bird flew over the mat. \
		The cat chased the bird. The dog chased the cat over the rug.";

	#[test]
	fn build_rejects_zero_order() {
		assert!(matches!(ChainModel::build("The cat sat.", 0, tokenizer()), Err(Error::InvalidOrder(0))));
	}

	#[test]
	fn build_rejects_short_input() {
		assert!(matches!(
			ChainModel::build("Hi.", 3, tokenizer()),
			Err(Error::Build { order: 3, tokens: 2 })
		));
		assert!(matches!(ChainModel::build("   ", 1, tokenizer()), Err(Error::Build { tokens: 0, .. })));
	}

	#[test]
	fn build_rejects_huge_orders_without_allocating() {
		for order in [usize::MAX, 1 << 40] {
			let result = ChainModel::build_with_threads(CORPUS, order, tokenizer(), 4);
			assert!(matches!(result, Err(Error::Build { order: o, .. }) if o == order));
		}
	}

	#[test]
	fn seeded_generation_is_reproducible_across_builds() {
		let config = GenerationConfig::default();
		let first = build(CORPUS, 1);
		let second = build(CORPUS, 1);

		let a = first.generate_sentences_with(5, &config, &mut StdRng::seed_from_u64(3)).unwrap();
		let b = second.generate_sentences_with(5, &config, &mut StdRng::seed_from_u64(3)).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn build_counts_transitions_with_sentinels() {
		let model = build("The cat sat. The cat ran.", 2);
		let the = Symbol::Word(Token::new("The", PosTag::Determiner));
		let cat = Symbol::Word(Token::new("cat", PosTag::Noun));

		assert_eq!(model.weight(&State::initial(2), &the), 2);
		let after_the = State::from_symbols(vec![Symbol::Begin, the.clone()]);
		assert_eq!(model.weight(&after_the, &cat), 2);

		let after_cat = State::from_symbols(vec![the, cat]);
		assert_eq!(model.transitions(&after_cat).map(Transitions::total), Some(2));
		assert_eq!(model.transitions(&after_cat).map(Transitions::len), Some(2));
	}

	#[test]
	fn every_state_has_an_outgoing_transition() {
		let model = build(CORPUS, 2);
		for state in model.states() {
			assert_eq!(state.len(), 2);
			let transitions = model.transitions(state).unwrap();
			assert!(transitions.total() > 0);
		}
	}

	#[test]
	fn parallel_build_matches_single_thread_build() {
		let single = ChainModel::build_with_threads(CORPUS, 2, tokenizer(), 1).unwrap();
		let many = ChainModel::build_with_threads(CORPUS, 2, tokenizer(), 8).unwrap();
		assert_eq!(single, many);
	}

	#[test]
	fn generated_sentences_use_corpus_vocabulary() {
		let model = build("The cat sat. The cat ran.", 2);
		let mut rng = StdRng::seed_from_u64(3);

		for _ in 0..20 {
			let sentence = model.generate_sentence_with(&GenerationConfig::default(), &mut rng).unwrap();
			for word in surfaces(&sentence) {
				assert!(["The", "cat", "sat", "ran", "."].contains(&word), "unexpected word {word}");
			}
		}
	}

	#[test]
	fn corpus_copies_are_returned_when_nothing_else_exists() {
		let model = build("Only one sentence here.", 1);
		let mut rng = StdRng::seed_from_u64(11);

		let sentence = model.generate_sentence_with(&GenerationConfig::default(), &mut rng);
		assert_eq!(sentence.as_deref(), Some("Only one sentence here ."));
	}

	#[test]
	fn long_runs_of_one_training_sentence_count_as_overlap() {
		let model = build(CORPUS, 2);
		let config = GenerationConfig::default();
		let tokens = |text: &str| model.tokenizer().tokenize(text);

		// 9 tokens, limit 6: "the dog chased the cat over the" repeats 7.
		assert!(model.overlaps_corpus(&tokens("The dog chased the cat over the mat."), &config));
		// 7 tokens, limit 5: "the cat sat on the" repeats only 5.
		assert!(!model.overlaps_corpus(&tokens("The cat sat on the rug."), &config));
		assert!(!model.overlaps_corpus(&tokens("A bird flew over the cat sat on the rug."), &config));
		assert!(model.overlaps_corpus(&tokens("the CAT chased THE bird ."), &config));
	}

	#[test]
	fn novel_sentences_are_preferred_over_overlapping_ones() {
		let model = build(CORPUS, 1);
		let mut config = GenerationConfig::default();
		config.set_tries(200).unwrap();
		let mut rng = StdRng::seed_from_u64(5);

		for _ in 0..20 {
			let sentence = model.generate_sentence_with(&config, &mut rng).unwrap();
			assert!(!model.overlaps_corpus(&model.tokenizer().tokenize(&sentence), &config), "{sentence}");
		}
	}

	#[test]
	fn min_words_rejects_short_sentences() {
		let model = build("Hi. Hi.", 1);
		let mut config = GenerationConfig::default();
		config.min_words = 2;
		let mut rng = StdRng::seed_from_u64(5);

		assert_eq!(model.generate_sentence_with(&config, &mut rng), None);
	}

	#[test]
	fn generate_sentences_produces_requested_count() {
		let model = build(CORPUS, 2);
		let mut rng = StdRng::seed_from_u64(42);

		for count in [1, 3, 10] {
			let text = model.generate_sentences_with(count, &GenerationConfig::default(), &mut rng).unwrap();
			assert_eq!(text.matches('.').count(), count);
		}
		let text = model.generate_sentences_with(0, &GenerationConfig::default(), &mut rng).unwrap();
		assert_eq!(text.matches('.').count(), 1);
	}

	#[test]
	fn generation_gives_up_after_bounded_attempts() {
		let model = build("One two three four five six.", 1);
		let mut config = GenerationConfig::default();
		config.set_max_steps(3).unwrap();
		config.set_max_attempts(4).unwrap();

		let result = model.generate_sentences_with(2, &config, &mut StdRng::seed_from_u64(0));
		assert!(matches!(result, Err(Error::Generation { attempts: 4 })));
	}

	#[test]
	fn combine_unions_states_and_sums_weights() {
		let left = build("The cat sat. The cat ran.", 2);
		let right = build("The cat slept. A dog barked.", 2);
		let combined = ChainModel::combine(&left, &right).unwrap();

		let union: HashSet<&State> = left.states().chain(right.states()).collect();
		let combined_states: HashSet<&State> = combined.states().collect();
		assert_eq!(combined_states, union);

		for state in &union {
			let next_symbols: HashSet<&Symbol> = left
				.transitions(state)
				.into_iter()
				.chain(right.transitions(state))
				.flat_map(|t| t.iter().map(|(symbol, _)| symbol))
				.collect();
			for next in next_symbols {
				assert_eq!(combined.weight(state, next), left.weight(state, next) + right.weight(state, next));
			}
		}
	}

	#[test]
	fn combine_rejects_different_orders() {
		let left = build(CORPUS, 2);
		let right = build(CORPUS, 3);
		assert!(matches!(ChainModel::combine(&left, &right), Err(Error::Combine { left: 2, right: 3 })));
	}

	#[test]
	fn serialization_round_trip_preserves_weights() {
		let model = build(CORPUS, 2);
		let bytes = model.serialize().unwrap();
		let restored = ChainModel::deserialize(&bytes, tokenizer()).unwrap();

		assert_eq!(restored.order(), 2);
		assert_eq!(restored, model);
		for state in model.states() {
			assert_eq!(restored.transitions(state), model.transitions(state));
		}
	}

	#[test]
	fn serialization_is_deterministic() {
		let first = build(CORPUS, 2).serialize().unwrap();
		let second = build(CORPUS, 2).serialize().unwrap();
		assert_eq!(first, second);
	}
}
