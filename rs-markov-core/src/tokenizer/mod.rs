//! Text segmentation and part-of-speech annotation.
//!
//! A chain model never sees raw words: every surface form is paired with the
//! grammatical role it played in its sentence, so "run" the noun and "run"
//! the verb become distinct chain symbols.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sentence segmentation of a whole corpus.
pub mod sentences;

/// Part-of-speech tag set and the contextual tagger.
pub mod tagger;

pub use sentences::split_sentences;
pub use tagger::{HeuristicTagger, PosTag, PosTagger};

/// Words are letter/digit runs that may carry inner apostrophes or hyphens
/// ("don't", "well-known"); any other non-space run is punctuation.
static WORD_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"[\p{L}\p{N}]+(?:['’\-][\p{L}\p{N}]+)*|[^\s\p{L}\p{N}]+")
		.expect("word split pattern is valid")
});

/// A surface form annotated with its grammatical role.
///
/// Two tokens are equal only if both the text and the tag match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
	surface: String,
	tag: PosTag,
}

impl Token {
	pub fn new(surface: impl Into<String>, tag: PosTag) -> Self {
		Self { surface: surface.into(), tag }
	}

	pub fn surface(&self) -> &str {
		&self.surface
	}

	pub fn tag(&self) -> PosTag {
		self.tag
	}

	/// Whether the token counts towards a sentence's word length.
	pub fn is_word(&self) -> bool {
		!self.tag.is_punctuation()
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}::{}", self.surface, self.tag)
	}
}

/// Splitting and joining capability injected into chain models.
pub trait Tokenizer: Send + Sync + fmt::Debug {
	/// Splits a sentence into annotated tokens.
	fn tokenize(&self, text: &str) -> Vec<Token>;

	/// Rebuilds plain text from tokens. Tags are dropped.
	fn detokenize(&self, tokens: &[Token]) -> String;
}

/// Regex splitting followed by whole-segment tagging.
///
/// `detokenize` joins surface forms with single spaces, so punctuation
/// spacing is not reproduced exactly.
#[derive(Debug, Clone)]
pub struct TaggedTokenizer {
	tagger: Arc<dyn PosTagger>,
}

impl TaggedTokenizer {
	pub fn new(tagger: impl PosTagger + 'static) -> Self {
		Self { tagger: Arc::new(tagger) }
	}
}

impl Default for TaggedTokenizer {
	fn default() -> Self {
		Self::new(HeuristicTagger::default())
	}
}

impl Tokenizer for TaggedTokenizer {
	fn tokenize(&self, text: &str) -> Vec<Token> {
		let words: Vec<&str> = WORD_SPLIT.find_iter(text).map(|m| m.as_str()).collect();
		if words.is_empty() {
			return Vec::new();
		}

		// The tagger must see the whole segment: tags depend on neighbours.
		let tags = self.tagger.tag(&words);
		words
			.into_iter()
			.zip(tags)
			.map(|(word, tag)| Token::new(word, tag))
			.collect()
	}

	fn detokenize(&self, tokens: &[Token]) -> String {
		tokens.iter().map(Token::surface).collect::<Vec<_>>().join(" ")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn surfaces(tokens: &[Token]) -> Vec<&str> {
		tokens.iter().map(Token::surface).collect()
	}

	#[test]
	fn splits_words_and_punctuation() {
		let tokenizer = TaggedTokenizer::default();
		let tokens = tokenizer.tokenize("Don't stop, the well-known cat sat!");

		assert_eq!(surfaces(&tokens), vec!["Don't", "stop", ",", "the", "well-known", "cat", "sat", "!"]);
	}

	#[test]
	fn empty_input_yields_no_tokens() {
		let tokenizer = TaggedTokenizer::default();
		assert!(tokenizer.tokenize("").is_empty());
		assert!(tokenizer.tokenize("   \n\t ").is_empty());
	}

	#[test]
	fn same_surface_with_different_roles_differs() {
		let tokenizer = TaggedTokenizer::default();
		let noun = tokenizer.tokenize("The run was long.");
		let verb = tokenizer.tokenize("We run every day.");

		let noun_run = &noun[1];
		let verb_run = &verb[1];
		assert_eq!(noun_run.surface(), verb_run.surface());
		assert_ne!(noun_run, verb_run);
		assert_eq!(noun_run.tag(), PosTag::Noun);
		assert!(verb_run.tag().is_verb());
	}

	#[test]
	fn detokenize_joins_with_single_spaces() {
		let tokenizer = TaggedTokenizer::default();
		let tokens = tokenizer.tokenize("The cat sat.");

		assert_eq!(tokenizer.detokenize(&tokens), "The cat sat .");
	}

	#[test]
	fn punctuation_tokens_are_not_words() {
		let tokenizer = TaggedTokenizer::default();
		let tokens = tokenizer.tokenize("Hi !");

		assert!(tokens[0].is_word());
		assert!(!tokens[1].is_word());
	}

	#[test]
	fn token_display_shows_tag() {
		let token = Token::new("cat", PosTag::Noun);
		assert_eq!(token.to_string(), "cat::NN");
	}
}
