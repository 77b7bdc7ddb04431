use std::fmt;

use serde::{Deserialize, Serialize};

/// Reduced Penn Treebank tag set.
///
/// Variant order is part of the serialized model format: append new
/// variants, never reorder.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PosTag {
	Noun,
	PluralNoun,
	ProperNoun,
	Verb,
	VerbPresent,
	VerbPast,
	Gerund,
	PastParticiple,
	Adjective,
	Adverb,
	Determiner,
	Preposition,
	Pronoun,
	Possessive,
	Conjunction,
	Modal,
	Number,
	To,
	WhWord,
	Interjection,
	Punctuation,
	Symbol,
}

impl PosTag {
	/// Penn-style label.
	pub fn label(self) -> &'static str {
		match self {
			PosTag::Noun => "NN",
			PosTag::PluralNoun => "NNS",
			PosTag::ProperNoun => "NNP",
			PosTag::Verb => "VB",
			PosTag::VerbPresent => "VBP",
			PosTag::VerbPast => "VBD",
			PosTag::Gerund => "VBG",
			PosTag::PastParticiple => "VBN",
			PosTag::Adjective => "JJ",
			PosTag::Adverb => "RB",
			PosTag::Determiner => "DT",
			PosTag::Preposition => "IN",
			PosTag::Pronoun => "PRP",
			PosTag::Possessive => "PRP$",
			PosTag::Conjunction => "CC",
			PosTag::Modal => "MD",
			PosTag::Number => "CD",
			PosTag::To => "TO",
			PosTag::WhWord => "WP",
			PosTag::Interjection => "UH",
			PosTag::Punctuation => ".",
			PosTag::Symbol => "SYM",
		}
	}

	pub fn is_verb(self) -> bool {
		matches!(
			self,
			PosTag::Verb | PosTag::VerbPresent | PosTag::VerbPast | PosTag::Gerund | PosTag::PastParticiple
		)
	}

	pub fn is_noun(self) -> bool {
		matches!(self, PosTag::Noun | PosTag::PluralNoun | PosTag::ProperNoun)
	}

	pub fn is_punctuation(self) -> bool {
		matches!(self, PosTag::Punctuation | PosTag::Symbol)
	}
}

impl fmt::Display for PosTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// Assigns one tag per word of a segment.
///
/// Implementations receive the whole segment because a word's role depends
/// on its neighbours. The returned vector has the same length as `words`.
pub trait PosTagger: Send + Sync + fmt::Debug {
	fn tag(&self, words: &[&str]) -> Vec<PosTag>;
}

/// Lexicon and suffix driven tagger with a contextual correction pass.
///
/// 1. Closed-class words (determiners, pronouns, auxiliaries...) come from a
///    fixed lexicon, everything else gets a guess from its shape and suffix.
/// 2. Open-class guesses are then corrected from the previous tag, in the
///    manner of transformation-based taggers ("the run" is a noun, "we run"
///    and "to run" are verbs, "had walked" is a participle).
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTagger;

impl PosTagger for HeuristicTagger {
	fn tag(&self, words: &[&str]) -> Vec<PosTag> {
		let lowered: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

		// Lexical pass. `open` marks guesses the contextual pass may revise.
		let mut tags = Vec::with_capacity(words.len());
		let mut open = Vec::with_capacity(words.len());
		for (i, word) in words.iter().enumerate() {
			match closed_class(&lowered[i]) {
				Some(tag) => {
					tags.push(tag);
					open.push(false);
				}
				None => {
					let first_in_sentence = i == 0 || words[i - 1].contains(['.', '!', '?']);
					let tag = guess_open_class(word, &lowered[i], first_in_sentence);
					open.push(!matches!(tag, PosTag::Punctuation | PosTag::Symbol | PosTag::Number));
					tags.push(tag);
				}
			}
		}

		// Contextual pass, left to right on already corrected tags.
		for i in 1..tags.len() {
			if !open[i] {
				continue;
			}
			let prev = tags[i - 1];
			let prev_word = lowered[i - 1].as_str();
			let current = tags[i];

			tags[i] = match (prev, current) {
				// "the run", "my walks", "big jump"
				(PosTag::Determiner | PosTag::Possessive | PosTag::Adjective, PosTag::Verb | PosTag::VerbPresent) => {
					PosTag::Noun
				}
				// "to run", "can walk"
				(PosTag::To | PosTag::Modal, PosTag::Noun | PosTag::VerbPresent | PosTag::PluralNoun) => PosTag::Verb,
				// "we run", "he walks"
				(PosTag::Pronoun, PosTag::Noun | PosTag::PluralNoun) if is_subject_pronoun(prev_word) => {
					PosTag::VerbPresent
				}
				// "had walked", "was painted"
				(_, PosTag::VerbPast) if is_perfect_or_passive_auxiliary(prev_word) => PosTag::PastParticiple,
				_ => current,
			};
		}

		tags
	}
}

fn closed_class(word: &str) -> Option<PosTag> {
	let tag = match word {
		"the" | "a" | "an" | "this" | "that" | "these" | "those" | "every" | "each" | "some" | "any" | "no" | "all"
		| "both" | "either" | "neither" | "another" => PosTag::Determiner,
		"i" | "you" | "he" | "she" | "it" | "we" | "they" | "me" | "him" | "us" | "them" | "myself" | "yourself"
		| "himself" | "herself" | "itself" | "ourselves" | "themselves" => PosTag::Pronoun,
		"my" | "your" | "his" | "her" | "its" | "our" | "their" => PosTag::Possessive,
		"of" | "in" | "on" | "at" | "by" | "for" | "with" | "from" | "about" | "into" | "over" | "under" | "after"
		| "before" | "between" | "through" | "during" | "without" | "within" | "against" | "among" | "across"
		| "behind" | "below" | "above" | "near" | "since" | "until" | "upon" | "than" | "as" | "because" | "if"
		| "while" | "although" | "though" | "whether" => PosTag::Preposition,
		"and" | "or" | "but" | "nor" | "yet" | "so" => PosTag::Conjunction,
		"can" | "could" | "will" | "would" | "shall" | "should" | "may" | "might" | "must" => PosTag::Modal,
		"to" => PosTag::To,
		"who" | "whom" | "whose" | "which" | "what" | "when" | "where" | "why" | "how" => PosTag::WhWord,
		"is" | "are" | "am" | "has" | "have" | "does" | "do" => PosTag::VerbPresent,
		"was" | "were" | "had" | "did" => PosTag::VerbPast,
		"be" => PosTag::Verb,
		"been" => PosTag::PastParticiple,
		"being" => PosTag::Gerund,
		"not" | "n't" | "very" | "too" | "also" | "just" | "never" | "always" | "often" | "here" | "there" | "now"
		| "then" | "still" | "already" | "soon" | "again" | "quite" | "rather" | "almost" => PosTag::Adverb,
		"oh" | "ah" | "hey" | "hello" | "hi" | "wow" | "yes" | "okay" | "ok" | "please" | "thanks" => {
			PosTag::Interjection
		}
		_ => return None,
	};
	Some(tag)
}

fn guess_open_class(word: &str, lowered: &str, first_in_sentence: bool) -> PosTag {
	if !word.chars().any(char::is_alphanumeric) {
		return if word.chars().all(|c| ".,;:!?…'\"()[]{}-–—«»“”‘’".contains(c)) {
			PosTag::Punctuation
		} else {
			PosTag::Symbol
		};
	}
	if word.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
		return PosTag::Number;
	}
	if !first_in_sentence && word.chars().next().is_some_and(char::is_uppercase) {
		return PosTag::ProperNoun;
	}

	let len = lowered.chars().count();
	if len > 4 && lowered.ends_with("ing") {
		PosTag::Gerund
	} else if len > 3 && lowered.ends_with("ed") {
		PosTag::VerbPast
	} else if len > 3 && lowered.ends_with("ly") {
		PosTag::Adverb
	} else if len > 4
		&& ["ous", "ful", "able", "ible", "ive", "less", "ish", "ic", "al"]
			.iter()
			.any(|suffix| lowered.ends_with(suffix))
	{
		PosTag::Adjective
	} else if len > 3 && lowered.ends_with('s') && !["ss", "us", "is"].iter().any(|s| lowered.ends_with(s)) {
		PosTag::PluralNoun
	} else {
		PosTag::Noun
	}
}

fn is_subject_pronoun(word: &str) -> bool {
	matches!(word, "i" | "you" | "he" | "she" | "it" | "we" | "they")
}

fn is_perfect_or_passive_auxiliary(word: &str) -> bool {
	matches!(word, "has" | "have" | "had" | "is" | "are" | "was" | "were" | "been" | "be")
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tag(words: &[&str]) -> Vec<PosTag> {
		HeuristicTagger.tag(words)
	}

	#[test]
	fn output_has_one_tag_per_word() {
		let words = ["The", "cat", "sat", "."];
		assert_eq!(tag(&words).len(), words.len());
		assert!(tag(&[]).is_empty());
	}

	#[test]
	fn closed_class_words_use_lexicon() {
		assert_eq!(
			tag(&["The", "cat", "and", "my", "dog"]),
			vec![PosTag::Determiner, PosTag::Noun, PosTag::Conjunction, PosTag::Possessive, PosTag::Noun]
		);
	}

	#[test]
	fn context_disambiguates_noun_and_verb() {
		assert_eq!(tag(&["the", "run"])[1], PosTag::Noun);
		assert_eq!(tag(&["we", "run"])[1], PosTag::VerbPresent);
		assert_eq!(tag(&["to", "run"])[1], PosTag::Verb);
		assert_eq!(tag(&["can", "run"])[1], PosTag::Verb);
		assert_eq!(tag(&["he", "walks"])[1], PosTag::VerbPresent);
	}

	#[test]
	fn past_tense_after_auxiliary_is_participle() {
		assert_eq!(tag(&["she", "walked"])[1], PosTag::VerbPast);
		assert_eq!(tag(&["she", "had", "walked"])[2], PosTag::PastParticiple);
	}

	#[test]
	fn shape_rules() {
		assert_eq!(
			tag(&["Running", "quickly", ",", "Alice", "saw", "42", "dangerous", "birds", "#"]),
			vec![
				PosTag::Gerund,
				PosTag::Adverb,
				PosTag::Punctuation,
				PosTag::ProperNoun,
				PosTag::Noun,
				PosTag::Number,
				PosTag::Adjective,
				PosTag::PluralNoun,
				PosTag::Symbol,
			]
		);
	}

	#[test]
	fn sentence_initial_capital_is_not_proper_noun() {
		assert_eq!(tag(&["Dogs", "bark"])[0], PosTag::PluralNoun);
		assert_eq!(tag(&["Hi", ".", "Dogs", "bark"])[2], PosTag::PluralNoun);
	}

	#[test]
	fn labels_are_penn_style() {
		assert_eq!(PosTag::Possessive.to_string(), "PRP$");
		assert!(PosTag::Symbol.is_punctuation());
		assert!(PosTag::ProperNoun.is_noun());
		assert!(!PosTag::Adverb.is_verb());
	}
}
