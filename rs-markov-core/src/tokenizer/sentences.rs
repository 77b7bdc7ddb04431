use std::sync::LazyLock;

use regex::Regex;

static PARAGRAPH_BREAK: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph pattern is valid"));

static CHUNK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("chunk pattern is valid"));

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
	"mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "vs.", "etc.", "e.g.", "i.e.", "inc.", "ltd.",
	"co.", "no.", "fig.", "jan.", "feb.", "mar.", "apr.", "jun.", "jul.", "aug.", "sep.", "sept.", "oct.", "nov.",
	"dec.",
];

const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '»'];
const OPENERS: &[char] = &['"', '\'', '“', '‘', '(', '[', '«'];

/// Splits a corpus into sentences.
///
/// A sentence ends at `.`, `!` or `?` (possibly followed by closing quotes or
/// brackets) when the next chunk starts with an uppercase letter or a digit,
/// or when the paragraph ends. Known abbreviations never end a sentence.
/// Blank lines always do.
pub fn split_sentences(text: &str) -> Vec<&str> {
	let mut sentences = Vec::new();

	for paragraph in PARAGRAPH_BREAK.split(text) {
		let chunks: Vec<_> = CHUNK.find_iter(paragraph).collect();
		let mut start: Option<usize> = None;

		for (i, chunk) in chunks.iter().enumerate() {
			let begin = *start.get_or_insert(chunk.start());
			let next = chunks.get(i + 1).map(|m| m.as_str());

			if ends_sentence(chunk.as_str(), next) {
				push_trimmed(&mut sentences, &paragraph[begin..chunk.end()]);
				start = None;
			}
		}

		if let (Some(begin), Some(last)) = (start, chunks.last()) {
			push_trimmed(&mut sentences, &paragraph[begin..last.end()]);
		}
	}

	sentences
}

fn ends_sentence(chunk: &str, next: Option<&str>) -> bool {
	let core = chunk.trim_end_matches(CLOSERS);
	if !core.ends_with(['.', '!', '?']) {
		return false;
	}
	if core.ends_with('.') {
		let word = core.trim_start_matches(OPENERS).to_lowercase();
		if ABBREVIATIONS.contains(&word.as_str()) {
			return false;
		}
	}

	match next {
		None => true,
		Some(next) => next
			.trim_start_matches(OPENERS)
			.chars()
			.next()
			.is_some_and(|c| c.is_uppercase() || c.is_ascii_digit()),
	}
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, sentence: &'a str) {
	let sentence = sentence.trim();
	if !sentence.is_empty() {
		sentences.push(sentence);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_terminal_punctuation() {
		assert_eq!(split_sentences("The cat sat. The cat ran."), vec!["The cat sat.", "The cat ran."]);
		assert_eq!(split_sentences("Really? Yes! 3 cats."), vec!["Really?", "Yes!", "3 cats."]);
	}

	#[test]
	fn lowercase_continuation_does_not_split() {
		assert_eq!(split_sentences("Wait... what now."), vec!["Wait... what now."]);
	}

	#[test]
	fn abbreviations_do_not_split() {
		assert_eq!(
			split_sentences("Mr. Smith met Dr. Jones. They talked."),
			vec!["Mr. Smith met Dr. Jones.", "They talked."]
		);
	}

	#[test]
	fn closing_quotes_stay_with_sentence() {
		assert_eq!(
			split_sentences("He said \"stop.\" Then he left."),
			vec!["He said \"stop.\"", "Then he left."]
		);
	}

	#[test]
	fn blank_lines_are_hard_boundaries() {
		assert_eq!(
			split_sentences("first line without stop\n\nsecond one\nstill second"),
			vec!["first line without stop", "second one\nstill second"]
		);
	}

	#[test]
	fn empty_text_has_no_sentences() {
		assert!(split_sentences("").is_empty());
		assert!(split_sentences(" \n\n \n").is_empty());
	}
}
