/// Limits applied while walking a chain to produce sentences.
///
/// # Responsibilities
/// - Bound every random walk (`max_steps`) and the walks per call (`tries`)
/// - Bound the calls made for one sentence (`max_attempts`) so generation
///   always terminates, with an error when a model cannot end a sentence
/// - Reject degenerate output (`min_words`) and prefer sentences that do not
///   repeat long runs of the corpus (`avoid_corpus_overlap`)
///
/// # Invariants
/// - `tries`, `max_steps` and `max_attempts` are always >= 1
/// - `max_overlap_ratio` is within `0.0..=1.0`
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
	/// Random walks performed by a single `generate_sentence` call.
	tries: usize,

	/// Symbols a single walk may emit before it is abandoned.
	max_steps: usize,

	/// Minimum number of non-punctuation tokens in an accepted sentence.
	pub min_words: usize,

	/// `generate_sentence` calls allowed per requested sentence.
	max_attempts: usize,

	/// Keep looking for a sentence that shares no overlong run of words with
	/// a training sentence. An overlapping sentence is still returned when
	/// every walk of a call produced one.
	pub avoid_corpus_overlap: bool,

	/// Longest shared run, as a share of the generated sentence's tokens.
	max_overlap_ratio: f64,

	/// Longest shared run in tokens, whatever the sentence length.
	pub max_overlap_total: usize,
}

impl Default for GenerationConfig {
	fn default() -> Self {
		Self {
			tries: 10,
			max_steps: 200,
			min_words: 1,
			max_attempts: 50,
			avoid_corpus_overlap: true,
			max_overlap_ratio: 0.7,
			max_overlap_total: 15,
		}
	}
}

impl GenerationConfig {
	pub fn tries(&self) -> usize {
		self.tries
	}

	pub fn max_steps(&self) -> usize {
		self.max_steps
	}

	pub fn max_attempts(&self) -> usize {
		self.max_attempts
	}

	pub fn max_overlap_ratio(&self) -> f64 {
		self.max_overlap_ratio
	}

	/// Longest run of tokens a sentence of `tokens` tokens may share with
	/// the corpus.
	pub fn overlap_limit(&self, tokens: usize) -> usize {
		((self.max_overlap_ratio * tokens as f64).round() as usize).min(self.max_overlap_total)
	}

	/// # Errors
	/// Returns an error if `tries` is zero.
	pub fn set_tries(&mut self, tries: usize) -> Result<(), String> {
		if tries == 0 {
			return Err("tries must be at least 1".to_owned());
		}
		self.tries = tries;
		Ok(())
	}

	/// # Errors
	/// Returns an error if `max_steps` is zero.
	pub fn set_max_steps(&mut self, max_steps: usize) -> Result<(), String> {
		if max_steps == 0 {
			return Err("max_steps must be at least 1".to_owned());
		}
		self.max_steps = max_steps;
		Ok(())
	}

	/// # Errors
	/// Returns an error if `max_attempts` is zero.
	pub fn set_max_attempts(&mut self, max_attempts: usize) -> Result<(), String> {
		if max_attempts == 0 {
			return Err("max_attempts must be at least 1".to_owned());
		}
		self.max_attempts = max_attempts;
		Ok(())
	}

	/// # Errors
	/// Returns an error if `ratio` is not between 0.0 and 1.0.
	pub fn set_max_overlap_ratio(&mut self, ratio: f64) -> Result<(), String> {
		if !(0.0..=1.0).contains(&ratio) {
			return Err("max_overlap_ratio must be between 0.0 and 1.0".to_owned());
		}
		self.max_overlap_ratio = ratio;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn setters_reject_zero() {
		let mut config = GenerationConfig::default();
		assert!(config.set_tries(0).is_err());
		assert!(config.set_max_steps(0).is_err());
		assert!(config.set_max_attempts(0).is_err());
		assert!(config.set_max_overlap_ratio(1.5).is_err());
		assert!(config.set_max_overlap_ratio(f64::NAN).is_err());
		assert_eq!(config, GenerationConfig::default());
	}

	#[test]
	fn setters_apply_valid_values() {
		let mut config = GenerationConfig::default();
		config.set_tries(3).unwrap();
		config.set_max_steps(20).unwrap();
		config.set_max_attempts(4).unwrap();
		assert_eq!((config.tries(), config.max_steps(), config.max_attempts()), (3, 20, 4));
	}

	#[test]
	fn overlap_limit_scales_then_caps() {
		let config = GenerationConfig::default();
		assert_eq!(config.overlap_limit(1), 1);
		assert_eq!(config.overlap_limit(10), 7);
		assert_eq!(config.overlap_limit(100), 15);
	}
}
