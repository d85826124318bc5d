//! Word-level Markov chain text model
//!
//! The chain is built once from a corpus and never mutated afterwards, so a
//! single instance can be shared read-only by every mining worker. Randomness
//! comes from the caller (or the thread-local RNG for `MarkovSource`).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::traits::{CandidateSource, SourceError, SourceKind};

const BEGIN: u32 = 0;
const END: u32 = 1;

/// Abbreviations whose trailing period does not end a sentence
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "st.", "jr.", "sr.", "prof.", "vs.", "etc.", "e.g.", "i.e.", "no.",
];

/// Markov model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkovConfig {
    /// Words of context per state
    pub state_size: usize,
    /// Longest sentence accepted by `MarkovSource::draw`, in characters
    pub max_chars: usize,
    /// Walks attempted per draw before giving up
    pub tries: usize,
    /// Reject sentences sharing this fraction of their words with the corpus
    pub max_overlap_ratio: f64,
    /// Upper bound on the overlap window, in words
    pub max_overlap_total: usize,
    /// Run the originality check on generated sentences
    pub test_output: bool,
}

impl Default for MarkovConfig {
    fn default() -> Self {
        Self {
            state_size: 2,
            max_chars: 64,
            tries: 10,
            max_overlap_ratio: 0.7,
            max_overlap_total: 15,
            test_output: true,
        }
    }
}

#[derive(Debug, Default)]
struct Transitions {
    words: Vec<u32>,
    cumulative: Vec<u64>,
}

impl Transitions {
    fn choose<R: Rng>(&self, rng: &mut R) -> u32 {
        let total = *self.cumulative.last().unwrap_or(&0);
        if total == 0 {
            return END;
        }
        let pick = rng.gen_range(0..total);
        let index = self.cumulative.partition_point(|&c| c <= pick);
        self.words[index]
    }
}

/// Word-level Markov chain over a sentence corpus
#[derive(Debug)]
pub struct MarkovChain {
    state_size: usize,
    vocab: Vec<String>,
    model: HashMap<Vec<u32>, Transitions>,
    rejoined_text: String,
    sentence_count: usize,
}

impl MarkovChain {
    /// Build a chain from raw corpus text
    pub fn from_text(text: &str, state_size: usize) -> Result<Self, SourceError> {
        let state_size = state_size.max(1);
        let sentences: Vec<Vec<&str>> = split_into_sentences(text)
            .into_iter()
            .filter(|words| is_acceptable(words))
            .collect();

        if sentences.is_empty() {
            return Err(SourceError::EmptyCorpus);
        }

        let mut vocab = vec!["___BEGIN__".to_string(), "___END__".to_string()];
        let mut ids: HashMap<&str, u32> = HashMap::new();
        let mut counts: HashMap<Vec<u32>, HashMap<u32, u64>> = HashMap::new();

        for words in &sentences {
            let mut items = vec![BEGIN; state_size];
            for &word in words {
                let id = *ids.entry(word).or_insert_with(|| {
                    vocab.push(word.to_string());
                    (vocab.len() - 1) as u32
                });
                items.push(id);
            }
            items.push(END);

            for window in items.windows(state_size + 1) {
                let (state, follow) = window.split_at(state_size);
                *counts
                    .entry(state.to_vec())
                    .or_default()
                    .entry(follow[0])
                    .or_insert(0) += 1;
            }
        }

        let model = counts
            .into_iter()
            .map(|(state, follows)| {
                let mut follows: Vec<(u32, u64)> = follows.into_iter().collect();
                follows.sort_unstable();
                let mut transitions = Transitions::default();
                let mut running = 0u64;
                for (word, count) in follows {
                    running += count;
                    transitions.words.push(word);
                    transitions.cumulative.push(running);
                }
                (state, transitions)
            })
            .collect();

        let rejoined_text = sentences
            .iter()
            .map(|words| words.join(" "))
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self {
            state_size,
            vocab,
            model,
            rejoined_text,
            sentence_count: sentences.len(),
        })
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    /// Sentences kept from the corpus
    pub fn sentence_count(&self) -> usize {
        self.sentence_count
    }

    /// Distinct words in the corpus
    pub fn vocabulary_size(&self) -> usize {
        self.vocab.len() - 2
    }

    /// Walk the chain from the begin state to the end token.
    ///
    /// Returns `None` if the walk exceeds `char_budget` characters.
    fn walk<R: Rng>(&self, rng: &mut R, char_budget: Option<usize>) -> Option<Vec<u32>> {
        let mut state = vec![BEGIN; self.state_size];
        let mut words = Vec::new();
        let mut chars = 0usize;

        loop {
            let next = self.model.get(&state).map_or(END, |t| t.choose(rng));
            if next == END {
                return Some(words);
            }

            chars += self.vocab[next as usize].chars().count() + usize::from(!words.is_empty());
            if char_budget.is_some_and(|budget| chars > budget) {
                return None;
            }

            words.push(next);
            state.remove(0);
            state.push(next);
        }
    }

    fn render(&self, words: &[u32]) -> String {
        words
            .iter()
            .map(|&id| self.vocab[id as usize].as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Reject sentences that copy a long stretch of the corpus verbatim
    fn is_original(&self, words: &[&str], config: &MarkovConfig) -> bool {
        let ratio_window = (config.max_overlap_ratio * words.len() as f64).round() as usize;
        let overlap_max = ratio_window.min(config.max_overlap_total);
        let window = overlap_max + 1;
        let gram_count = words.len().saturating_sub(overlap_max).max(1);

        for start in 0..gram_count {
            let end = (start + window).min(words.len());
            let gram = words[start..end].join(" ");
            if self.rejoined_text.contains(&gram) {
                return false;
            }
        }
        true
    }

    /// Generate a sentence, retrying up to `config.tries` times
    pub fn make_sentence<R: Rng>(&self, rng: &mut R, config: &MarkovConfig) -> Option<String> {
        self.generate(rng, config, None)
    }

    /// Generate a sentence of at most `max_chars` characters
    pub fn make_short_sentence<R: Rng>(
        &self,
        max_chars: usize,
        rng: &mut R,
        config: &MarkovConfig,
    ) -> Option<String> {
        self.generate(rng, config, Some(max_chars))
    }

    fn generate<R: Rng>(
        &self,
        rng: &mut R,
        config: &MarkovConfig,
        max_chars: Option<usize>,
    ) -> Option<String> {
        for _ in 0..config.tries.max(1) {
            let Some(ids) = self.walk(rng, max_chars) else {
                continue;
            };
            if ids.is_empty() {
                continue;
            }

            let sentence = self.render(&ids);
            if config.test_output {
                let words: Vec<&str> = sentence.split(' ').collect();
                if !self.is_original(&words, config) {
                    continue;
                }
            }
            return Some(sentence);
        }
        None
    }
}

/// Split corpus text into sentences of whitespace-separated words.
/// Blank lines always end a sentence.
fn split_into_sentences(text: &str) -> Vec<Vec<&str>> {
    let mut sentences = Vec::new();

    for paragraph in text.split("\n\n").flat_map(|p| p.split("\r\n\r\n")) {
        let mut current = Vec::new();
        for word in paragraph.split_whitespace() {
            current.push(word);
            if ends_sentence(word) {
                sentences.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            sentences.push(current);
        }
    }

    sentences
}

fn ends_sentence(word: &str) -> bool {
    if !word.ends_with(['.', '!', '?']) {
        return false;
    }
    let lower = word.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return false;
    }
    // Initials such as "J."
    let mut chars = word.chars();
    !matches!((chars.next(), chars.next(), chars.next()), (Some(c), Some('.'), None) if c.is_uppercase())
}

fn is_acceptable(words: &[&str]) -> bool {
    !words.is_empty()
        && words.iter().all(|w| {
            !w.contains(['"', '(', ')', '[', ']']) && !w.starts_with('\'') && !w.ends_with('\'')
        })
}

/// Candidate source backed by a Markov chain
#[derive(Debug)]
pub struct MarkovSource {
    name: String,
    chain: MarkovChain,
    config: MarkovConfig,
}

impl MarkovSource {
    pub fn new(name: impl Into<String>, chain: MarkovChain, config: MarkovConfig) -> Self {
        Self {
            name: name.into(),
            chain,
            config,
        }
    }

    /// Build from corpus text
    pub fn from_text(text: &str, config: MarkovConfig) -> Result<Self, SourceError> {
        let chain = MarkovChain::from_text(text, config.state_size)?;
        Ok(Self::new("corpus", chain, config))
    }

    /// Load and build from a corpus file
    pub fn from_path(path: impl AsRef<Path>, config: MarkovConfig) -> Result<Self, SourceError> {
        let path = path.as_ref();
        info!("Loading text data from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Building Markov model (state size {})", config.state_size);
        let chain = MarkovChain::from_text(&text, config.state_size)?;
        debug!(
            sentences = chain.sentence_count(),
            vocabulary = chain.vocabulary_size(),
            "Markov model ready"
        );
        Ok(Self::new(path.display().to_string(), chain, config))
    }

    pub fn chain(&self) -> &MarkovChain {
        &self.chain
    }

    pub fn config(&self) -> &MarkovConfig {
        &self.config
    }
}

impl CandidateSource for MarkovSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Markov
    }

    fn draw(&self) -> Result<Option<String>, SourceError> {
        let mut rng = rand::thread_rng();
        Ok(self
            .chain
            .make_short_sentence(self.config.max_chars, &mut rng, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CORPUS: &str = "The cat sat on the mat. The dog sat on the rug. \
        The cat ran to the dog. The dog ran to the mat. \
        A bird sang on the rug. The bird sat on the cat.";

    fn no_originality_check() -> MarkovConfig {
        MarkovConfig {
            test_output: false,
            ..MarkovConfig::default()
        }
    }

    #[test]
    fn test_transition_weights_beyond_u32() {
        let transitions = Transitions {
            words: vec![2, 3],
            cumulative: vec![3_000_000_000, 9_000_000_000],
        };
        let mut rng = StdRng::seed_from_u64(5);

        let picks: Vec<u32> = (0..200).map(|_| transitions.choose(&mut rng)).collect();
        assert!(picks.contains(&2));
        assert!(picks.contains(&3));
        assert!(picks.iter().all(|&w| w == 2 || w == 3));
        assert_eq!(Transitions::default().choose(&mut rng), END);
    }

    #[test]
    fn test_sentence_splitting() {
        let sentences = split_into_sentences("Dr. Smith left. He came back!\n\nNo period here\nstill same");
        assert_eq!(
            sentences,
            vec![
                vec!["Dr.", "Smith", "left."],
                vec!["He", "came", "back!"],
                vec!["No", "period", "here", "still", "same"],
            ]
        );
    }

    #[test]
    fn test_initials_do_not_end_sentences() {
        let sentences = split_into_sentences("J. R. wrote it. Done.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_quoted_sentences_are_rejected() {
        assert!(!is_acceptable(&["He", "said", "\"hi\""]));
        assert!(!is_acceptable(&["(aside)"]));
        assert!(is_acceptable(&["It's", "fine."]));
    }

    #[test]
    fn test_empty_corpus() {
        assert!(matches!(MarkovChain::from_text("", 2), Err(SourceError::EmptyCorpus)));
        assert!(matches!(
            MarkovChain::from_text("\"all\" (quoted)", 2),
            Err(SourceError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_generated_words_come_from_corpus() {
        let chain = MarkovChain::from_text(CORPUS, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let config = no_originality_check();

        for _ in 0..50 {
            let sentence = chain.make_sentence(&mut rng, &config).unwrap();
            for word in sentence.split(' ') {
                assert!(CORPUS.contains(word), "{word} not in corpus");
            }
        }
    }

    #[test]
    fn test_short_sentences_respect_limit() {
        let chain = MarkovChain::from_text(CORPUS, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let config = no_originality_check();

        for _ in 0..50 {
            if let Some(sentence) = chain.make_short_sentence(20, &mut rng, &config) {
                assert!(sentence.chars().count() <= 20, "{sentence}");
            }
        }
    }

    #[test]
    fn test_single_sentence_corpus_is_never_original() {
        let chain = MarkovChain::from_text("Only one path exists here.", 2).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        assert!(chain.make_sentence(&mut rng, &MarkovConfig::default()).is_none());
        assert_eq!(
            chain.make_sentence(&mut rng, &no_originality_check()).as_deref(),
            Some("Only one path exists here.")
        );
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let chain = MarkovChain::from_text(CORPUS, 1).unwrap();
        let config = no_originality_check();

        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            assert_eq!(chain.make_sentence(&mut a, &config), chain.make_sentence(&mut b, &config));
        }
    }

    #[test]
    fn test_source_draws_short_text() {
        let source = MarkovSource::from_text(CORPUS, no_originality_check()).unwrap();
        assert_eq!(source.kind(), SourceKind::Markov);
        assert_eq!(source.chain().state_size(), 2);
        assert_eq!(source.chain().sentence_count(), 6);

        for _ in 0..20 {
            if let Some(text) = source.draw().unwrap() {
                assert!(text.chars().count() <= 64);
            }
        }
    }
}
