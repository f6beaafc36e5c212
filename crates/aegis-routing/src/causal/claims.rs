//! Claim extraction and lexical support scoring.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Content words a sentence needs before it counts as a claim.
const MIN_CLAIM_WORDS: usize = 3;

static SENTENCE_BREAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n+").ok());
static WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").ok());

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "may", "more", "most", "my",
    "no", "not", "of", "on", "or", "our", "she", "should", "so", "some", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "to", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "why", "will", "with", "would", "you",
    "your",
];

const CAUSAL_CONNECTIVES: &[&str] = &[
    "because",
    "therefore",
    "thus",
    "hence",
    "consequently",
    "as a result",
    "due to",
    "leads to",
    "led to",
    "caused",
    "causes",
    "results in",
    "resulted in",
    "so that",
];

/// A sentence of a response that asserts something checkable.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// Sentence text, trimmed
    pub text: String,
    /// Whether the sentence asserts a cause and effect
    pub causal: bool,
    /// Share of its content words found in the prompt or context
    pub coverage: f64,
}

/// Lowercase content words of `text`.
pub fn content_words(text: &str) -> Vec<String> {
    let Some(word) = WORD.as_ref() else {
        return Vec::new();
    };
    word.find_iter(text)
        .map(|found| found.as_str().to_lowercase())
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .collect()
}

/// Vocabulary of the prompt and context that claims are checked against.
pub fn source_vocabulary(prompt: &str, context: Option<&str>) -> HashSet<String> {
    let mut vocabulary: HashSet<String> = content_words(prompt).into_iter().collect();
    if let Some(context) = context {
        vocabulary.extend(content_words(context));
    }
    vocabulary
}

/// Whether `sentence` contains a causal connective.
pub fn is_causal(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    CAUSAL_CONNECTIVES
        .iter()
        .any(|connective| lower.contains(connective))
}

/// Splits `response` into at most `max_claims` claims scored against `vocabulary`.
pub fn extract_claims(response: &str, vocabulary: &HashSet<String>, max_claims: usize) -> Vec<Claim> {
    let sentences: Vec<&str> = SENTENCE_BREAK.as_ref().map_or_else(
        || vec![response],
        |pattern| pattern.split(response).collect(),
    );

    sentences
        .into_iter()
        .map(str::trim)
        .filter_map(|sentence| {
            let words = content_words(sentence);
            if words.len() < MIN_CLAIM_WORDS {
                return None;
            }
            let supported = words.iter().filter(|word| vocabulary.contains(*word)).count();
            Some(Claim {
                text: sentence.to_owned(),
                causal: is_causal(sentence),
                coverage: supported as f64 / words.len() as f64,
            })
        })
        .take(max_claims)
        .collect()
}
