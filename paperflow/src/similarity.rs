//! Token-set similarity used by the relevance filter and the overlap check.
//!
//! Scores are Jaccard overlaps of normalized token sets: word order and
//! repetition are ignored.

use std::collections::HashSet;

/// Characters removed before tokenizing.
pub const PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '"', '\'', '(', ')', '[', ']', '{', '}', '<', '>', '*', '`',
];

/// Words dropped when reducing free text to a search query.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "into",
    "is", "it", "its", "of", "on", "or", "that", "the", "their", "this", "to", "using", "via",
    "was", "we", "were", "which", "with",
];

/// Lowercases, strips [`PUNCTUATION`] and splits on whitespace.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace(PUNCTUATION, "")
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Returns the normalized token set of `text`.
#[must_use]
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Jaccard overlap of two token sets, `0.0` when both are empty.
#[must_use]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Symmetric similarity of two text blobs in `[0, 1]`.
///
/// # Examples
///
/// ```
/// use paperflow::similarity::score;
///
/// assert_eq!(score("graph neural networks", "Networks, neural graph!"), 1.0);
/// assert_eq!(score("", ""), 0.0);
/// ```
#[must_use]
pub fn score(text_a: &str, text_b: &str) -> f64 {
    jaccard(&token_set(text_a), &token_set(text_b))
}

/// Fraction of `keywords` that occur in `words`.
///
/// An empty keyword set matches everything.
#[must_use]
pub fn keyword_coverage(keywords: &HashSet<String>, words: &HashSet<String>) -> f64 {
    if keywords.is_empty() {
        return 1.0;
    }
    let matches = keywords.iter().filter(|k| words.contains(k.as_str())).count();
    matches as f64 / keywords.len() as f64
}

/// Reduces free text to at most `max_terms` distinct non-stop-word tokens.
///
/// Tokens keep their first-occurrence order.
#[must_use]
pub fn reduce_query(text: &str, max_terms: usize) -> String {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .take(max_terms)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_symmetric() {
        let pairs = [
            ("attention is all you need", "all you need is love"),
            ("graph neural networks", "convolutional networks for graphs"),
            ("", "something"),
        ];
        for (a, b) in pairs {
            assert_eq!(score(a, b), score(b, a));
        }
    }

    #[test]
    fn test_score_identity() {
        assert_eq!(score("The Transformer model.", "The Transformer model."), 1.0);
        assert_eq!(score("", ""), 0.0);
        assert_eq!(score("...", "!!!"), 0.0);
    }

    #[test]
    fn test_score_partial() {
        // {a, b, c} vs {b, c, d}: 2 shared of 4 total
        assert!((score("a b c", "b c d") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(tokenize("Hello, World! (GNNs)"), vec!["hello", "world", "gnns"]);
    }

    #[test]
    fn test_reduce_query() {
        assert_eq!(
            reduce_query("A Survey of the Attention Mechanism in the Transformer", 6),
            "survey attention mechanism transformer"
        );
        assert_eq!(reduce_query("graph graph neural networks for graphs", 2), "graph neural");
        assert_eq!(reduce_query("of the and", 6), "");
    }

    #[test]
    fn test_keyword_coverage() {
        let keywords = token_set("graph neural networks");
        assert_eq!(keyword_coverage(&keywords, &token_set("graph neural networks rock")), 1.0);
        assert_eq!(keyword_coverage(&keywords, &token_set("protein folding")), 0.0);
        assert_eq!(keyword_coverage(&HashSet::new(), &token_set("anything")), 1.0);
    }
}
