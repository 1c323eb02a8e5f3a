//! Tag derivation: a term-frequency pass over title + description. Tags
//! are extracted once at create/update time and stored on the skill; they
//! are never re-derived on read.

use std::collections::HashMap;

const MAX_TAGS: usize = 8;
const MIN_TOKEN_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "about", "after", "all", "also", "and", "any", "are", "been", "but",
    "can", "could", "for", "from", "get", "had", "has", "have", "her",
    "his", "how", "into", "its", "just", "like", "more", "most", "not",
    "one", "other", "our", "out", "over", "she", "some", "than", "that",
    "the", "their", "them", "then", "there", "they", "this", "very",
    "was", "were", "what", "when", "where", "which", "while", "who",
    "will", "with", "would", "you", "your",
];

/// Extract up to MAX_TAGS tags, most frequent first; ties resolve to the
/// term seen first. Deterministic so the matcher tests can rely on it.
pub fn extract_tags(title: &str, description: &str) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new(); // term -> (count, first_seen)
    let mut position = 0usize;

    for source in [title, description] {
        for token in source.split(|c: char| !c.is_alphanumeric()) {
            let token = token.to_lowercase();
            if token.len() < MIN_TOKEN_LEN || token.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if STOPWORDS.binary_search(&token.as_str()).is_ok() {
                continue;
            }
            let entry = counts.entry(token).or_insert((0, position));
            entry.0 += 1;
            position += 1;
        }
    }

    let mut terms: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    terms.sort_by(|(_, (count_a, seen_a)), (_, (count_b, seen_b))| {
        count_b.cmp(count_a).then(seen_a.cmp(seen_b))
    });
    terms.into_iter().take(MAX_TAGS).map(|(t, _)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_are_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn frequency_wins_then_first_seen() {
        let tags = extract_tags(
            "Sourdough baking",
            "Baking bread at home. Sourdough starters, bread shaping, bread scoring.",
        );
        // "bread" appears three times, "sourdough" and "baking" twice each
        // with "sourdough" seen first.
        assert_eq!(tags[0], "bread");
        assert_eq!(tags[1], "sourdough");
        assert_eq!(tags[2], "baking");
    }

    #[test]
    fn stopwords_and_short_tokens_dropped() {
        let tags = extract_tags("How to be a DJ", "You will learn the art of the mix");
        assert!(!tags.contains(&"the".to_string()));
        assert!(!tags.contains(&"dj".to_string())); // under the length floor
        assert!(tags.contains(&"learn".to_string()));
    }

    #[test]
    fn caps_at_eight_tags() {
        let description = "alpha bravo charlie delta echo foxtrot golf hotel india juliett kilo";
        let tags = extract_tags("phonetic alphabet practice", description);
        assert_eq!(tags.len(), 8);
    }

    #[test]
    fn empty_input_gives_no_tags() {
        assert!(extract_tags("", "").is_empty());
    }
}
