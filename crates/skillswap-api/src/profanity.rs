//! Local profanity check. A small static dictionary matched against
//! lowercased alphanumeric tokens, run on every message send before
//! anything touches the database.

const BLOCKLIST: &[&str] = &[
    "arsehole", "asshole", "bastard", "bitch", "bollocks", "bullshit",
    "cock", "cunt", "dickhead", "dumbass", "fuck", "fucker", "fucking",
    "motherfucker", "nigger", "prick", "pussy", "shit", "shite", "slut",
    "twat", "wanker", "whore",
];

/// True when any token of the text is on the blocklist.
pub fn contains_profanity(text: &str) -> bool {
    tokens(text).any(|tok| BLOCKLIST.binary_search(&tok.as_str()).is_ok())
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_is_sorted_for_binary_search() {
        let mut sorted = BLOCKLIST.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, BLOCKLIST);
    }

    #[test]
    fn flags_profane_text() {
        assert!(contains_profanity("well FUCK that"));
        assert!(contains_profanity("you utter wanker."));
    }

    #[test]
    fn clean_text_passes() {
        assert!(!contains_profanity("I can teach you sourdough baking"));
        assert!(!contains_profanity(""));
    }

    #[test]
    fn no_substring_false_positives() {
        // "class", "Scunthorpe" and friends contain blocked substrings but
        // are not themselves blocked tokens.
        assert!(!contains_profanity("my class is in Scunthorpe"));
        assert!(!contains_profanity("canal boat hitchhiking"));
    }
}
