//! Minimal, deterministic text normalization helpers.
//!
//! Everything here is matching-only: output is never shown to a reader, so the
//! normalization is deliberately lossy (ASCII lowercase, punctuation as separator).

use std::collections::BTreeSet;

/// Characters of body text considered when building content token sets.
pub const CONTENT_CHAR_BUDGET: usize = 4_000;
/// Content tokens shorter than this never reach the inverted index.
pub const MIN_INDEX_TOKEN_LEN: usize = 4;
/// Distinct content tokens indexed per document.
pub const MAX_INDEX_TOKENS: usize = 50;
/// Title tokens considered for the title signature.
const SIGNATURE_POOL: usize = 12;
/// Tokens joined into the title signature.
const SIGNATURE_LEN: usize = 5;

pub const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "but", "by", "can", "do", "does", "for", "from", "has", "have", "how", "if", "in",
    "into", "is", "it", "its", "may", "more", "must", "no", "not", "of", "on", "or", "our",
    "out", "so", "than", "that", "the", "their", "them", "then", "there", "these", "they",
    "this", "to", "up", "was", "we", "what", "when", "which", "who", "will", "with", "you",
    "your",
];

/// Titles that say nothing about the content under them.
pub const GENERIC_TITLES: &[&str] = &[
    "overview",
    "introduction",
    "summary",
    "contact us",
    "contact",
    "about us",
    "about",
    "more information",
    "further information",
    "related links",
    "related information",
    "on this page",
    "in this section",
    "next steps",
    "get help",
    "need help",
    "help",
    "home",
    "faq",
    "faqs",
    "frequently asked questions",
    "resources",
    "see also",
];

/// Short words that make a two-word title generic when nothing else is present.
const GENERIC_WORDS: &[&str] = &[
    "overview", "intro", "introduction", "summary", "contact", "us", "help", "home", "info",
    "information", "details", "links", "related", "resources", "page", "section", "faq",
    "faqs", "see", "back", "top", "menu", "more", "next", "steps",
];

fn is_stopword(t: &str) -> bool {
    STOPWORDS.binary_search(&t).is_ok()
}

/// Lower-case, collapse every non-`[a-z0-9]` run to one space, trim.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for ch in s.chars() {
        let c = ch.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Space-split normalized text, optionally dropping stopwords. Order is kept.
pub fn tokenize(s: &str, drop_stopwords: bool) -> Vec<String> {
    normalize(s)
        .split(' ')
        .filter(|t| !t.is_empty())
        .filter(|t| !drop_stopwords || !is_stopword(t))
        .map(str::to_string)
        .collect()
}

pub fn token_set(s: &str, drop_stopwords: bool) -> BTreeSet<String> {
    tokenize(s, drop_stopwords).into_iter().collect()
}

/// First `max_chars` characters of `s` (char boundary safe).
pub fn clip_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Content tokens eligible for the inverted index: long enough, distinct,
/// first-seen order, at most `MAX_INDEX_TOKENS`.
pub fn index_tokens(content: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for t in tokenize(clip_chars(content, CONTENT_CHAR_BUDGET), true) {
        if out.len() >= MAX_INDEX_TOKENS {
            break;
        }
        if t.len() < MIN_INDEX_TOKEN_LEN {
            continue;
        }
        if seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}

/// Near-exact blocking key for titles.
///
/// Reordered titles ("Pension Age Overview" vs "Age Pension Overview") share a
/// signature; an empty title has none.
pub fn title_signature(title: &str) -> String {
    let mut pool: Vec<String> = tokenize(title, true)
        .into_iter()
        .take(SIGNATURE_POOL)
        .collect();
    pool.sort();
    pool.dedup();
    pool.truncate(SIGNATURE_LEN);
    pool.join(" ")
}

pub fn is_generic_title(title: &str) -> bool {
    let n = normalize(title);
    if n.is_empty() || GENERIC_TITLES.contains(&n.as_str()) {
        return true;
    }
    let toks: Vec<&str> = n.split(' ').collect();
    toks.len() <= 2
        && toks
            .iter()
            .all(|t| is_stopword(t) || GENERIC_WORDS.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_are_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn normalize_collapses_punctuation_runs() {
        assert_eq!(normalize("  Age-Pension: Who's   eligible?? "), "age pension who s eligible");
        assert_eq!(normalize("Crème brûlée"), "cr me br l e");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn tokenize_drops_stopwords_only_when_asked() {
        assert_eq!(tokenize("The Age of Pension", true), vec!["age", "pension"]);
        assert_eq!(
            tokenize("The Age of Pension", false),
            vec!["the", "age", "of", "pension"]
        );
    }

    #[test]
    fn non_empty_text_yields_non_empty_tokens() {
        assert!(!token_set("Carer Payment", true).is_empty());
        assert!(token_set("", true).is_empty());
    }

    #[test]
    fn index_tokens_are_long_distinct_and_capped() {
        let body = (0..200).map(|i| format!("word{i} ab")).collect::<Vec<_>>().join(" ");
        let toks = index_tokens(&body);
        assert_eq!(toks.len(), MAX_INDEX_TOKENS);
        assert!(toks.iter().all(|t| t.len() >= MIN_INDEX_TOKEN_LEN));
        assert_eq!(toks[0], "word0");

        assert_eq!(index_tokens("leave leave leave cat"), vec!["leave"]);
    }

    #[test]
    fn clip_chars_respects_char_boundaries() {
        assert_eq!(clip_chars("héllo", 2), "hé");
        assert_eq!(clip_chars("hi", 10), "hi");
    }

    #[test]
    fn signature_is_order_insensitive() {
        assert_eq!(
            title_signature("Age Pension Overview"),
            title_signature("Overview: Pension, Age")
        );
        assert_eq!(title_signature("The"), "");
        assert_eq!(
            title_signature("zeta eta theta iota kappa alpha beta"),
            "alpha beta eta iota kappa"
        );
    }

    #[test]
    fn generic_titles() {
        assert!(is_generic_title("Overview"));
        assert!(is_generic_title("  Contact us "));
        assert!(is_generic_title(""));
        assert!(is_generic_title("More info"));
        assert!(!is_generic_title("Paid Parental Leave Overview"));
        assert!(!is_generic_title("Age Pension"));
    }
}
