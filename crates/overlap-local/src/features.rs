//! Per-document token sets and vectors, computed once per run.

use crate::extract::fragment_text;
use crate::links::{self, MAX_LINKS, MAX_LINK_TOKENS};
use crate::pages::{hashed_embedding, EMBEDDING_DIM};
use crate::textprep::{self, CONTENT_CHAR_BUDGET};
use overlap_core::{Fragment, Page};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct DocFeatures {
    pub id: String,
    pub url: String,
    pub title: String,
    pub title_tokens: BTreeSet<String>,
    pub signature: String,
    pub content_tokens: BTreeSet<String>,
    /// Long content tokens, first-seen order; what the inverted index sees.
    pub index_tokens: Vec<String>,
    pub link_tokens: BTreeSet<String>,
    pub life_events: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    /// Life events and categories in one set, namespaced so the two families never collide.
    pub tags: BTreeSet<String>,
    pub embedding: Option<Vec<f32>>,
}

/// Stopword-filtered tokens; text made only of stopwords keeps all its tokens
/// so it never looks empty.
fn signal_tokens(text: &str) -> BTreeSet<String> {
    let filtered = textprep::token_set(text, true);
    if filtered.is_empty() {
        textprep::token_set(text, false)
    } else {
        filtered
    }
}

fn namespaced_tags(life_events: &BTreeSet<String>, categories: &BTreeSet<String>) -> BTreeSet<String> {
    life_events
        .iter()
        .map(|t| format!("life_event:{}", t.trim().to_ascii_lowercase()))
        .chain(
            categories
                .iter()
                .map(|t| format!("category:{}", t.trim().to_ascii_lowercase())),
        )
        .collect()
}

impl DocFeatures {
    fn from_parts(id: &str, url: &str, title: &str, text: &str) -> Self {
        let clipped = textprep::clip_chars(text, CONTENT_CHAR_BUDGET);
        Self {
            id: id.to_string(),
            url: url.to_string(),
            title: title.trim().to_string(),
            title_tokens: signal_tokens(title),
            signature: textprep::title_signature(title),
            content_tokens: signal_tokens(clipped),
            index_tokens: textprep::index_tokens(clipped),
            ..Self::default()
        }
    }

    pub fn from_fragment(f: &Fragment) -> Self {
        let text = fragment_text(f);
        let mut d = Self::from_parts(&f.id, &f.url, &f.title, &text);
        if let Some(html) = f.content_html.as_deref() {
            let found = links::extract_links(html, &f.url, MAX_LINKS);
            d.link_tokens = links::collect_link_tokens(&found, MAX_LINK_TOKENS)
                .into_iter()
                .collect();
        }
        d.life_events = f.life_events.iter().cloned().collect();
        d.categories = f.categories.iter().cloned().collect();
        d.tags = namespaced_tags(&d.life_events, &d.categories);
        d
    }

    pub fn from_page(p: &Page) -> Self {
        let mut d = Self::from_parts(&p.base_url, &p.base_url, &p.title, &p.content_text);
        d.link_tokens = if p.link_tokens.is_empty() {
            links::collect_link_tokens(&p.outbound_links, MAX_LINK_TOKENS)
                .into_iter()
                .collect()
        } else {
            p.link_tokens
                .iter()
                .take(MAX_LINK_TOKENS)
                .map(|t| t.to_ascii_lowercase())
                .collect()
        };
        d.life_events = p.life_events.iter().cloned().collect();
        d.categories = p.categories.iter().cloned().collect();
        d.tags = namespaced_tags(&d.life_events, &d.categories);
        // Precomputed page records may lack a vector; derive the same stand-in.
        d.embedding = match &p.embedding {
            Some(v) if !v.is_empty() => Some(v.clone()),
            _ => hashed_embedding(&p.content_text, EMBEDDING_DIM),
        };
        d
    }
}
