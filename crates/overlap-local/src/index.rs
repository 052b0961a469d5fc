//! Inverted indices used to block candidate pairs.
//!
//! Only documents sharing at least one indexed key with the source document are
//! ever scored. Two similar documents with no shared indexed token are missed;
//! that is the price of not comparing every pair.

use crate::features::DocFeatures;
use std::collections::{BTreeSet, HashMap};

/// Source-side content tokens used for retrieval.
pub const RETRIEVAL_CONTENT_TOKENS: usize = 30;

#[derive(Debug, Default)]
pub struct CandidateIndex {
    by_title: HashMap<String, Vec<usize>>,
    by_content: HashMap<String, Vec<usize>>,
    by_link: HashMap<String, Vec<usize>>,
    by_signature: HashMap<String, Vec<usize>>,
    docs: usize,
}

fn post(map: &mut HashMap<String, Vec<usize>>, key: &str, pos: usize) {
    let list = map.entry(key.to_string()).or_default();
    // Keys are unique per document, but guard against a caller feeding duplicates.
    if list.last() != Some(&pos) {
        list.push(pos);
    }
}

impl CandidateIndex {
    pub fn build(docs: &[DocFeatures]) -> Self {
        let mut idx = Self {
            docs: docs.len(),
            ..Self::default()
        };
        for (pos, d) in docs.iter().enumerate() {
            for t in &d.title_tokens {
                post(&mut idx.by_title, t, pos);
            }
            for t in &d.index_tokens {
                post(&mut idx.by_content, t, pos);
            }
            for t in &d.link_tokens {
                post(&mut idx.by_link, t, pos);
            }
            if !d.signature.is_empty() {
                post(&mut idx.by_signature, &d.signature, pos);
            }
        }
        tracing::debug!(
            docs = idx.docs,
            title_keys = idx.by_title.len(),
            content_keys = idx.by_content.len(),
            link_keys = idx.by_link.len(),
            signature_keys = idx.by_signature.len(),
            "built candidate index"
        );
        idx
    }

    pub fn len(&self) -> usize {
        self.docs
    }

    pub fn is_empty(&self) -> bool {
        self.docs == 0
    }

    /// Positions of indexed documents plausibly matching `doc`, ascending.
    ///
    /// `with_links` also admits documents sharing a coarse link token.
    pub fn candidates(&self, doc: &DocFeatures, with_links: bool) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        let mut take = |map: &HashMap<String, Vec<usize>>, key: &str| {
            if let Some(list) = map.get(key) {
                out.extend(list.iter().copied());
            }
        };
        if !doc.signature.is_empty() {
            take(&self.by_signature, doc.signature.as_str());
        }
        for t in &doc.title_tokens {
            take(&self.by_title, t.as_str());
        }
        for t in doc.index_tokens.iter().take(RETRIEVAL_CONTENT_TOKENS) {
            take(&self.by_content, t.as_str());
        }
        if with_links {
            for t in &doc.link_tokens {
                take(&self.by_link, t.as_str());
            }
        }
        out
    }
}
