//! Fold fragments that share a base URL into synthetic page records.

use crate::extract::fragment_text;
use crate::links::{self, MAX_LINKS, MAX_LINK_TOKENS};
use crate::textprep::tokenize;
use overlap_core::{Fragment, Page};
use std::collections::{BTreeSet, HashMap};

/// Characters of concatenated fragment text kept per page.
pub const PAGE_TEXT_CAP: usize = 40_000;
/// Width of the hashed bag-of-words vector.
pub const EMBEDDING_DIM: usize = 256;

fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for b in bytes {
        h ^= *b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}

/// Hashed bag-of-words over stopword-filtered tokens, L2-normalized.
///
/// Stand-in for a real embedding: anything producing a fixed-length vector can
/// replace it as long as similarity stays cosine. Text without tokens has no vector.
pub fn hashed_embedding(text: &str, dim: usize) -> Option<Vec<f32>> {
    if dim == 0 {
        return None;
    }
    let mut v = vec![0.0f32; dim];
    let mut any = false;
    for t in tokenize(text, true) {
        let idx = fnv1a32(t.as_bytes()) as usize % dim;
        v[idx] += 1.0;
        any = true;
    }
    if !any {
        return None;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    Some(v)
}

#[derive(Default)]
struct PageAcc {
    base_url: String,
    host: String,
    // (heading, votes) in first-seen order.
    headings: Vec<(String, usize)>,
    text: String,
    text_chars: usize,
    life_events: BTreeSet<String>,
    categories: BTreeSet<String>,
    links: Vec<String>,
    seen_links: BTreeSet<String>,
    fragment_count: usize,
    version: Option<String>,
}

impl PageAcc {
    fn vote(&mut self, heading: &str) {
        match self.headings.iter_mut().find(|(h, _)| h == heading) {
            Some((_, n)) => *n += 1,
            None => self.headings.push((heading.to_string(), 1)),
        }
    }

    fn push_text(&mut self, t: &str) {
        let t = t.trim();
        if t.is_empty() || self.text_chars >= PAGE_TEXT_CAP {
            return;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
            self.text_chars += 1;
        }
        let room = PAGE_TEXT_CAP.saturating_sub(self.text_chars);
        let clipped = crate::textprep::clip_chars(t, room);
        self.text.push_str(clipped);
        self.text_chars += clipped.chars().count();
    }

    /// Links resolve against the fragment's own URL, as they do for fragment features.
    fn push_links(&mut self, html: &str, fragment_url: &str) {
        let room = MAX_LINKS.saturating_sub(self.links.len());
        if room == 0 {
            return;
        }
        let found = links::extract_links(html, fragment_url, room);
        for l in found {
            if self.links.len() >= MAX_LINKS {
                break;
            }
            if self.seen_links.insert(l.clone()) {
                self.links.push(l);
            }
        }
    }

    fn title(&self) -> String {
        let mut best: Option<&(String, usize)> = None;
        for h in &self.headings {
            // Strictly greater: ties keep the heading seen first.
            if best.map_or(true, |b| h.1 > b.1) {
                best = Some(h);
            }
        }
        best.map(|(h, _)| h.clone()).unwrap_or_default()
    }

    fn finish(self) -> Page {
        let title = self.title();
        let link_tokens = links::collect_link_tokens(&self.links, MAX_LINK_TOKENS);
        let embedding = hashed_embedding(&self.text, EMBEDDING_DIM);
        Page {
            base_url: self.base_url,
            host: self.host,
            title,
            content_text: self.text,
            life_events: self.life_events.into_iter().collect(),
            categories: self.categories.into_iter().collect(),
            outbound_links: self.links,
            link_tokens,
            fragment_count: self.fragment_count,
            embedding,
            version: self.version,
        }
    }
}

/// Group fragments by base URL. Pages come out in first-seen order.
pub fn aggregate_pages(fragments: &[Fragment]) -> Vec<Page> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut accs: Vec<PageAcc> = Vec::new();

    for f in fragments {
        let base = links::base_url(&f.url);
        let i = *slots.entry(base.clone()).or_insert_with(|| {
            accs.push(PageAcc {
                host: links::host(&base),
                base_url: base.clone(),
                ..PageAcc::default()
            });
            accs.len() - 1
        });
        let acc = &mut accs[i];
        acc.fragment_count += 1;

        let heading = f
            .hierarchy_lvl0
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| f.title.trim());
        if !heading.is_empty() {
            acc.vote(heading);
        }

        acc.push_text(&fragment_text(f));
        acc.life_events.extend(f.life_events.iter().cloned());
        acc.categories.extend(f.categories.iter().cloned());
        if let Some(html) = f.content_html.as_deref() {
            acc.push_links(html, &f.url);
        }
        if f.version > acc.version {
            acc.version = f.version.clone();
        }
    }

    let pages: Vec<Page> = accs.into_iter().map(PageAcc::finish).collect();
    tracing::debug!(
        fragments = fragments.len(),
        pages = pages.len(),
        "aggregated fragments into pages"
    );
    pages
}
