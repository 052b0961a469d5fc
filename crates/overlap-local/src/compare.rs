//! Per-pair similarity signals and their fusion into one score.

use overlap_core::{Level, Metric};
use serde::Serialize;
use std::collections::BTreeSet;

/// Jaccard index. Two empty sets are identical (1.0); one empty set shares nothing (0.0).
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f64;
    let uni = (a.len() + b.len()) as f64 - inter;
    if uni == 0.0 {
        0.0
    } else {
        inter / uni
    }
}

/// Cosine similarity of two fixed-length vectors, clamped to `[0, 1]`.
///
/// Absent, mismatched, or all-zero vectors score 0.
pub fn cosine(a: Option<&[f32]>, b: Option<&[f32]>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 1.0)
}

pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Independent per-pair scores, before fusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Signals {
    pub title: f64,
    pub content: f64,
    pub link: f64,
    pub tags: f64,
    pub embedding: f64,
}

impl Signals {
    pub fn rounded(self) -> Self {
        Self {
            title: round3(self.title),
            content: round3(self.content),
            link: round3(self.link),
            tags: round3(self.tags),
            embedding: round3(self.embedding),
        }
    }
}

/// Fixed fusion weights for `Metric::Combined`. Hand-tuned; not learned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub title: f64,
    pub content: f64,
    pub link: f64,
    pub tags: f64,
    pub embedding: f64,
}

pub const FRAGMENT_WEIGHTS: Weights = Weights {
    title: 0.4,
    content: 0.5,
    link: 0.1,
    tags: 0.0,
    embedding: 0.0,
};

pub const PAGE_WEIGHTS: Weights = Weights {
    title: 0.0,
    content: 0.0,
    link: 0.2,
    tags: 0.5,
    embedding: 0.3,
};

pub fn weights_for(level: Level) -> Weights {
    match level {
        Level::Fragment => FRAGMENT_WEIGHTS,
        Level::Page => PAGE_WEIGHTS,
    }
}

/// Collapse signals into the score the threshold is applied to (rounded to 3 decimals).
pub fn fuse(metric: Metric, level: Level, s: &Signals) -> f64 {
    let raw = match metric {
        Metric::Title => s.title,
        Metric::Content => s.content,
        Metric::Link => s.link,
        Metric::Tags => s.tags,
        Metric::Embedding => s.embedding,
        Metric::Combined => {
            let w = weights_for(level);
            w.title * s.title
                + w.content * s.content
                + w.link * s.link
                + w.tags * s.tags
                + w.embedding * s.embedding
        }
    };
    round3(raw)
}
