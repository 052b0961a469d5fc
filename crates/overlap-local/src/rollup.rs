//! Roll fragment pairs up to page pairs, with per-side coverage.

use crate::compare::round3;
use crate::engine::ScoredPair;
use crate::links::base_url;
use overlap_core::Fragment;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Most page pairs a rollup returns.
pub const MAX_PAGE_GROUPS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOverlap {
    pub page_a: String,
    pub page_b: String,
    pub match_count: usize,
    pub sum_score: f64,
    pub max_score: f64,
    pub avg_score: f64,
    pub matched_a: usize,
    pub matched_b: usize,
    pub total_a: usize,
    pub total_b: usize,
    pub coverage_a: f64,
    pub coverage_b: f64,
    pub coverage: f64,
    pub rank_score: f64,
    pub a_ids: Vec<String>,
    pub b_ids: Vec<String>,
}

/// Fragment count per base URL.
pub fn page_totals<'a, I>(fragments: I) -> HashMap<String, usize>
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut out: HashMap<String, usize> = HashMap::new();
    for f in fragments {
        *out.entry(base_url(&f.url)).or_default() += 1;
    }
    out
}

#[derive(Default)]
struct Group {
    page_a: String,
    page_b: String,
    count: usize,
    sum: f64,
    max: f64,
    a_ids: BTreeSet<String>,
    b_ids: BTreeSet<String>,
}

fn coverage(matched: usize, total: Option<usize>) -> (usize, f64) {
    // Unknown (or zero) totals fall back to the matched count.
    let total = match total {
        Some(t) if t > 0 => t,
        _ => matched,
    };
    if total == 0 {
        return (0, 0.0);
    }
    (total, (matched as f64 / total as f64).min(1.0))
}

/// Group pairs by `(base_url(a), base_url(b))` and rank groups by
/// `coverage × avg_score`, descending, ties in first-seen order.
pub fn rollup_pages(
    pairs: &[ScoredPair],
    totals_a: &HashMap<String, usize>,
    totals_b: &HashMap<String, usize>,
    limit: usize,
) -> Vec<PageOverlap> {
    let mut slots: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for p in pairs {
        let key = (base_url(&p.a_url), base_url(&p.b_url));
        let i = match slots.get(&key) {
            Some(i) => *i,
            None => {
                groups.push(Group {
                    page_a: key.0.clone(),
                    page_b: key.1.clone(),
                    ..Group::default()
                });
                slots.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        let g = &mut groups[i];
        g.count += 1;
        g.sum += p.score;
        g.max = g.max.max(p.score);
        g.a_ids.insert(p.a_id.clone());
        g.b_ids.insert(p.b_id.clone());
    }

    let mut out: Vec<PageOverlap> = groups
        .into_iter()
        .map(|g| {
            let (total_a, coverage_a) = coverage(g.a_ids.len(), totals_a.get(&g.page_a).copied());
            let (total_b, coverage_b) = coverage(g.b_ids.len(), totals_b.get(&g.page_b).copied());
            let cov = (coverage_a + coverage_b) / 2.0;
            let avg = if g.count == 0 { 0.0 } else { g.sum / g.count as f64 };
            PageOverlap {
                page_a: g.page_a,
                page_b: g.page_b,
                match_count: g.count,
                sum_score: round3(g.sum),
                max_score: round3(g.max),
                avg_score: round3(avg),
                matched_a: g.a_ids.len(),
                matched_b: g.b_ids.len(),
                total_a,
                total_b,
                coverage_a: round3(coverage_a),
                coverage_b: round3(coverage_b),
                coverage: round3(cov),
                rank_score: round3(cov * avg),
                a_ids: g.a_ids.into_iter().collect(),
                b_ids: g.b_ids.into_iter().collect(),
            }
        })
        .collect();

    out.sort_by(|x, y| {
        y.rank_score
            .partial_cmp(&x.rank_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out.truncate(limit);
    tracing::debug!(pairs = pairs.len(), groups = out.len(), "rolled pairs up to pages");
    out
}
