//! Blocked pairwise sweep: index corpus B, retrieve candidates for each
//! document of corpus A, score, keep what clears the threshold, rank.

use crate::compare::{self, Signals};
use crate::features::DocFeatures;
use crate::index::CandidateIndex;
use crate::textprep::is_generic_title;
use overlap_core::{Level, Metric, OverlapParams};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPair {
    pub a_id: String,
    pub a_url: String,
    pub a_title: String,
    pub b_id: String,
    pub b_url: String,
    pub b_title: String,
    pub title_sim: f64,
    pub content_sim: f64,
    pub link_sim: f64,
    pub tags_sim: f64,
    pub embedding_sim: f64,
    pub score: f64,
    pub shared_life_events: Vec<String>,
    pub shared_categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepStats {
    pub docs_a: usize,
    pub docs_b: usize,
    /// Documents dropped (both sides) because their title is generic.
    pub excluded_generic: usize,
    /// Distinct pairs scored.
    pub candidate_pairs: usize,
    /// Pairs at or above the threshold, before truncation.
    pub matched_pairs: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub pairs: Vec<ScoredPair>,
    pub stats: SweepStats,
}

/// Every signal for one pair, each rounded to 3 decimals.
pub fn signals(a: &DocFeatures, b: &DocFeatures) -> Signals {
    Signals {
        title: compare::jaccard(&a.title_tokens, &b.title_tokens),
        content: compare::jaccard(&a.content_tokens, &b.content_tokens),
        link: compare::jaccard(&a.link_tokens, &b.link_tokens),
        tags: compare::jaccard(&a.tags, &b.tags),
        embedding: compare::cosine(a.embedding.as_deref(), b.embedding.as_deref()),
    }
    .rounded()
}

fn shared(a: &std::collections::BTreeSet<String>, b: &std::collections::BTreeSet<String>) -> Vec<String> {
    a.intersection(b).cloned().collect()
}

pub fn score_pair(a: &DocFeatures, b: &DocFeatures, metric: Metric, level: Level) -> ScoredPair {
    let s = signals(a, b);
    ScoredPair {
        a_id: a.id.clone(),
        a_url: a.url.clone(),
        a_title: a.title.clone(),
        b_id: b.id.clone(),
        b_url: b.url.clone(),
        b_title: b.title.clone(),
        title_sim: s.title,
        content_sim: s.content,
        link_sim: s.link,
        tags_sim: s.tags,
        embedding_sim: s.embedding,
        score: compare::fuse(metric, level, &s),
        shared_life_events: shared(&a.life_events, &b.life_events),
        shared_categories: shared(&a.categories, &b.categories),
    }
}

/// Keep pairs scoring at least `threshold`, sort by score descending
/// (stable: equal scores keep discovery order), truncate to `max_pairs`.
pub fn rank(mut pairs: Vec<ScoredPair>, threshold: f64, max_pairs: usize) -> (Vec<ScoredPair>, usize) {
    pairs.retain(|p| p.score >= threshold);
    let matched = pairs.len();
    pairs.sort_by(|x, y| {
        y.score
            .partial_cmp(&x.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs.truncate(max_pairs);
    (pairs, matched)
}

/// Compare corpus `a` against corpus `b`, keeping every pair that clears the
/// threshold, ranked but not truncated.
pub fn sweep_matched(
    a: &[DocFeatures],
    b: &[DocFeatures],
    params: &OverlapParams,
    level: Level,
) -> SweepOutcome {
    let excluded = |d: &DocFeatures| params.ignore_generic && is_generic_title(&d.title);
    let b_excluded: Vec<bool> = b.iter().map(excluded).collect();
    let a_excluded = a.iter().filter(|d| excluded(*d)).count();
    let b_excluded_count = b_excluded.iter().filter(|x| **x).count();

    let index = CandidateIndex::build(b);
    let with_links = params.metric == Metric::Link;

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut scored: Vec<ScoredPair> = Vec::new();
    for da in a.iter().filter(|d| !excluded(*d)) {
        for pos in index.candidates(da, with_links) {
            if b_excluded[pos] {
                continue;
            }
            let db = &b[pos];
            if da.id == db.id {
                continue;
            }
            if !seen.insert((da.id.clone(), db.id.clone())) {
                continue;
            }
            scored.push(score_pair(da, db, params.metric, level));
        }
    }

    let candidate_pairs = scored.len();
    let (pairs, matched_pairs) = rank(scored, params.threshold, usize::MAX);
    let stats = SweepStats {
        docs_a: a.len() - a_excluded,
        docs_b: b.len() - b_excluded_count,
        excluded_generic: a_excluded + b_excluded_count,
        candidate_pairs,
        matched_pairs,
    };
    SweepOutcome { pairs, stats }
}

/// [`sweep_matched`], truncated to `params.max_pairs`.
///
/// `params` should already be clamped; the sweep finishes before anything is
/// sorted or truncated.
pub fn sweep(a: &[DocFeatures], b: &[DocFeatures], params: &OverlapParams, level: Level) -> SweepOutcome {
    let mut out = sweep_matched(a, b, params, level);
    out.pairs.truncate(params.max_pairs);
    tracing::info!(
        docs_a = out.stats.docs_a,
        docs_b = out.stats.docs_b,
        candidate_pairs = out.stats.candidate_pairs,
        matched_pairs = out.stats.matched_pairs,
        returned = out.pairs.len(),
        metric = params.metric.as_str(),
        "overlap sweep finished"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlap_core::{Aggregate, Fragment};
    use proptest::prelude::*;

    fn frag(id: &str, title: &str, body: &str) -> DocFeatures {
        DocFeatures::from_fragment(&Fragment {
            id: id.to_string(),
            url: format!("https://x.gov.au/{id}"),
            title: title.to_string(),
            content_text: body.to_string(),
            ..Fragment::default()
        })
    }

    fn params(metric: Metric, threshold: f64) -> OverlapParams {
        OverlapParams {
            site_a: "a.gov.au".into(),
            site_b: "b.gov.au".into(),
            threshold,
            max_pairs: 100,
            metric,
            ignore_generic: false,
            aggregate: Aggregate::Flat,
        }
    }

    #[test]
    fn same_title_disjoint_bodies() {
        let a = frag("a1", "Age Pension Overview", "rates thresholds income assets");
        let b = frag("b1", "Age Pension Overview", "dental vouchers orthodontic clinics");
        let p = score_pair(&a, &b, Metric::Title, Level::Fragment);
        assert_eq!(p.title_sim, 1.0);
        assert_eq!(p.score, 1.0);
        let p = score_pair(&a, &b, Metric::Content, Level::Fragment);
        assert_eq!(p.content_sim, 0.0);
        assert_eq!(p.score, 0.0);
    }

    #[test]
    fn empty_title_against_non_empty_is_zero() {
        let a = frag("a1", "", "body");
        let b = frag("b1", "Age Pension", "body");
        assert_eq!(score_pair(&a, &b, Metric::Title, Level::Fragment).title_sim, 0.0);
        let c = frag("c1", "", "other");
        assert_eq!(score_pair(&a, &c, Metric::Title, Level::Fragment).title_sim, 1.0);
    }

    #[test]
    fn stopword_only_title_is_not_an_empty_title() {
        let a = frag("a1", "What is it?", "body");
        let b = frag("b1", "", "body");
        assert_eq!(score_pair(&a, &b, Metric::Title, Level::Fragment).title_sim, 0.0);

        let a = vec![frag("a1", "What to do", "alpha")];
        let b = vec![frag("b1", "Who can", "bravo")];
        let out = sweep(&a, &b, &params(Metric::Title, 0.9), Level::Fragment);
        assert!(out.pairs.is_empty(), "{:?}", out.pairs);
    }

    #[test]
    fn combined_with_only_title_match_equals_title_weight() {
        let mut a = frag("a1", "Age Pension", "alpha bravo charlie");
        let mut b = frag("b1", "Age Pension", "delta echo foxtrot");
        a.link_tokens = ["a.gov.au".to_string()].into();
        b.link_tokens = ["b.gov.au".to_string()].into();
        let p = score_pair(&a, &b, Metric::Combined, Level::Fragment);
        assert_eq!((p.title_sim, p.content_sim, p.link_sim), (1.0, 0.0, 0.0));
        assert_eq!(p.score, 0.4);
    }

    #[test]
    fn generic_titles_are_excluded_on_request() {
        let a = vec![
            frag("a1", "Overview", "paid parental leave employer"),
            frag("a2", "Paid Parental Leave Overview", "paid parental leave employer"),
        ];
        let b = vec![frag("b1", "Paid Parental Leave Overview", "paid parental leave employer")];

        let mut p = params(Metric::Combined, 0.0);
        let out = sweep(&a, &b, &p, Level::Fragment);
        assert_eq!(out.pairs.len(), 2);

        p.ignore_generic = true;
        let out = sweep(&a, &b, &p, Level::Fragment);
        assert_eq!(out.stats.excluded_generic, 1);
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].a_id, "a2");
    }

    #[test]
    fn duplicate_ids_are_scored_once_and_self_pairs_skipped() {
        let a = vec![frag("x", "Age Pension", ""), frag("a1", "Age Pension", ""), frag("a1", "Age Pension", "")];
        let b = vec![frag("x", "Age Pension", ""), frag("b1", "Age Pension", "")];
        let out = sweep(&a, &b, &params(Metric::Title, 0.0), Level::Fragment);
        let ids: Vec<(&str, &str)> = out
            .pairs
            .iter()
            .map(|p| (p.a_id.as_str(), p.b_id.as_str()))
            .collect();
        assert_eq!(ids, vec![("x", "b1"), ("a1", "x"), ("a1", "b1")]);
        assert_eq!(out.stats.candidate_pairs, 3);
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let mk = |id: &str, score: f64| ScoredPair {
            a_id: id.to_string(),
            a_url: String::new(),
            a_title: String::new(),
            b_id: String::new(),
            b_url: String::new(),
            b_title: String::new(),
            title_sim: 0.0,
            content_sim: 0.0,
            link_sim: 0.0,
            tags_sim: 0.0,
            embedding_sim: 0.0,
            score,
            shared_life_events: vec![],
            shared_categories: vec![],
        };
        let pairs = vec![mk("p1", 0.5), mk("p2", 0.9), mk("p3", 0.5), mk("p4", 0.1)];
        let (out, matched) = rank(pairs, 0.5, 10);
        assert_eq!(matched, 3);
        let ids: Vec<&str> = out.iter().map(|p| p.a_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1", "p3"]);
    }

    fn corpus() -> impl Strategy<Value = Vec<(String, String)>> {
        let words = prop::sample::select(vec![
            "pension", "carer", "payment", "leave", "parental", "dental", "rates", "claim",
        ]);
        prop::collection::vec(
            (
                prop::collection::vec(words.clone(), 0..4).prop_map(|w| w.join(" ")),
                prop::collection::vec(words, 0..8).prop_map(|w| w.join(" ")),
            ),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn returned_pairs_respect_threshold_cap_and_order(
            a in corpus(),
            b in corpus(),
            threshold in 0.0f64..=1.0,
            max_pairs in 1usize..20,
        ) {
            let da: Vec<DocFeatures> = a.iter().enumerate()
                .map(|(i, (t, c))| frag(&format!("a{i}"), t, c)).collect();
            let db: Vec<DocFeatures> = b.iter().enumerate()
                .map(|(i, (t, c))| frag(&format!("b{i}"), t, c)).collect();
            let mut p = params(Metric::Combined, threshold);
            p.max_pairs = max_pairs;
            let p = p.clamped();

            let out = sweep(&da, &db, &p, Level::Fragment);
            prop_assert_eq!(out.pairs.len(), out.stats.matched_pairs.min(max_pairs));
            prop_assert!(out.stats.matched_pairs <= out.stats.candidate_pairs);
            for w in out.pairs.windows(2) {
                prop_assert!(w[0].score >= w[1].score);
            }
            for pr in &out.pairs {
                prop_assert!(pr.score >= p.threshold);
            }

            // Every candidate that was dropped really scored below the threshold.
            let kept: HashSet<(String, String)> = out.pairs.iter()
                .map(|pr| (pr.a_id.clone(), pr.b_id.clone())).collect();
            if out.stats.matched_pairs <= max_pairs {
                let index = CandidateIndex::build(&db);
                for x in &da {
                    for pos in index.candidates(x, false) {
                        let pr = score_pair(x, &db[pos], Metric::Combined, Level::Fragment);
                        if !kept.contains(&(pr.a_id.clone(), pr.b_id.clone())) {
                            prop_assert!(pr.score < p.threshold);
                        }
                    }
                }
            }
        }
    }
}
