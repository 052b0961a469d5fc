//! Report envelope and its JSON / CSV renderings.

use crate::engine::{ScoredPair, SweepStats};
use crate::rollup::PageOverlap;
use overlap_core::{Error, OverlapParams, Result};
use serde::Serialize;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    FragmentOverlap,
    PageOverlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Counts {
    pub docs_a: usize,
    pub docs_b: usize,
    pub excluded_generic: usize,
    pub candidate_pairs: usize,
    pub matched_pairs: usize,
    pub returned: usize,
}

impl Counts {
    pub fn from_stats(s: &SweepStats, returned: usize) -> Self {
        Self {
            docs_a: s.docs_a,
            docs_b: s.docs_b,
            excluded_generic: s.excluded_generic,
            candidate_pairs: s.candidate_pairs,
            matched_pairs: s.matched_pairs,
            returned,
        }
    }
}

/// Digests of the two corpora a report was computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u32,
    pub kind: ReportKind,
    pub params: OverlapParams,
    pub counts: Counts,
    pub snapshot: Snapshot,
    pub warnings: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<Vec<ScoredPair>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageOverlap>>,
}

pub const PAIR_COLUMNS: &[&str] = &[
    "a_id",
    "a_url",
    "a_title",
    "b_id",
    "b_url",
    "b_title",
    "title_sim",
    "content_sim",
    "link_sim",
    "tags_sim",
    "embedding_sim",
    "score",
    "shared_life_events",
    "shared_categories",
];

pub const PAGE_COLUMNS: &[&str] = &[
    "page_a",
    "page_b",
    "match_count",
    "sum_score",
    "max_score",
    "avg_score",
    "matched_a",
    "matched_b",
    "total_a",
    "total_b",
    "coverage_a",
    "coverage_b",
    "coverage",
    "rank_score",
    "a_ids",
    "b_ids",
];

pub fn to_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(|e| Error::Render(e.to_string()))
}

fn csv_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

/// Page aggregates when present, otherwise pairs. Multi-valued cells are `|`-joined.
pub fn to_csv(report: &Report) -> Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    if let Some(pages) = &report.pages {
        w.write_record(PAGE_COLUMNS).map_err(csv_err)?;
        for p in pages {
            w.write_record([
                p.page_a.clone(),
                p.page_b.clone(),
                p.match_count.to_string(),
                p.sum_score.to_string(),
                p.max_score.to_string(),
                p.avg_score.to_string(),
                p.matched_a.to_string(),
                p.matched_b.to_string(),
                p.total_a.to_string(),
                p.total_b.to_string(),
                p.coverage_a.to_string(),
                p.coverage_b.to_string(),
                p.coverage.to_string(),
                p.rank_score.to_string(),
                p.a_ids.join("|"),
                p.b_ids.join("|"),
            ])
            .map_err(csv_err)?;
        }
    } else {
        w.write_record(PAIR_COLUMNS).map_err(csv_err)?;
        for p in report.pairs.iter().flatten() {
            w.write_record([
                p.a_id.clone(),
                p.a_url.clone(),
                p.a_title.clone(),
                p.b_id.clone(),
                p.b_url.clone(),
                p.b_title.clone(),
                p.title_sim.to_string(),
                p.content_sim.to_string(),
                p.link_sim.to_string(),
                p.tags_sim.to_string(),
                p.embedding_sim.to_string(),
                p.score.to_string(),
                p.shared_life_events.join("|"),
                p.shared_categories.join("|"),
            ])
            .map_err(csv_err)?;
        }
    }
    let bytes = w.into_inner().map_err(csv_err)?;
    String::from_utf8(bytes).map_err(csv_err)
}

pub fn render(report: &Report, format: Format) -> Result<String> {
    match format {
        Format::Json => to_json(report),
        Format::Csv => to_csv(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlap_core::{Aggregate, Metric};

    fn report() -> Report {
        Report {
            schema_version: SCHEMA_VERSION,
            kind: ReportKind::FragmentOverlap,
            params: OverlapParams {
                site_a: "a.gov.au".into(),
                site_b: "b.gov.au".into(),
                threshold: 0.55,
                max_pairs: 10,
                metric: Metric::Combined,
                ignore_generic: true,
                aggregate: Aggregate::Flat,
            },
            counts: Counts::default(),
            snapshot: Snapshot::default(),
            warnings: vec![],
            pairs: Some(vec![ScoredPair {
                a_id: "a1".into(),
                a_url: "https://a.gov.au/x".into(),
                a_title: "Carer, Payment".into(),
                b_id: "b1".into(),
                b_url: "https://b.gov.au/y".into(),
                b_title: "Carer Payment".into(),
                title_sim: 1.0,
                content_sim: 0.25,
                link_sim: 0.0,
                tags_sim: 0.5,
                embedding_sim: 0.0,
                score: 0.525,
                shared_life_events: vec!["caring".into(), "retiring".into()],
                shared_categories: vec![],
            }]),
            pages: None,
        }
    }

    #[test]
    fn json_envelope_shape() {
        let v: serde_json::Value = serde_json::from_str(&to_json(&report()).unwrap()).unwrap();
        assert_eq!(v["schema_version"], 1);
        assert_eq!(v["kind"], "fragment_overlap");
        assert_eq!(v["params"]["metric"], "combined");
        assert_eq!(v["pairs"][0]["score"], 0.525);
        assert!(v.get("pages").is_none());
    }

    #[test]
    fn csv_has_fixed_header_and_quotes_commas() {
        let out = to_csv(&report()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some(PAIR_COLUMNS.join(",").as_str()));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Carer, Payment\""), "{row}");
        assert!(row.ends_with(",caring|retiring,"), "{row}");
    }

    #[test]
    fn csv_switches_to_page_columns() {
        let mut r = report();
        r.pages = Some(vec![]);
        let out = to_csv(&r).unwrap();
        assert_eq!(out.trim_end(), PAGE_COLUMNS.join(","));
    }
}
