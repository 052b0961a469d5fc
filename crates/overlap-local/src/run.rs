//! End-to-end runs: load, partition by site, sweep off the async runtime, report.

use crate::engine::{self, SweepOutcome};
use crate::features::DocFeatures;
use crate::links::host_matches;
use crate::loader::{self, snapshot_digest, Loaded};
use crate::pages::aggregate_pages;
use crate::render::{Counts, Report, ReportKind, Snapshot, SCHEMA_VERSION};
use crate::rollup::{page_totals, rollup_pages, MAX_PAGE_GROUPS};
use overlap_core::{Aggregate, DocumentStore, Error, Fragment, Level, OverlapParams, Page, Result};

pub const WARN_PAGES_DERIVED: &str = "page_collection_empty_derived_from_fragments";
pub const WARN_SKIPPED_UNDECODABLE: &str = "skipped_undecodable_documents";
pub const WARN_EMPTY_SITE_A: &str = "site_a_matched_no_documents";
pub const WARN_EMPTY_SITE_B: &str = "site_b_matched_no_documents";

pub const DEFAULT_MAX_DOCS: usize = 50_000;

/// Where the corpora live.
#[derive(Debug, Clone)]
pub struct Sources {
    /// Fragment collection holding site A (and site B unless `fragments_b` is set).
    pub fragments: String,
    /// Separate fragment collection for site B.
    pub fragments_b: Option<String>,
    /// Precomputed page collection, if any.
    pub pages: Option<String>,
    /// Per-collection load cap.
    pub max_docs: usize,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            fragments: "fragments".to_string(),
            fragments_b: None,
            pages: None,
            max_docs: DEFAULT_MAX_DOCS,
        }
    }
}

fn require(loaded: Loaded<Fragment>, collection: &str) -> Result<Loaded<Fragment>> {
    if loaded.missing {
        return Err(Error::Upstream(format!(
            "fragment collection {collection} not found"
        )));
    }
    Ok(loaded)
}

fn on_site<T: Clone>(docs: &[T], url: impl Fn(&T) -> &str, site: &str) -> Vec<T> {
    docs.iter().filter(|d| host_matches(url(d), site)).cloned().collect()
}

/// Fragments for both sides plus the number of undecodable documents skipped.
async fn load_fragment_sides(
    store: &dyn DocumentStore,
    params: &OverlapParams,
    sources: &Sources,
) -> Result<(Vec<Fragment>, Vec<Fragment>, usize)> {
    match sources
        .fragments_b
        .as_deref()
        .filter(|b| *b != sources.fragments)
    {
        Some(coll_b) => {
            let (la, lb) = futures_util::future::try_join(
                loader::load_fragments(store, &sources.fragments, sources.max_docs),
                loader::load_fragments(store, coll_b, sources.max_docs),
            )
            .await?;
            let la = require(la, &sources.fragments)?;
            let lb = require(lb, coll_b)?;
            let a = on_site(&la.docs, |f| f.url.as_str(), &params.site_a);
            let b = on_site(&lb.docs, |f| f.url.as_str(), &params.site_b);
            Ok((a, b, la.skipped + lb.skipped))
        }
        None => {
            let l = require(
                loader::load_fragments(store, &sources.fragments, sources.max_docs).await?,
                &sources.fragments,
            )?;
            let a = on_site(&l.docs, |f| f.url.as_str(), &params.site_a);
            let b = on_site(&l.docs, |f| f.url.as_str(), &params.site_b);
            Ok((a, b, l.skipped))
        }
    }
}

fn side_warnings(warnings: &mut Vec<&'static str>, a: usize, b: usize, skipped: usize) {
    if skipped > 0 {
        warnings.push(WARN_SKIPPED_UNDECODABLE);
    }
    if a == 0 {
        warnings.push(WARN_EMPTY_SITE_A);
    }
    if b == 0 {
        warnings.push(WARN_EMPTY_SITE_B);
    }
}

async fn off_runtime<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Analysis(e.to_string()))
}

/// Fragment-level comparison of `site_a` against `site_b`.
pub async fn fragment_overlap(
    store: &dyn DocumentStore,
    params: OverlapParams,
    sources: &Sources,
) -> Result<Report> {
    let params = params.clamped();
    let (frags_a, frags_b, skipped) = load_fragment_sides(store, &params, sources).await?;
    tracing::info!(
        site_a = %params.site_a,
        site_b = %params.site_b,
        fragments_a = frags_a.len(),
        fragments_b = frags_b.len(),
        "loaded fragment corpora"
    );

    let mut warnings = Vec::new();
    side_warnings(&mut warnings, frags_a.len(), frags_b.len(), skipped);
    let snapshot = Snapshot {
        a: snapshot_digest(frags_a.iter().map(|f| (f.id.as_str(), f.version.as_deref()))),
        b: snapshot_digest(frags_b.iter().map(|f| (f.id.as_str(), f.version.as_deref()))),
    };

    let p = params.clone();
    let (counts, pairs, pages) = off_runtime(move || {
        let fa: Vec<DocFeatures> = frags_a.iter().map(DocFeatures::from_fragment).collect();
        let fb: Vec<DocFeatures> = frags_b.iter().map(DocFeatures::from_fragment).collect();
        match p.aggregate {
            Aggregate::Flat => {
                let SweepOutcome { pairs, stats } = engine::sweep(&fa, &fb, &p, Level::Fragment);
                (Counts::from_stats(&stats, pairs.len()), Some(pairs), None)
            }
            Aggregate::Page => {
                let SweepOutcome { pairs, stats } =
                    engine::sweep_matched(&fa, &fb, &p, Level::Fragment);
                let pages = rollup_pages(
                    &pairs,
                    &page_totals(&frags_a),
                    &page_totals(&frags_b),
                    MAX_PAGE_GROUPS,
                );
                (Counts::from_stats(&stats, pages.len()), None, Some(pages))
            }
        }
    })
    .await?;

    Ok(Report {
        schema_version: SCHEMA_VERSION,
        kind: ReportKind::FragmentOverlap,
        params,
        counts,
        snapshot,
        warnings,
        pairs,
        pages,
    })
}

/// Page-level comparison. Reads precomputed pages when `sources.pages` names a
/// populated collection, otherwise folds fragments into pages first.
pub async fn page_overlap(
    store: &dyn DocumentStore,
    params: OverlapParams,
    sources: &Sources,
) -> Result<Report> {
    let params = params.clamped();
    let mut warnings = Vec::new();

    let stored: Option<Loaded<Page>> = match sources.pages.as_deref() {
        Some(c) => Some(loader::load_pages(store, c, sources.max_docs).await?),
        None => None,
    };

    let (pages_a, pages_b, skipped) = match stored {
        Some(l) if !l.docs.is_empty() => {
            let a = on_site(&l.docs, |p| p.base_url.as_str(), &params.site_a);
            let b = on_site(&l.docs, |p| p.base_url.as_str(), &params.site_b);
            (a, b, l.skipped)
        }
        stored => {
            warnings.push(WARN_PAGES_DERIVED);
            let page_skipped = stored.map_or(0, |l| l.skipped);
            let (fa, fb, skipped) = load_fragment_sides(store, &params, sources).await?;
            let (pa, pb) = off_runtime(move || (aggregate_pages(&fa), aggregate_pages(&fb))).await?;
            (pa, pb, skipped + page_skipped)
        }
    };
    tracing::info!(
        site_a = %params.site_a,
        site_b = %params.site_b,
        pages_a = pages_a.len(),
        pages_b = pages_b.len(),
        derived = warnings.contains(&WARN_PAGES_DERIVED),
        "loaded page corpora"
    );

    side_warnings(&mut warnings, pages_a.len(), pages_b.len(), skipped);
    let snapshot = Snapshot {
        a: snapshot_digest(pages_a.iter().map(|p| (p.base_url.as_str(), p.version.as_deref()))),
        b: snapshot_digest(pages_b.iter().map(|p| (p.base_url.as_str(), p.version.as_deref()))),
    };

    let p = params.clone();
    let SweepOutcome { pairs, stats } = off_runtime(move || {
        let fa: Vec<DocFeatures> = pages_a.iter().map(DocFeatures::from_page).collect();
        let fb: Vec<DocFeatures> = pages_b.iter().map(DocFeatures::from_page).collect();
        engine::sweep(&fa, &fb, &p, Level::Page)
    })
    .await?;

    Ok(Report {
        schema_version: SCHEMA_VERSION,
        kind: ReportKind::PageOverlap,
        params,
        counts: Counts::from_stats(&stats, pairs.len()),
        snapshot,
        warnings,
        pairs: Some(pairs),
        pages: None,
    })
}
