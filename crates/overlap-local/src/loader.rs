//! Paged corpus loading from any [`DocumentStore`].

use overlap_core::{DocumentStore, Fragment, Page, PageQuery, Result};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

/// Hits requested per page.
pub const PAGE_SIZE: usize = 250;
/// Hard ceiling on documents loaded from one collection.
pub const MAX_DOCS_CEILING: usize = 200_000;

/// Projection used for fragment collections.
pub const FRAGMENT_FIELDS: &[&str] = &[
    "id",
    "url",
    "anchor",
    "title",
    "content_text",
    "content_html",
    "hierarchy_lvl0",
    "component_type",
    "life_events",
    "categories",
    "provider",
    "governance",
    "version",
];

/// Projection used for precomputed page collections.
pub const PAGE_FIELDS: &[&str] = &[
    "base_url",
    "url",
    "host",
    "title",
    "content_text",
    "life_events",
    "categories",
    "outbound_links",
    "link_tokens",
    "fragment_count",
    "embedding",
    "version",
];

#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub docs: Vec<T>,
    /// The store reported the collection as nonexistent.
    pub missing: bool,
    /// Documents that came back but could not be decoded.
    pub skipped: usize,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self {
            docs: Vec::new(),
            missing: false,
            skipped: 0,
        }
    }
}

/// Pull raw documents page by page until a short page, the reported total,
/// or `cap` is reached. `Ok(None)` when the collection does not exist.
pub async fn load_raw(
    store: &dyn DocumentStore,
    collection: &str,
    fields: &[&str],
    cap: usize,
) -> Result<Option<Vec<serde_json::Value>>> {
    let cap = cap.clamp(1, MAX_DOCS_CEILING);
    let per_page = PAGE_SIZE.min(cap);
    let mut out: Vec<serde_json::Value> = Vec::new();
    let mut page = 1usize;
    let mut pages = 0usize;

    loop {
        let q = PageQuery {
            collection: collection.to_string(),
            fields: fields.iter().map(|s| s.to_string()).collect(),
            page,
            per_page,
        };
        let Some(hits) = store.query_page(&q).await? else {
            if page == 1 {
                tracing::info!(store = store.name(), collection, "collection not found");
                return Ok(None);
            }
            // Vanished mid-scan; keep what we have.
            break;
        };
        pages += 1;
        let got = hits.documents.len();
        let room = cap - out.len();
        out.extend(hits.documents.into_iter().take(room));

        if got < per_page || out.len() >= cap || out.len() as u64 >= hits.found {
            break;
        }
        page += 1;
    }

    tracing::info!(
        store = store.name(),
        collection,
        pages,
        docs = out.len(),
        "loaded collection"
    );
    Ok(Some(out))
}

/// Typed load; undecodable documents are skipped and counted.
pub async fn load_collection<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    fields: &[&str],
    cap: usize,
) -> Result<Loaded<T>> {
    let Some(raw) = load_raw(store, collection, fields, cap).await? else {
        return Ok(Loaded {
            missing: true,
            ..Loaded::default()
        });
    };
    let mut docs = Vec::with_capacity(raw.len());
    let mut skipped = 0usize;
    for v in raw {
        match serde_json::from_value::<T>(v) {
            Ok(d) => docs.push(d),
            Err(e) => {
                skipped += 1;
                tracing::warn!(collection, error = %e, "skipping undecodable document");
            }
        }
    }
    Ok(Loaded {
        docs,
        missing: false,
        skipped,
    })
}

pub async fn load_fragments(
    store: &dyn DocumentStore,
    collection: &str,
    cap: usize,
) -> Result<Loaded<Fragment>> {
    load_collection(store, collection, FRAGMENT_FIELDS, cap).await
}

pub async fn load_pages(
    store: &dyn DocumentStore,
    collection: &str,
    cap: usize,
) -> Result<Loaded<Page>> {
    load_collection(store, collection, PAGE_FIELDS, cap).await
}

/// SHA-256 over sorted `id@version` lines. Changes whenever any document is
/// added, removed, or re-crawled.
pub fn snapshot_digest<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut keys: Vec<String> = items
        .into_iter()
        .map(|(id, v)| format!("{id}@{}", v.unwrap_or("")))
        .collect();
    keys.sort();
    let mut h = Sha256::new();
    for k in &keys {
        h.update(k.as_bytes());
        h.update(b"\n");
    }
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlap_core::HitPage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory store that records how many pages were requested.
    struct CountingStore {
        docs: Option<Vec<serde_json::Value>>,
        found_override: Option<u64>,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn with(n: usize) -> Self {
            let docs = (0..n)
                .map(|i| serde_json::json!({"id": format!("f{i}"), "url": "https://a.gov.au/x"}))
                .collect();
            Self {
                docs: Some(docs),
                found_override: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl DocumentStore for CountingStore {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn query_page(&self, q: &PageQuery) -> Result<Option<HitPage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Some(docs) = &self.docs else {
                return Ok(None);
            };
            let start = (q.page - 1) * q.per_page;
            let documents = docs.iter().skip(start).take(q.per_page).cloned().collect();
            Ok(Some(HitPage {
                documents,
                found: self.found_override.unwrap_or(docs.len() as u64),
                page: q.page,
            }))
        }
    }

    #[tokio::test]
    async fn stops_on_short_page() {
        let s = CountingStore::with(600);
        let got = load_raw(&s, "frags", FRAGMENT_FIELDS, 10_000).await.unwrap().unwrap();
        assert_eq!(got.len(), 600);
        assert_eq!(s.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_when_found_is_exhausted() {
        let s = CountingStore::with(500);
        let got = load_raw(&s, "frags", FRAGMENT_FIELDS, 10_000).await.unwrap().unwrap();
        assert_eq!(got.len(), 500);
        // Two full pages and `found` says we are done: no third request.
        assert_eq!(s.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stops_at_cap() {
        let s = CountingStore::with(1000);
        let got = load_raw(&s, "frags", FRAGMENT_FIELDS, 300).await.unwrap().unwrap();
        assert_eq!(got.len(), 300);
        assert_eq!(s.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_collection_is_not_an_error() {
        let s = CountingStore {
            docs: None,
            found_override: None,
            calls: AtomicUsize::new(0),
        };
        let got: Loaded<Page> = load_collection(&s, "pages", PAGE_FIELDS, 100).await.unwrap();
        assert!(got.missing);
        assert!(got.docs.is_empty());
    }

    #[tokio::test]
    async fn undecodable_documents_are_skipped() {
        let mut s = CountingStore::with(2);
        if let Some(d) = s.docs.as_mut() {
            d.push(serde_json::json!({"id": 7}));
        }
        let got = load_fragments(&s, "frags", 100).await.unwrap();
        assert_eq!(got.docs.len(), 2);
        assert_eq!(got.skipped, 1);
    }

    #[test]
    fn digest_is_order_independent_and_version_sensitive() {
        let a = snapshot_digest([("f1", Some("v1")), ("f2", None)]);
        let b = snapshot_digest([("f2", None), ("f1", Some("v1"))]);
        let c = snapshot_digest([("f1", Some("v2")), ("f2", None)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
