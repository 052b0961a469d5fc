use serde::{Deserialize, Deserializer, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("store unavailable: {0}")]
    Upstream(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("analysis failed: {0}")]
    Analysis(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Treat an explicit JSON `null` the same as a missing field.
///
/// Search-service documents routinely carry `null` for optional string/array
/// fields; we never want a single null to make a whole document undecodable.
pub fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Smallest addressable crawled unit: a heading plus the content block under it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Fragment {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_text: String,
    #[serde(default)]
    pub content_html: Option<String>,
    /// Top-level heading of the page the fragment was cut from.
    #[serde(default)]
    pub hierarchy_lvl0: Option<String>,
    #[serde(default)]
    pub component_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub life_events: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub governance: Option<String>,
    /// Crawl version stamp, maintained by the crawler.
    #[serde(default)]
    pub version: Option<String>,
}

/// All fragments sharing one base URL, folded into a single record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Page {
    #[serde(alias = "url")]
    pub base_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub life_events: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outbound_links: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link_tokens: Vec<String>,
    #[serde(default)]
    pub fragment_count: usize,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Which signal (or fusion of signals) decides whether a pair overlaps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Title,
    Content,
    Link,
    Embedding,
    Tags,
    Combined,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Title => "title",
            Metric::Content => "content",
            Metric::Link => "link",
            Metric::Embedding => "embedding",
            Metric::Tags => "tags",
            Metric::Combined => "combined",
        }
    }
}

/// Granularity of the documents being compared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Fragment,
    Page,
}

/// Shape of a fragment-level report.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    #[default]
    Flat,
    Page,
}

/// Hard ceiling on pairs any run may return.
pub const MAX_PAIRS_CEILING: usize = 50_000;
pub const DEFAULT_FRAGMENT_THRESHOLD: f64 = 0.55;
pub const DEFAULT_PAGE_THRESHOLD: f64 = 0.4;

/// Caller knobs for one comparison run. Echoed verbatim (after clamping) in reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlapParams {
    /// Hostname suffix selecting corpus A.
    pub site_a: String,
    /// Hostname suffix selecting corpus B.
    pub site_b: String,
    pub threshold: f64,
    pub max_pairs: usize,
    pub metric: Metric,
    pub ignore_generic: bool,
    #[serde(default)]
    pub aggregate: Aggregate,
}

impl OverlapParams {
    /// Out-of-range values are pulled into range, never rejected.
    pub fn clamped(mut self) -> Self {
        self.threshold = if self.threshold.is_nan() {
            0.0
        } else {
            self.threshold.clamp(0.0, 1.0)
        };
        self.max_pairs = self.max_pairs.clamp(1, MAX_PAIRS_CEILING);
        self.site_a = self.site_a.trim().to_ascii_lowercase();
        self.site_b = self.site_b.trim().to_ascii_lowercase();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageQuery {
    pub collection: String,
    /// Field projection; empty means "all fields".
    pub fields: Vec<String>,
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitPage {
    pub documents: Vec<serde_json::Value>,
    /// Total matching documents as reported by the store.
    pub found: u64,
    pub page: usize,
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch one page of a match-all query.
    ///
    /// `Ok(None)` means the collection does not exist; callers decide whether
    /// that is fatal.
    async fn query_page(&self, q: &PageQuery) -> Result<Option<HitPage>>;
}
