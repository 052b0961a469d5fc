use overlap_core::{DocumentStore, Error, HitPage, PageQuery, Result};
use serde::Deserialize;
use std::time::Duration;

fn env_nonempty(k: &str) -> Option<String> {
    std::env::var(k)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn typesense_url_from_env() -> Option<String> {
    env_nonempty("OVERLAP_TYPESENSE_URL")
}

pub fn typesense_api_key_from_env() -> Option<String> {
    env_nonempty("OVERLAP_TYPESENSE_API_KEY")
}

fn query_by_from_env() -> String {
    env_nonempty("OVERLAP_TYPESENSE_QUERY_BY").unwrap_or_else(|| "title".to_string())
}

/// Search-service backed store. Every request is a match-all (`q=*`) query.
#[derive(Debug, Clone)]
pub struct TypesenseStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    query_by: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
    #[serde(default)]
    found: u64,
    #[serde(default)]
    page: usize,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    document: serde_json::Value,
}

impl TypesenseStore {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&endpoint).map_err(|e| Error::InvalidUrl(format!("{endpoint}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!("{endpoint}: expected http or https")));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("overlap-local/", env!("CARGO_PKG_VERSION")))
            // Avoid "hang forever" on DNS/TLS/body stalls.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            query_by: "title".to_string(),
        })
    }

    pub fn with_query_by(mut self, query_by: &str) -> Self {
        self.query_by = query_by.to_string();
        self
    }

    pub fn from_env() -> Result<Self> {
        let endpoint = typesense_url_from_env()
            .ok_or_else(|| Error::NotConfigured("missing OVERLAP_TYPESENSE_URL".to_string()))?;
        let api_key = typesense_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured("missing OVERLAP_TYPESENSE_API_KEY".to_string())
        })?;
        Ok(Self::new(&endpoint, &api_key)?.with_query_by(&query_by_from_env()))
    }

    /// Collection names are percent-encoded as one path segment.
    fn search_url(&self, collection: &str) -> Result<url::Url> {
        let mut u = url::Url::parse(&self.endpoint)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.endpoint)))?;
        u.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("{}: cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(["collections", collection, "documents", "search"]);
        Ok(u)
    }
}

#[async_trait::async_trait]
impl DocumentStore for TypesenseStore {
    fn name(&self) -> &'static str {
        "typesense"
    }

    async fn query_page(&self, q: &PageQuery) -> Result<Option<HitPage>> {
        let mut req = self
            .client
            .get(self.search_url(&q.collection)?)
            .header("X-TYPESENSE-API-KEY", &self.api_key)
            .query(&[
                ("q", "*".to_string()),
                ("query_by", self.query_by.clone()),
                ("page", q.page.max(1).to_string()),
                ("per_page", q.per_page.clamp(1, 250).to_string()),
            ]);
        if !q.fields.is_empty() {
            req = req.query(&[("include_fields", q.fields.join(","))]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "typesense HTTP {status} for collection {}",
                q.collection
            )));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Decode(e.to_string()))?;
        Ok(Some(HitPage {
            documents: parsed.hits.into_iter().map(|h| h.document).collect(),
            found: parsed.found,
            page: parsed.page,
        }))
    }
}
