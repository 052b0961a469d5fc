//! Collections served from local export files instead of a live search service.

use overlap_core::{DocumentStore, Error, HitPage, PageQuery, Result};
use std::collections::HashMap;
use std::path::Path;

/// Parse a dump: a JSON array of documents, or one JSON document per line.
///
/// Search-service exports sometimes wrap each document as `{"document": {...}}`;
/// those are unwrapped.
pub fn parse_dump(text: &str) -> Result<Vec<serde_json::Value>> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<serde_json::Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| Error::Decode(format!("json array: {e}")))?
    } else {
        let mut out = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str(line)
                .map_err(|e| Error::Decode(format!("line {}: {e}", i + 1)))?;
            out.push(v);
        }
        out
    };
    Ok(raw.into_iter().map(unwrap_document).collect())
}

fn unwrap_document(v: serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(mut m) if m.len() == 1 && m.contains_key("document") => {
            m.remove("document").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

fn project(v: &serde_json::Value, fields: &[String]) -> serde_json::Value {
    match v {
        serde_json::Value::Object(m) if !fields.is_empty() => serde_json::Value::Object(
            m.iter()
                .filter(|(k, _)| fields.iter().any(|f| f == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileStore {
    collections: HashMap<String, Vec<serde_json::Value>>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: &str, docs: Vec<serde_json::Value>) -> Self {
        self.collections.insert(name.to_string(), docs);
        self
    }

    pub fn with_file(self, name: &str, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Upstream(format!("{}: {e}", path.display())))?;
        let docs = parse_dump(&text).map_err(|e| match e {
            Error::Decode(m) => Error::Decode(format!("{}: {m}", path.display())),
            other => other,
        })?;
        tracing::debug!(collection = name, path = %path.display(), docs = docs.len(), "registered dump file");
        Ok(self.with_collection(name, docs))
    }
}

#[async_trait::async_trait]
impl DocumentStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn query_page(&self, q: &PageQuery) -> Result<Option<HitPage>> {
        let Some(docs) = self.collections.get(&q.collection) else {
            return Ok(None);
        };
        let per_page = q.per_page.max(1);
        let start = q.page.max(1).saturating_sub(1).saturating_mul(per_page);
        let documents = docs
            .iter()
            .skip(start)
            .take(per_page)
            .map(|d| project(d, &q.fields))
            .collect();
        Ok(Some(HitPage {
            documents,
            found: docs.len() as u64,
            page: q.page,
        }))
    }
}
