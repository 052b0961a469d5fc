use std::collections::BTreeSet;

/// Outbound links kept per document.
pub const MAX_LINKS: usize = 1_000;
/// Coarse link tokens kept per document.
pub const MAX_LINK_TOKENS: usize = 1_000;

/// URL with query string and fragment identifier removed.
///
/// Unparseable input is stripped textually so grouping still works.
pub fn base_url(url: &str) -> String {
    if let Ok(mut u) = url::Url::parse(url.trim()) {
        u.set_query(None);
        u.set_fragment(None);
        return u.to_string();
    }
    let s = url.trim();
    let cut = s.find(['?', '#']).unwrap_or(s.len());
    s[..cut].to_string()
}

/// Lower-cased host, or empty when the URL has none / does not parse.
pub fn host(url: &str) -> String {
    url::Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Does `url`'s host equal `suffix` or sit under it (`www.a.gov.au` under `a.gov.au`)?
pub fn host_matches(url: &str, suffix: &str) -> bool {
    let suffix = suffix.trim().trim_start_matches('.').to_ascii_lowercase();
    if suffix.is_empty() {
        return false;
    }
    let h = host(url);
    h == suffix || h.ends_with(&format!(".{suffix}"))
}

/// Extract (deduped) absolute http(s) links from HTML.
///
/// - Resolves relative links against `base_url`.
/// - Drops fragments.
/// - Returns at most `max_links`, in document order.
///
/// An unparseable `base_url` yields no links at all: link signals for that
/// document are skipped rather than half-computed.
pub fn extract_links(html: &str, base_url: &str, max_links: usize) -> Vec<String> {
    let max_links = max_links.min(MAX_LINKS);
    if max_links == 0 || html.trim().is_empty() {
        return Vec::new();
    }
    let Ok(base) = url::Url::parse(base_url.trim()) else {
        tracing::debug!(base_url, "skipping link extraction: unparseable base url");
        return Vec::new();
    };

    let doc = html_scraper::Html::parse_fragment(html);
    let sel = match html_scraper::Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut seen = BTreeSet::<String>::new();
    let mut out = Vec::new();
    for el in doc.select(&sel) {
        if out.len() >= max_links {
            break;
        }
        let href = match el.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let mut u = match base.join(href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        if !matches!(u.scheme(), "http" | "https") {
            continue;
        }
        u.set_fragment(None);
        let s = u.to_string();
        if seen.insert(s.clone()) {
            out.push(s);
        }
    }
    out
}

/// Two coarse tokens per link: the target host, and host + first path segment.
pub fn link_tokens(link: &str) -> Vec<String> {
    let Ok(u) = url::Url::parse(link) else {
        return Vec::new();
    };
    let Some(h) = u.host_str() else {
        return Vec::new();
    };
    let h = h.to_ascii_lowercase();
    let mut out = vec![h.clone()];
    if let Some(seg) = u
        .path_segments()
        .and_then(|mut s| s.find(|seg| !seg.is_empty()))
    {
        out.push(format!("{h}/{}", seg.to_ascii_lowercase()));
    }
    out
}

/// Distinct coarse tokens over a link list, first-seen order, capped.
pub fn collect_link_tokens<'a>(
    links: impl IntoIterator<Item = &'a String>,
    max_tokens: usize,
) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for l in links {
        for t in link_tokens(l) {
            if out.len() >= max_tokens {
                return out;
            }
            if seen.insert(t.clone()) {
                out.push(t);
            }
        }
    }
    out
}
