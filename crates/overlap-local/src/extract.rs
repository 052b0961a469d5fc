use overlap_core::Fragment;
use std::borrow::Cow;
use std::io::Cursor;

/// Wide enough that html2text never re-wraps a paragraph mid-sentence.
const TEXT_WIDTH: usize = 10_000;

/// HTML to plain text. Markup html2text cannot handle yields an empty string.
pub fn html_to_text(html: &str) -> String {
    // html2text expects bytes; Cursor avoids allocating a second large buffer.
    html2text::from_read(Cursor::new(html.as_bytes()), TEXT_WIDTH).unwrap_or_default()
}

/// The text a fragment contributes to matching.
///
/// Prefers the crawler's `content_text`; falls back to rendering `content_html`.
pub fn fragment_text(f: &Fragment) -> Cow<'_, str> {
    if f.content_text.chars().any(|c| !c.is_whitespace()) {
        return Cow::Borrowed(f.content_text.as_str());
    }
    match f.content_html.as_deref() {
        Some(html) if !html.trim().is_empty() => Cow::Owned(html_to_text(html)),
        _ => Cow::Borrowed(""),
    }
}
