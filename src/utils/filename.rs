//! Filename helpers for delivered documents.

use std::path::Path;

/// Base name used when classification yields nothing usable.
pub const FALLBACK_TITLE: &str = "Untitled";

/// Longest sanitized title in bytes. Leaves room for `_N.pdf` under the
/// usual 255-byte file name limit.
pub const MAX_TITLE_BYTES: usize = 200;

/// Map an arbitrary classification string to a safe path component.
///
/// Every character that is not a letter, digit, space, underscore or hyphen
/// is replaced with `_`. Letters and digits from any script are kept, so
/// `Agentur für Arbeit` survives unchanged. Results longer than
/// [`MAX_TITLE_BYTES`] are cut on a char boundary. The mapping is total and
/// idempotent.
pub fn sanitize_title(raw: &str) -> String {
    let mut safe: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe.len() > MAX_TITLE_BYTES {
        let mut end = MAX_TITLE_BYTES;
        while !safe.is_char_boundary(end) {
            end -= 1;
        }
        safe.truncate(end);
        safe.truncate(safe.trim_end().len());
    }
    safe
}

/// Whether a path names a PDF (case-insensitive `.pdf` suffix).
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
