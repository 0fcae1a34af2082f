/*!
 * Positional line markers for batch requests.
 *
 * Each input line is prefixed with `<Ln>` (1-based). Responses are parsed by
 * locating the markers, so a translation may span several lines or carry
 * extra whitespace without shifting the lines that follow it.
 */

use once_cell::sync::Lazy;
use regex::Regex;

// @const: Marker pattern, captures the 1-based line number
static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<L(\d+)>").unwrap());

/// Marker for the 1-based line `n`
pub fn marker(n: usize) -> String {
    format!("<L{}>", n)
}

/// Join `lines` into one request body, one marked line per input
pub fn build_marked_batch<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            // Embedded newlines would break the one-line-per-marker layout
            let flat = line.as_ref().replace(['\r', '\n'], " ");
            format!("{} {}", marker(i + 1), flat.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a marked response into `expected` slots.
///
/// A slot is `None` when its marker is missing or carries no text. Markers
/// outside `1..=expected` are ignored; for duplicates the last one wins, even
/// when it is empty.
pub fn parse_marked_response(response: &str, expected: usize) -> Vec<Option<String>> {
    let mut slots: Vec<Option<String>> = vec![None; expected];

    let found: Vec<(usize, usize, Option<usize>)> = MARKER_REGEX
        .captures_iter(response)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let index = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok());
            Some((whole.start(), whole.end(), index))
        })
        .collect();

    for (i, (_, content_start, index)) in found.iter().enumerate() {
        let content_end = found.get(i + 1).map(|next| next.0).unwrap_or(response.len());
        let Some(n) = index else { continue };
        if *n == 0 || *n > expected {
            continue;
        }

        let content = response[*content_start..content_end].trim();
        slots[*n - 1] = (!content.is_empty()).then(|| content.to_string());
    }

    slots
}
