//! RFC 5988 `Link` header parsing for cursor pagination.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static REL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"rel="([^"]+)""#).expect("static rel regex is valid"));

/// Parses a `Link` header into a `rel -> url` map.
///
/// Entries look like `<https://host/path?page=2>; rel="next"` and are
/// separated by commas. Entries without an angle-bracketed URL or a quoted
/// `rel` are ignored. `None` or an empty header yields an empty map.
///
/// # Example
///
/// ```
/// use canvas_dl_core::parse_link_header;
///
/// let links = parse_link_header(Some(
///     r#"<https://x/?page=2>; rel="next", <https://x/?page=10>; rel="last""#,
/// ));
/// assert_eq!(links["next"], "https://x/?page=2");
/// assert_eq!(links["last"], "https://x/?page=10");
/// ```
#[must_use]
pub fn parse_link_header(header: Option<&str>) -> HashMap<String, String> {
    let mut links = HashMap::new();
    let Some(header) = header else {
        return links;
    };

    for part in header.split(',') {
        let part = part.trim();
        if part.is_empty() || !part.starts_with('<') {
            continue;
        }
        let Some(end) = part.find('>') else {
            continue;
        };
        let url = &part[1..end];
        if let Some(captures) = REL_PATTERN.captures(part) {
            links.insert(captures[1].to_string(), url.to_string());
        }
    }

    links
}
