//! Catalog identifier normalization.
//!
//! Works, authors, and institutions arrive from user input in several shapes:
//! bare keys (`W2741809807`), absolute catalog URLs
//! (`https://openalex.org/W2741809807`), and DOIs in raw or URL form. This
//! module canonicalizes everything to the bare-key [`CatalogId`] used across
//! the pipeline. DOI forms are recognized by [`parse_doi`] and must be checked
//! before [`CatalogId::normalize`], since a DOI URL would otherwise be reduced
//! to its last path segment.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Canonical bare-key identifier, e.g. `W2741809807` or `A5023888391`.
///
/// The empty id is the "unparseable" sentinel and is skipped by every
/// consumer. Ordering is plain lexicographic, which is what rank tie-breaks
/// and node ordering rely on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(String);

impl CatalogId {
    /// Canonicalize an arbitrary input string to a bare key.
    ///
    /// Absolute URLs are reduced to their last non-empty path segment (query
    /// and fragment stripped). Bare keys get their leading letter uppercased.
    /// Anything else passes through trimmed and unchanged; inputs with no
    /// usable key become the empty id. Idempotent on its own output.
    pub fn normalize(input: &str) -> CatalogId {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return CatalogId::default();
        }

        let key = match strip_scheme(trimmed) {
            Some(rest) => {
                let path = match rest.find('/') {
                    Some(idx) => &rest[idx + 1..],
                    None => "",
                };
                let path = path.split(['?', '#']).next().unwrap_or("");
                match path.rsplit('/').find(|segment| !segment.is_empty()) {
                    Some(segment) => segment,
                    None => return CatalogId::default(),
                }
            }
            None => trimmed,
        };

        if is_bare_key(key) {
            let mut canonical = String::with_capacity(key.len());
            canonical.extend(key.chars().next().map(|c| c.to_ascii_uppercase()));
            canonical.push_str(&key[1..]);
            CatalogId(canonical)
        } else {
            CatalogId(key.to_string())
        }
    }

    /// Rebuild a work id from its numeric form, inverse of [`Self::to_numeric`].
    pub fn from_numeric(value: u64) -> CatalogId {
        CatalogId(format!("W{value}"))
    }

    /// Numeric form of a work id for the slim snapshot schema.
    ///
    /// Only `W`-prefixed keys without leading zeros convert, which keeps the
    /// round trip through [`Self::from_numeric`] lossless. Everything else
    /// returns `None` and is rejected by the snapshot writer.
    pub fn to_numeric(&self) -> Option<u64> {
        let digits = self.0.strip_prefix('W')?;
        if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CatalogId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn strip_scheme(input: &str) -> Option<&str> {
    for scheme in ["https://", "http://"] {
        if input.len() >= scheme.len() && input[..scheme.len()].eq_ignore_ascii_case(scheme) {
            return Some(&input[scheme.len()..]);
        }
    }
    None
}

fn is_bare_key(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            let rest = chars.as_str();
            !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

fn raw_doi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^10\.\d{4,}(?:\.\d+)*/\S+$").unwrap())
}

fn doi_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:https?://)?(?:dx\.)?doi\.org/(10\.\d{4,}(?:\.\d+)*/\S+)$").unwrap()
    })
}

/// Extract a DOI from raw (`10.xxxx/suffix`) or URL
/// (`https://doi.org/10.xxxx/suffix`) form. Returns the bare DOI, or `None`
/// when the input is not a DOI at all.
pub fn parse_doi(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if raw_doi_pattern().is_match(trimmed) {
        return Some(trimmed.to_string());
    }
    doi_url_pattern()
        .captures(trimmed)
        .map(|captures| captures[1].to_string())
}

/// Catalog lookup URL for a bare DOI.
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{doi}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_key_uppercases_prefix() {
        assert_eq!(CatalogId::normalize("w2741809807").as_str(), "W2741809807");
        assert_eq!(CatalogId::normalize("W2741809807").as_str(), "W2741809807");
        assert_eq!(CatalogId::normalize("a5023888391").as_str(), "A5023888391");
    }

    #[test]
    fn test_normalize_url_forms() {
        assert_eq!(
            CatalogId::normalize("https://openalex.org/W2741809807").as_str(),
            "W2741809807"
        );
        assert_eq!(
            CatalogId::normalize("https://api.openalex.org/works/W2741809807").as_str(),
            "W2741809807"
        );
        assert_eq!(
            CatalogId::normalize("HTTP://openalex.org/w123?select=id#frag").as_str(),
            "W123"
        );
        assert_eq!(
            CatalogId::normalize("https://openalex.org/W123/").as_str(),
            "W123"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in [
            "w123",
            "https://openalex.org/W2741809807",
            "10.1038/nature12373",
            "some opaque string",
        ] {
            let once = CatalogId::normalize(input);
            let twice = CatalogId::normalize(once.as_str());
            assert_eq!(once, twice, "normalize must be idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_unparseable_is_empty() {
        assert!(CatalogId::normalize("").is_empty());
        assert!(CatalogId::normalize("   ").is_empty());
        assert!(CatalogId::normalize("https://openalex.org/").is_empty());
        assert!(CatalogId::normalize("https://openalex.org").is_empty());
    }

    #[test]
    fn test_normalize_passthrough_for_other_strings() {
        assert_eq!(
            CatalogId::normalize("10.1038/nature12373").as_str(),
            "10.1038/nature12373"
        );
        assert_eq!(CatalogId::normalize("W12X34").as_str(), "W12X34");
    }

    #[test]
    fn test_parse_doi_accepts_known_forms() {
        for (input, expected) in [
            ("10.1038/nature12373", "10.1038/nature12373"),
            ("https://doi.org/10.1038/nature12373", "10.1038/nature12373"),
            ("http://dx.doi.org/10.1038/nature12373", "10.1038/nature12373"),
            ("doi.org/10.1103/PhysRevLett.116.061102", "10.1103/PhysRevLett.116.061102"),
            ("10.1016/j.cell.2015.01.001", "10.1016/j.cell.2015.01.001"),
        ] {
            assert_eq!(parse_doi(input).as_deref(), Some(expected), "for {input:?}");
        }
    }

    #[test]
    fn test_parse_doi_rejects_non_dois() {
        for input in [
            "",
            "W2741809807",
            "https://openalex.org/W2741809807",
            "10.12/short-prefix",
            "10.1038/",
            "doi.org/11.1038/nature12373",
            "not a doi at all",
        ] {
            assert_eq!(parse_doi(input), None, "for {input:?}");
        }
    }

    #[test]
    fn test_numeric_round_trip() {
        let id = CatalogId::normalize("W2741809807");
        assert_eq!(id.to_numeric(), Some(2_741_809_807));
        assert_eq!(CatalogId::from_numeric(2_741_809_807), id);
    }

    #[test]
    fn test_numeric_rejects_non_work_ids() {
        assert_eq!(CatalogId::normalize("A5023888391").to_numeric(), None);
        assert_eq!(CatalogId::normalize("10.1038/nature12373").to_numeric(), None);
        assert_eq!(CatalogId::normalize("W").to_numeric(), None);
        // leading zeros would not survive the round trip
        assert_eq!(CatalogId::normalize("W0123").to_numeric(), None);
    }
}
