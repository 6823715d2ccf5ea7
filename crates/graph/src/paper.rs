//! Domain model for works and their normalization from wire records.
//!
//! Two shapes exist on purpose: [`SlimPaper`] carries only what ranking
//! needs (year, citation count, references) so candidate fetches stay cheap,
//! while [`Paper`] is the fully hydrated display form. Both are produced
//! from [`WorkRecord`] here and nowhere else.

use crate::catalog::records::{AuthorshipRecord, PercentileRecord, TopicRecord, WorkRecord};
use crate::ids::{parse_doi, CatalogId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display limit for author lists.
pub const MAX_AUTHORS: usize = 5;

/// Structural role a work plays in an assembled graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Root,
    Branch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CatalogId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryTopic {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subfield: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Citation percentile with top-tier flags. When the provider omits the
/// flags they are derived from the value itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationPercentile {
    pub value: f64,
    pub top_1_percent: bool,
    pub top_10_percent: bool,
}

/// Fully hydrated work, the display form carried by graph nodes.
///
/// Optional fields are omitted from JSON when absent rather than serialized
/// as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: CatalogId,
    pub year: i32,
    pub title: String,
    pub authors: Vec<Author>,
    pub citation_count: u32,
    pub references_count: usize,
    pub references: Vec<CatalogId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    pub source_url: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub work_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fwci: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_percentile: Option<CitationPercentile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_topic: Option<PrimaryTopic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdgs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_retracted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,
}

impl Paper {
    /// Normalize a full-projection record into the display form.
    pub fn from_record(record: &WorkRecord) -> Paper {
        let id = record.canonical_id();
        let references = normalize_references(record);
        let title = record
            .title
            .as_deref()
            .or(record.display_name.as_deref())
            .unwrap_or_default()
            .to_string();
        let source = record
            .primary_location
            .as_ref()
            .and_then(|location| location.source.as_ref());

        Paper {
            source_url: source_url(record, &id),
            year: record.publication_year.unwrap_or(0),
            title,
            authors: normalize_authors(record.authorships.as_deref().unwrap_or_default()),
            citation_count: clamp_count(record.cited_by_count),
            references_count: references.len(),
            references,
            doi: record.doi.as_deref().and_then(parse_doi),
            work_type: non_empty(record.work_type.clone()),
            venue_name: source.and_then(|s| non_empty(s.display_name.clone())),
            venue_type: source.and_then(|s| non_empty(s.source_type.clone())),
            open_access: record.open_access.as_ref().and_then(|oa| oa.is_oa),
            language: non_empty(record.language.clone()),
            abstract_text: record
                .abstract_inverted_index
                .as_ref()
                .map(reconstruct_abstract)
                .unwrap_or_default(),
            fwci: record.fwci,
            citation_percentile: record
                .citation_normalized_percentile
                .as_ref()
                .and_then(normalize_percentile),
            primary_topic: record.primary_topic.as_ref().and_then(normalize_topic),
            sdgs: display_names(record.sustainable_development_goals.as_deref()),
            keywords: display_names(record.keywords.as_deref()),
            is_retracted: record.is_retracted,
            role: None,
            id,
        }
    }
}

/// Ranking-sized slice of a work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlimPaper {
    pub id: CatalogId,
    pub year: i32,
    pub citation_count: u32,
    pub references: Vec<CatalogId>,
}

impl SlimPaper {
    pub fn from_record(record: &WorkRecord) -> SlimPaper {
        SlimPaper {
            id: record.canonical_id(),
            year: record.publication_year.unwrap_or(0),
            citation_count: clamp_count(record.cited_by_count),
            references: normalize_references(record),
        }
    }

    pub fn from_paper(paper: &Paper) -> SlimPaper {
        SlimPaper {
            id: paper.id.clone(),
            year: paper.year,
            citation_count: paper.citation_count,
            references: paper.references.clone(),
        }
    }
}

/// Rebuild plain abstract text from the provider's inverted index.
///
/// Each word maps to the list of positions it occupies. Entries are
/// flattened, ordered by position (ties broken by word so the result is
/// deterministic), and joined with single spaces.
pub fn reconstruct_abstract(index: &HashMap<String, Vec<i32>>) -> String {
    let mut positioned: Vec<(i32, &str)> = Vec::new();
    for (word, positions) in index {
        for &position in positions {
            positioned.push((position, word.as_str()));
        }
    }
    positioned.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    let words: Vec<&str> = positioned.into_iter().map(|(_, word)| word).collect();
    words.join(" ")
}

fn normalize_references(record: &WorkRecord) -> Vec<CatalogId> {
    let mut seen = std::collections::HashSet::new();
    record
        .referenced_works
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|raw| CatalogId::normalize(raw))
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

fn normalize_authors(authorships: &[AuthorshipRecord]) -> Vec<Author> {
    authorships
        .iter()
        .take(MAX_AUTHORS)
        .map(|authorship| {
            let author = authorship.author.as_ref();
            let institution = authorship
                .institutions
                .as_deref()
                .unwrap_or_default()
                .first();
            Author {
                id: author
                    .and_then(|a| a.id.as_deref())
                    .map(CatalogId::normalize)
                    .filter(|id| !id.is_empty()),
                name: author
                    .and_then(|a| a.display_name.clone())
                    .unwrap_or_default(),
                orcid: author.and_then(|a| non_empty(a.orcid.clone())),
                affiliation: institution.and_then(|i| non_empty(i.display_name.clone())),
                country: institution.and_then(|i| non_empty(i.country_code.clone())),
            }
        })
        .collect()
}

fn normalize_percentile(record: &PercentileRecord) -> Option<CitationPercentile> {
    let value = record.value?;
    Some(CitationPercentile {
        value,
        top_1_percent: record.is_in_top_1_percent.unwrap_or(value >= 99.0),
        top_10_percent: record.is_in_top_10_percent.unwrap_or(value >= 90.0),
    })
}

fn normalize_topic(record: &TopicRecord) -> Option<PrimaryTopic> {
    let topic = non_empty(record.display_name.clone())?;
    Some(PrimaryTopic {
        topic,
        subfield: record
            .subfield
            .as_ref()
            .and_then(|r| non_empty(r.display_name.clone())),
        field: record
            .field
            .as_ref()
            .and_then(|r| non_empty(r.display_name.clone())),
        domain: record
            .domain
            .as_ref()
            .and_then(|r| non_empty(r.display_name.clone())),
    })
}

fn display_names(
    records: Option<&[crate::catalog::records::DisplayNameRecord]>,
) -> Option<Vec<String>> {
    let names: Vec<String> = records?
        .iter()
        .filter_map(|r| non_empty(r.display_name.clone()))
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

fn source_url(record: &WorkRecord, id: &CatalogId) -> String {
    match record.id.as_deref() {
        Some(raw) if raw.starts_with("http") => raw.to_string(),
        _ if !id.is_empty() => format!("https://openalex.org/{id}"),
        _ => String::new(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn clamp_count(value: Option<i64>) -> u32 {
    value
        .unwrap_or(0)
        .clamp(0, u32::MAX as i64)
        .try_into()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::records::{AuthorRef, DisplayNameRecord};

    fn record_with_abstract(index: &[(&str, &[i32])]) -> WorkRecord {
        WorkRecord {
            id: Some("https://openalex.org/W1".to_string()),
            abstract_inverted_index: Some(
                index
                    .iter()
                    .map(|(word, positions)| (word.to_string(), positions.to_vec()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_abstract_reconstruction_repeats_and_order() {
        let record = record_with_abstract(&[("a", &[0, 2]), ("b", &[1])]);
        let paper = Paper::from_record(&record);
        assert_eq!(paper.abstract_text, "a b a");
    }

    #[test]
    fn test_abstract_reconstruction_unordered_positions() {
        let record = record_with_abstract(&[("world", &[1]), ("hello", &[0]), ("again", &[2])]);
        assert_eq!(
            Paper::from_record(&record).abstract_text,
            "hello world again"
        );
    }

    #[test]
    fn test_missing_abstract_is_empty_string() {
        let record = WorkRecord {
            id: Some("W7".to_string()),
            ..Default::default()
        };
        assert_eq!(Paper::from_record(&record).abstract_text, "");
    }

    #[test]
    fn test_authors_truncated_to_display_limit() {
        let authorships: Vec<AuthorshipRecord> = (0..8)
            .map(|i| AuthorshipRecord {
                author: Some(AuthorRef {
                    id: Some(format!("https://openalex.org/A{i}")),
                    display_name: Some(format!("Author {i}")),
                    orcid: None,
                }),
                institutions: None,
            })
            .collect();
        let record = WorkRecord {
            id: Some("W9".to_string()),
            authorships: Some(authorships),
            ..Default::default()
        };
        let paper = Paper::from_record(&record);
        assert_eq!(paper.authors.len(), MAX_AUTHORS);
        assert_eq!(paper.authors[0].name, "Author 0");
        assert_eq!(paper.authors[0].id.as_ref().unwrap().as_str(), "A0");
    }

    #[test]
    fn test_references_normalized_and_deduplicated() {
        let record = WorkRecord {
            id: Some("W1".to_string()),
            referenced_works: Some(vec![
                "https://openalex.org/W2".to_string(),
                "w3".to_string(),
                "https://openalex.org/W2".to_string(),
                "".to_string(),
            ]),
            ..Default::default()
        };
        let paper = Paper::from_record(&record);
        assert_eq!(
            paper.references,
            vec![CatalogId::normalize("W2"), CatalogId::normalize("W3")]
        );
        assert_eq!(paper.references_count, 2);
    }

    #[test]
    fn test_percentile_flags_default_from_value() {
        let cases = [
            (99.5, true, true),
            (95.0, false, true),
            (50.0, false, false),
        ];
        for (value, top_1, top_10) in cases {
            let record = WorkRecord {
                id: Some("W1".to_string()),
                citation_normalized_percentile: Some(PercentileRecord {
                    value: Some(value),
                    is_in_top_1_percent: None,
                    is_in_top_10_percent: None,
                }),
                ..Default::default()
            };
            let percentile = Paper::from_record(&record).citation_percentile.unwrap();
            assert_eq!(percentile.top_1_percent, top_1, "value {value}");
            assert_eq!(percentile.top_10_percent, top_10, "value {value}");
        }
    }

    #[test]
    fn test_percentile_explicit_flags_win() {
        let record = WorkRecord {
            id: Some("W1".to_string()),
            citation_normalized_percentile: Some(PercentileRecord {
                value: Some(99.9),
                is_in_top_1_percent: Some(false),
                is_in_top_10_percent: Some(true),
            }),
            ..Default::default()
        };
        let percentile = Paper::from_record(&record).citation_percentile.unwrap();
        assert!(!percentile.top_1_percent);
        assert!(percentile.top_10_percent);
    }

    #[test]
    fn test_absent_optionals_are_omitted_from_json() {
        let paper = Paper::from_record(&WorkRecord {
            id: Some("W1".to_string()),
            ..Default::default()
        });
        let json = serde_json::to_value(&paper).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("doi"));
        assert!(!object.contains_key("fwci"));
        assert!(!object.contains_key("venue_name"));
        assert!(!object.contains_key("role"));
        assert_eq!(object["abstract"], "");
    }

    #[test]
    fn test_doi_normalized_to_bare_form() {
        let record = WorkRecord {
            id: Some("W1".to_string()),
            doi: Some("https://doi.org/10.1038/nature12373".to_string()),
            ..Default::default()
        };
        assert_eq!(
            Paper::from_record(&record).doi.as_deref(),
            Some("10.1038/nature12373")
        );
    }

    #[test]
    fn test_empty_keyword_lists_collapse_to_none() {
        let record = WorkRecord {
            id: Some("W1".to_string()),
            keywords: Some(vec![DisplayNameRecord { display_name: None }]),
            sustainable_development_goals: Some(vec![]),
            ..Default::default()
        };
        let paper = Paper::from_record(&record);
        assert!(paper.keywords.is_none());
        assert!(paper.sdgs.is_none());
    }

    #[test]
    fn test_slim_paper_from_record() {
        let record = WorkRecord {
            id: Some("https://openalex.org/W5".to_string()),
            publication_year: Some(2019),
            cited_by_count: Some(12),
            referenced_works: Some(vec!["W1".to_string(), "W2".to_string()]),
            ..Default::default()
        };
        let slim = SlimPaper::from_record(&record);
        assert_eq!(slim.id.as_str(), "W5");
        assert_eq!(slim.year, 2019);
        assert_eq!(slim.citation_count, 12);
        assert_eq!(slim.references.len(), 2);
    }
}
