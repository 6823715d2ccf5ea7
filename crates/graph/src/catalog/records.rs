//! Wire-format records for the works catalog.
//!
//! These mirror the provider's JSON shape and deserialize leniently: every
//! field is optional and unknown fields are ignored, so a partially filled
//! record never fails a whole page. Normalization into domain types happens
//! in [`crate::paper`].

use crate::ids::CatalogId;
use serde::Deserialize;
use std::collections::HashMap;

/// One work as returned by the catalog, in either slim or full projection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkRecord {
    pub id: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub display_name: Option<String>,
    pub publication_year: Option<i32>,
    pub language: Option<String>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    pub cited_by_count: Option<i64>,
    pub referenced_works: Option<Vec<String>>,
    pub abstract_inverted_index: Option<HashMap<String, Vec<i32>>>,
    pub authorships: Option<Vec<AuthorshipRecord>>,
    pub primary_location: Option<LocationRecord>,
    pub open_access: Option<OpenAccessRecord>,
    pub fwci: Option<f64>,
    pub citation_normalized_percentile: Option<PercentileRecord>,
    pub primary_topic: Option<TopicRecord>,
    pub sustainable_development_goals: Option<Vec<DisplayNameRecord>>,
    pub keywords: Option<Vec<DisplayNameRecord>>,
    pub is_retracted: Option<bool>,
}

impl WorkRecord {
    /// Canonical id of this record, empty when the record carries no id.
    pub fn canonical_id(&self) -> CatalogId {
        self.id
            .as_deref()
            .map(CatalogId::normalize)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorshipRecord {
    pub author: Option<AuthorRef>,
    pub institutions: Option<Vec<InstitutionRecord>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorRef {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub orcid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstitutionRecord {
    pub display_name: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationRecord {
    pub source: Option<SourceRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRecord {
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAccessRecord {
    pub is_oa: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PercentileRecord {
    pub value: Option<f64>,
    pub is_in_top_1_percent: Option<bool>,
    pub is_in_top_10_percent: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicRecord {
    pub display_name: Option<String>,
    pub subfield: Option<DisplayNameRecord>,
    pub field: Option<DisplayNameRecord>,
    pub domain: Option<DisplayNameRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayNameRecord {
    pub display_name: Option<String>,
}

/// A list endpoint page. A missing `results` key deserializes as an empty
/// page rather than an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorksPage {
    #[serde(default)]
    pub results: Vec<WorkRecord>,
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    pub count: Option<i64>,
}

/// One author profile from the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorRecord {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub orcid: Option<String>,
    pub works_count: Option<i64>,
    pub cited_by_count: Option<i64>,
}

impl AuthorRecord {
    pub fn canonical_id(&self) -> CatalogId {
        self.id
            .as_deref()
            .map(CatalogId::normalize)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_without_results_is_empty() {
        let page: WorksPage = serde_json::from_str(r#"{"meta":{"count":0}}"#).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.meta.unwrap().count, Some(0));
    }

    #[test]
    fn test_record_tolerates_missing_and_unknown_fields() {
        let record: WorkRecord = serde_json::from_str(
            r#"{"id":"https://openalex.org/W42","unexpected_key":{"x":1}}"#,
        )
        .unwrap();
        assert_eq!(record.canonical_id().as_str(), "W42");
        assert!(record.referenced_works.is_none());
        assert!(record.publication_year.is_none());
    }

    #[test]
    fn test_canonical_id_of_empty_record() {
        assert!(WorkRecord::default().canonical_id().is_empty());
    }
}
