//! Candidate ranking for root and branch selection.
//!
//! Both rankings reward structural proximity to the seed set. Root ranking
//! scores candidates from the reference side of the source (what the seeds
//! cite together); branch ranking scores candidates from the citing side,
//! with co-citation weighted toward recent papers. All scores are plain
//! sums, so rankings are deterministic for a given input.

use crate::ids::CatalogId;
use crate::paper::SlimPaper;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Half-life, in years, of the recency weight applied to branch co-citation.
pub const RECENCY_HALF_LIFE: f64 = 4.0;

/// Per-candidate score breakdown. `rank` is the sum of the components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RankInfo {
    pub rank: f64,
    pub cited: f64,
    pub citing: f64,
    pub co_cited: f64,
    pub co_citing: f64,
}

/// Recency weight for a citing paper: `1 + ln(1 + half_life / age)` with age
/// floored at one year, rounded to two decimals.
pub fn recency_weight(current_year: i32, year: i32) -> f64 {
    let age = (current_year - year).max(1) as f64;
    let weight = 1.0 + (1.0 + RECENCY_HALF_LIFE / age).ln();
    (weight * 100.0).round() / 100.0
}

/// Score root candidates against the seed set.
///
/// Components per candidate `c`:
/// - `cited`: how many seeds cite `c` directly;
/// - `co_cited`: for every paper (seed or candidate) citing `k >= 1` seeds,
///   each of its non-seed references gains `k`;
/// - `co_citing`: how many of `c`'s references fall in the union of all
///   seed references.
pub fn compute_root_ranks(
    seeds: &HashMap<CatalogId, SlimPaper>,
    candidates: &HashMap<CatalogId, SlimPaper>,
) -> HashMap<CatalogId, RankInfo> {
    let mut ranks: HashMap<CatalogId, RankInfo> = candidates
        .keys()
        .map(|id| (id.clone(), RankInfo::default()))
        .collect();

    let mut seed_reference_union: HashSet<&CatalogId> = HashSet::new();
    for seed in seeds.values() {
        for reference in &seed.references {
            seed_reference_union.insert(reference);
            if let Some(info) = ranks.get_mut(reference) {
                info.cited += 1.0;
            }
        }
    }

    let papers = seeds
        .values()
        .chain(candidates.values().filter(|c| !seeds.contains_key(&c.id)));
    for paper in papers {
        let seeds_cited = paper
            .references
            .iter()
            .filter(|r| seeds.contains_key(*r))
            .count();
        if seeds_cited == 0 {
            continue;
        }
        for reference in &paper.references {
            if seeds.contains_key(reference) {
                continue;
            }
            if let Some(info) = ranks.get_mut(reference) {
                info.co_cited += seeds_cited as f64;
            }
        }
    }

    for (id, candidate) in candidates {
        if seeds.contains_key(id) {
            continue;
        }
        let shared = candidate
            .references
            .iter()
            .filter(|r| seed_reference_union.contains(*r))
            .count();
        if let Some(info) = ranks.get_mut(id) {
            info.co_citing = shared as f64;
        }
    }

    for info in ranks.values_mut() {
        info.rank = info.cited + info.co_cited + info.co_citing;
    }
    ranks
}

/// Score branch candidates against the citing-side seed set of `source`.
///
/// Components per candidate `c`:
/// - `citing`: how many branch seeds `c` cites;
/// - `co_citing`: how many references `c` shares with the source;
/// - `co_cited`: every paper (seed or candidate) that cites the source
///   spreads its recency weight over its other references.
pub fn compute_branch_ranks(
    source: &SlimPaper,
    seeds: &HashMap<CatalogId, SlimPaper>,
    candidates: &HashMap<CatalogId, SlimPaper>,
    current_year: i32,
) -> HashMap<CatalogId, RankInfo> {
    let source_references: HashSet<&CatalogId> = source.references.iter().collect();
    let mut ranks: HashMap<CatalogId, RankInfo> = candidates
        .iter()
        .map(|(id, candidate)| {
            let info = RankInfo {
                citing: candidate
                    .references
                    .iter()
                    .filter(|r| seeds.contains_key(*r))
                    .count() as f64,
                co_citing: candidate
                    .references
                    .iter()
                    .filter(|r| source_references.contains(*r))
                    .count() as f64,
                ..Default::default()
            };
            (id.clone(), info)
        })
        .collect();

    let papers = seeds
        .values()
        .chain(candidates.values().filter(|c| !seeds.contains_key(&c.id)));
    for paper in papers {
        if !paper.references.iter().any(|r| *r == source.id) {
            continue;
        }
        let weight = recency_weight(current_year, paper.year);
        for reference in &paper.references {
            if *reference == source.id {
                continue;
            }
            if let Some(info) = ranks.get_mut(reference) {
                info.co_cited += weight;
            }
        }
    }

    for info in ranks.values_mut() {
        info.rank = info.citing + info.co_citing + info.co_cited;
    }
    ranks
}

/// Top `n` candidate ids by rank descending, ties broken by id ascending.
pub fn top_ranked(ranks: &HashMap<CatalogId, RankInfo>, n: usize) -> Vec<CatalogId> {
    let mut entries: Vec<(&CatalogId, &RankInfo)> = ranks.iter().collect();
    entries.sort_by(|a, b| {
        b.1.rank
            .partial_cmp(&a.1.rank)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    entries.into_iter().take(n).map(|(id, _)| id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slim(id: &str, year: i32, references: &[&str]) -> SlimPaper {
        SlimPaper {
            id: CatalogId::normalize(id),
            year,
            citation_count: 1,
            references: references.iter().map(|r| CatalogId::normalize(r)).collect(),
        }
    }

    fn into_map(papers: Vec<SlimPaper>) -> HashMap<CatalogId, SlimPaper> {
        papers.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    fn id(raw: &str) -> CatalogId {
        CatalogId::normalize(raw)
    }

    #[test]
    fn test_recency_weight_hand_checked() {
        assert_eq!(recency_weight(2024, 2020), 1.69); // 1 + ln(2)
        assert_eq!(recency_weight(2024, 2023), 2.61); // 1 + ln(5)
        // zero and negative ages floor to one year
        assert_eq!(recency_weight(2024, 2024), 2.61);
        assert_eq!(recency_weight(2024, 2030), 2.61);
    }

    #[test]
    fn test_root_ranks_hand_checked() {
        let seeds = into_map(vec![
            slim("S1", 2018, &["C1", "C2"]),
            slim("S2", 2019, &["C1", "S1"]),
        ]);
        let candidates = into_map(vec![
            slim("C1", 2016, &["C2", "X1"]),
            slim("C2", 2015, &[]),
        ]);

        let ranks = compute_root_ranks(&seeds, &candidates);

        let c1 = ranks[&id("C1")];
        assert_eq!(c1.cited, 2.0); // cited by S1 and S2
        assert_eq!(c1.co_cited, 1.0); // S2 cites one seed alongside C1
        assert_eq!(c1.co_citing, 1.0); // C1 cites C2, a seed reference
        assert_eq!(c1.rank, 4.0);

        let c2 = ranks[&id("C2")];
        assert_eq!(c2.cited, 1.0);
        assert_eq!(c2.co_cited, 0.0);
        assert_eq!(c2.co_citing, 0.0);
        assert_eq!(c2.rank, 1.0);
    }

    #[test]
    fn test_root_ranks_only_score_known_candidates() {
        let seeds = into_map(vec![slim("S1", 2018, &["C1", "X1", "X2"])]);
        let candidates = into_map(vec![slim("C1", 2016, &[])]);

        let ranks = compute_root_ranks(&seeds, &candidates);
        assert_eq!(ranks.len(), 1);
        assert!(ranks.contains_key(&id("C1")));
    }

    #[test]
    fn test_branch_ranks_hand_checked() {
        let source = slim("W0", 2015, &["R1", "R2"]);
        let seeds = into_map(vec![
            slim("B1", 2020, &["W0", "R1", "BC1"]),
            slim("B2", 2022, &["W0", "BC1", "BC2"]),
        ]);
        let candidates = into_map(vec![
            slim("BC1", 2021, &["W0", "B1", "R2"]),
            slim("BC2", 2019, &["R1"]),
        ]);

        let ranks = compute_branch_ranks(&source, &seeds, &candidates, 2024);

        // B1 weight: age 4 -> 1.69; B2 weight: age 2 -> 1 + ln(3) -> 2.10
        let bc1 = ranks[&id("BC1")];
        assert_eq!(bc1.citing, 1.0); // cites seed B1
        assert_eq!(bc1.co_citing, 1.0); // shares R2 with the source
        assert!((bc1.co_cited - 3.79).abs() < 1e-9);
        assert!((bc1.rank - 5.79).abs() < 1e-9);

        let bc2 = ranks[&id("BC2")];
        assert_eq!(bc2.citing, 0.0);
        assert_eq!(bc2.co_citing, 1.0); // shares R1 with the source
        assert!((bc2.co_cited - 2.10).abs() < 1e-9);
        assert!((bc2.rank - 3.10).abs() < 1e-9);
    }

    #[test]
    fn test_branch_candidate_citing_source_spreads_weight() {
        let source = slim("W0", 2015, &[]);
        let seeds = into_map(vec![slim("B1", 2020, &["W0"])]);
        // BC1 cites the source, so its weight lands on its other reference BC2
        let candidates = into_map(vec![
            slim("BC1", 2022, &["W0", "BC2"]),
            slim("BC2", 2021, &[]),
        ]);

        let ranks = compute_branch_ranks(&source, &seeds, &candidates, 2024);
        assert!((ranks[&id("BC2")].co_cited - 2.10).abs() < 1e-9);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let seeds = into_map(vec![
            slim("S1", 2018, &["C1", "C2", "C3"]),
            slim("S2", 2019, &["C2", "C3"]),
            slim("S3", 2020, &["C3", "S1"]),
        ]);
        let candidates = into_map(vec![
            slim("C1", 2015, &["C2"]),
            slim("C2", 2016, &["C3"]),
            slim("C3", 2017, &[]),
        ]);

        let first = compute_root_ranks(&seeds, &candidates);
        for _ in 0..5 {
            let again = compute_root_ranks(&seeds, &candidates);
            assert_eq!(top_ranked(&again, 3), top_ranked(&first, 3));
            for (key, info) in &first {
                assert_eq!(again[key], *info);
            }
        }
    }

    #[test]
    fn test_top_ranked_ties_break_by_id_ascending() {
        let mut ranks = HashMap::new();
        ranks.insert(id("W2"), RankInfo { rank: 3.0, ..Default::default() });
        ranks.insert(id("W10"), RankInfo { rank: 3.0, ..Default::default() });
        ranks.insert(id("W1"), RankInfo { rank: 5.0, ..Default::default() });

        assert_eq!(top_ranked(&ranks, 2), vec![id("W1"), id("W10")]);
        assert_eq!(top_ranked(&ranks, 3), vec![id("W1"), id("W10"), id("W2")]);
    }

    #[test]
    fn test_top_ranked_handles_short_candidate_lists() {
        let mut ranks = HashMap::new();
        ranks.insert(id("W1"), RankInfo { rank: 1.0, ..Default::default() });
        assert_eq!(top_ranked(&ranks, 25).len(), 1);
        assert!(top_ranked(&HashMap::new(), 25).is_empty());
    }
}
