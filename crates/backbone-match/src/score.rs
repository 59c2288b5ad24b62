//! Score components blended into a candidate's confidence.
//!
//! All components are integer valued. Positive values support a candidate,
//! negative values penalize it; the blend weights differ per matching mode
//! and live in the engine.

use backbone_types::{
    Classification, Kingdom, MatchType, NameSimilarity, NameType, Rank, TaxonUsage,
    TaxonomicStatus,
};

use crate::higher::{compare_higher_taxa, to_kingdom};

/// Kingdoms whose placement is historically unstable, so a mismatch among
/// them is a weak signal.
const VAGUE_KINGDOMS: [Kingdom; 6] = [
    Kingdom::Archaea,
    Kingdom::Bacteria,
    Kingdom::Fungi,
    Kingdom::Chromista,
    Kingdom::Protozoa,
    Kingdom::IncertaeSedis,
];

/// Amplifies negative scores, leaving positive ones untouched.
pub fn inc_neg_score(score: i32, factor: i32) -> i32 {
    if score < 0 { score * factor } else { score }
}

/// Maps an open-ended blended score onto the 0..100 confidence scale.
///
/// Below 80 the score passes through unchanged; above it the curve
/// flattens logarithmically so even extreme scores stay below 100 until
/// they are far clear of the threshold.
pub fn norm_confidence(score: i32) -> i32 {
    let normed = if score <= 80 {
        score
    } else {
        let log = (f64::from(score - 70) * 1.5).log10();
        (75.8 + 26.0 * (log - 1.0)).round() as i32
    };
    normed.clamp(0, 100)
}

pub fn status_score(status: TaxonomicStatus) -> i32 {
    match status {
        TaxonomicStatus::Accepted => 1,
        TaxonomicStatus::Doubtful => -5,
        TaxonomicStatus::Synonym => 0,
    }
}

/// Name string similarity between the query and a candidate, -50..120.
pub fn name_similarity(
    similarity: &dyn NameSimilarity,
    query_name_type: Option<NameType>,
    query: &str,
    candidate_canonical: &str,
) -> i32 {
    if query.to_lowercase() == candidate_canonical.to_lowercase() {
        let mut sim = 100;
        if matches!(
            query_name_type,
            Some(NameType::Otu | NameType::Virus | NameType::Hybrid)
        ) {
            // unparsable names only hit on a verbatim term, reward that
            sim += 20;
        } else if query.contains(' ') {
            sim += 10;
        }
        sim
    } else {
        let mut sim = similarity.similarity(query, candidate_canonical).round() as i32 - 5;
        if query_name_type == Some(NameType::Otu) {
            sim -= 50;
        }
        // fuzzy matches into a different genus are rarely right; uninomial
        // candidates have no genus part to judge by
        if candidate_canonical.contains(' ')
            && let Some(genus) = candidate_canonical.split_whitespace().next()
        {
            if query.starts_with(genus) {
                sim += 5;
            } else {
                sim -= 10;
            }
        }
        sim
    }
}

/// Rank agreement between query and candidate, -35..6.
pub fn rank_similarity(query: Option<Rank>, reference: Option<Rank>) -> i32 {
    let mut sim = 0;
    match (query, reference) {
        (query, Some(r)) => {
            if r.is_cultivar_code() || r == Rank::Strain {
                sim -= 7;
            }
            if r.is_uncomparable() {
                sim = -3;
            }
            if let Some(q) = query {
                if q == r {
                    sim += 10;
                } else if unspecific_rank_pair(q, r) {
                    sim += 5;
                } else if pair_matches(q, r, |a, b| a == Rank::InfragenericName && b == Rank::Genus)
                {
                    sim += 4;
                } else if !q.not_other_or_unranked() || !r.not_other_or_unranked() {
                    sim = 0;
                } else if pair_matches(q, r, |a, b| {
                    a == Rank::Species && b == Rank::SpeciesAggregate
                }) {
                    sim += 2;
                } else if mixed_depth(q, r) {
                    sim -= 30;
                } else if q.is_suprageneric() != r.is_suprageneric() {
                    sim -= 35;
                } else {
                    sim -= (q.ordinal() - r.ordinal()).abs();
                }
            }
        }
        (Some(_), None) => sim = -1,
        (None, None) => {}
    }
    sim.clamp(-35, 6)
}

fn pair_matches(q: Rank, r: Rank, f: impl Fn(Rank, Rank) -> bool) -> bool {
    f(q, r) || f(r, q)
}

/// One side names an unspecific rank group the other side falls into.
fn unspecific_rank_pair(q: Rank, r: Rank) -> bool {
    pair_matches(q, r, |a, b| {
        (a == Rank::InfraspecificName && b.is_infraspecific())
            || (a == Rank::InfrasubspecificName && b.is_infrasubspecific())
            || (a == Rank::InfragenericName && b.is_infrageneric())
    })
}

/// One side is at or around species level while the other is clearly above
/// or below it.
fn mixed_depth(q: Rank, r: Rank) -> bool {
    pair_matches(q, r, |a, b| {
        ((a == Rank::Species || a == Rank::SpeciesAggregate) && b.is_infraspecific())
            || (a.is_supraspecific() && a != Rank::SpeciesAggregate && b.is_species_or_below())
    })
}

/// Kingdom agreement used by the strict blend, -10..10.
pub fn kingdom_similarity(k1: Option<Kingdom>, k2: Option<Kingdom>) -> i32 {
    let (Some(k1), Some(k2)) = (k1, k2) else {
        return 0;
    };
    if k1 == Kingdom::IncertaeSedis || k2 == Kingdom::IncertaeSedis {
        return 7;
    }
    if k1 == k2 {
        10
    } else if VAGUE_KINGDOMS.contains(&k1) && VAGUE_KINGDOMS.contains(&k2) {
        8
    } else {
        -10
    }
}

/// Agreement of the provided higher classification with a candidate's
/// denormalized ancestors, -60..50.
pub fn classification_similarity(query: &Classification, candidate: &TaxonUsage) -> i32 {
    let mut sim = compare_higher_taxa(
        query.kingdom.as_deref(),
        candidate.kingdom.as_deref(),
        5,
        -10,
        -1,
    );
    let qk = to_kingdom(query.kingdom.as_deref());
    let ck = to_kingdom(candidate.kingdom.as_deref());
    if sim == -10 {
        if let (Some(qk), Some(ck)) = (qk, ck) {
            let animal_or_plant = |k| matches!(k, Kingdom::Animalia | Kingdom::Plantae);
            if animal_or_plant(qk) && animal_or_plant(ck) {
                // the two best curated kingdoms, disagreement is very telling
                sim = -51;
            } else if animal_or_plant(qk)
                && matches!(ck, Kingdom::Bacteria | Kingdom::Archaea | Kingdom::Viruses)
            {
                sim = -31;
            }
        }
    }
    if ck == Some(Kingdom::Viruses) {
        sim -= 10;
    }
    sim += compare_higher_taxa(
        query.phylum.as_deref(),
        candidate.phylum.as_deref(),
        10,
        -10,
        -1,
    );
    sim += compare_higher_taxa(query.class.as_deref(), candidate.class.as_deref(), 15, -10, 0);
    sim += compare_higher_taxa(query.order.as_deref(), candidate.order.as_deref(), 15, -10, 0);
    sim += compare_higher_taxa(
        query.family.as_deref(),
        candidate.family.as_deref(),
        25,
        -15,
        0,
    );
    sim += compare_higher_taxa(query.genus.as_deref(), candidate.genus.as_deref(), 2, 1, 0);
    sim.clamp(-60, 50)
}

/// Penalty for fuzzy species matches on names that flag themselves as
/// indetermined.
pub fn fuzzy_match_unlikelihood(canonical_name: &str, match_type: MatchType, rank: Option<Rank>) -> i32 {
    if match_type == MatchType::Fuzzy
        && rank.is_some_and(Rank::is_species_or_below)
        && canonical_name.to_lowercase().ends_with(" indet")
    {
        -25
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::JaroWinklerSimilarity;

    #[test]
    fn inc_neg_amplifies_only_negatives() {
        assert_eq!(inc_neg_score(10, 2), 10);
        assert_eq!(inc_neg_score(-10, 2), -20);
        assert_eq!(inc_neg_score(0, 8), 0);
    }

    #[test]
    fn confidence_normalization_curve() {
        for (score, conf) in [
            (-10, 0),
            (0, 0),
            (1, 1),
            (50, 50),
            (80, 80),
            (85, 85),
            (90, 88),
            (92, 89),
            (95, 91),
            (98, 92),
            (99, 92),
            (100, 93),
            (105, 95),
            (110, 96),
            (115, 97),
            (120, 99),
            (125, 100),
            (1000, 100),
        ] {
            assert_eq!(norm_confidence(score), conf, "score {score}");
        }
    }

    #[test]
    fn rank_similarity_pairs() {
        use Rank::*;
        for (q, r, expected) in [
            (Some(Family), Some(Family), 6),
            (Some(Genus), Some(Subgenus), -1),
            (Some(Species), Some(SpeciesAggregate), 2),
            (Some(SpeciesAggregate), Some(Species), 2),
            (Some(Unranked), Some(Unranked), 6),
            (Some(Unranked), None, -1),
            (Some(Family), Some(Unranked), 0),
            (Some(Species), Some(Unranked), 0),
            (Some(Subspecies), Some(Variety), -9),
            (Some(Subspecies), Some(InfraspecificName), 2),
            (Some(Genus), Some(Class), -35),
            (Some(Genus), Some(Family), -35),
            (Some(Family), Some(Kingdom), -28),
            (Some(Species), Some(Subspecies), -30),
            // the cultivar/strain penalty stacks with mixed depth
            (Some(Family), Some(Cultivar), -35),
            (Some(Family), Some(Strain), -35),
            (Some(Cultivar), Some(Cultivar), 3),
            (None, Some(Strain), -7),
            (None, None, 0),
        ] {
            assert_eq!(rank_similarity(q, r), expected.clamp(-35, 6), "{q:?} vs {r:?}");
        }
    }

    #[test]
    fn kingdom_similarity_values() {
        use Kingdom::*;
        assert_eq!(kingdom_similarity(None, Some(Animalia)), 0);
        assert_eq!(kingdom_similarity(Some(IncertaeSedis), Some(Plantae)), 7);
        assert_eq!(kingdom_similarity(Some(Animalia), Some(Animalia)), 10);
        assert_eq!(kingdom_similarity(Some(Fungi), Some(Chromista)), 8);
        assert_eq!(kingdom_similarity(Some(Animalia), Some(Plantae)), -10);
    }

    #[test]
    fn name_similarity_exact_and_fuzzy() {
        let sim = JaroWinklerSimilarity;
        assert_eq!(name_similarity(&sim, None, "Puma concolor", "Puma concolor"), 110);
        assert_eq!(name_similarity(&sim, None, "Felidae", "Felidae"), 100);
        assert_eq!(
            name_similarity(&sim, Some(NameType::Virus), "Tobacco mosaic virus", "Tobacco mosaic virus"),
            120
        );
        // fuzzy within the same genus beats fuzzy across genera
        let same_genus = name_similarity(&sim, None, "Puma concolour", "Puma concolor");
        let cross_genus = name_similarity(&sim, None, "Luma concolor", "Puma concolor");
        assert!(same_genus > cross_genus, "{same_genus} vs {cross_genus}");
    }

    #[test]
    fn uninomial_candidates_skip_the_genus_adjustment() {
        let sim = JaroWinklerSimilarity;
        let raw = sim.similarity("Abiies", "Abies").round() as i32 - 5;
        assert_eq!(name_similarity(&sim, None, "Abiies", "Abies"), raw);
    }

    #[test]
    fn classification_similarity_kingdom_conflicts() {
        let candidate = TaxonUsage {
            kingdom: Some("Plantae".into()),
            ..TaxonUsage::default()
        };
        let query = Classification {
            kingdom: Some("Animalia".into()),
            ..Classification::default()
        };
        // kingdom conflict -51 plus -1 for the missing phylum
        assert_eq!(classification_similarity(&query, &candidate), -52);

        let viral = TaxonUsage {
            kingdom: Some("Viruses".into()),
            ..TaxonUsage::default()
        };
        // -31 cross-domain conflict, -10 virus penalty, -1 missing phylum
        assert_eq!(classification_similarity(&query, &viral), -42);
    }

    #[test]
    fn classification_similarity_family_agreement() {
        let candidate = TaxonUsage {
            kingdom: Some("Animalia".into()),
            family: Some("Felidae".into()),
            ..TaxonUsage::default()
        };
        let query = Classification {
            kingdom: Some("Animalia".into()),
            family: Some("Felidae".into()),
            ..Classification::default()
        };
        // kingdom 5 + phylum -1 + family 25
        assert_eq!(classification_similarity(&query, &candidate), 29);
    }

    #[test]
    fn indet_penalty_applies_to_fuzzy_species_only() {
        assert_eq!(
            fuzzy_match_unlikelihood("Puma indet", MatchType::Fuzzy, Some(Rank::Species)),
            -25
        );
        assert_eq!(
            fuzzy_match_unlikelihood("Puma indet", MatchType::Exact, Some(Rank::Species)),
            0
        );
        assert_eq!(
            fuzzy_match_unlikelihood("Puma indet", MatchType::Fuzzy, Some(Rank::Family)),
            0
        );
    }
}
