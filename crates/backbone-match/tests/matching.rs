use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use backbone_index::{TaxonIndex, build_index};
use backbone_match::{
    DefaultNameParser, MatchEngine, MatchQuery, Note, project, render_notes,
};
use backbone_types::{Classification, MatchType, Rank};
use zip::write::SimpleFileOptions;

const CHECKLIST: &str = "\
col:ID\tcol:parentID\tcol:status\tcol:rank\tcol:scientificName\tcol:authorship\tcol:specificEpithet\tcol:genericName\tcol:code\tcol:nameStatus\tcol:extinct
1\t\taccepted\tkingdom\tAnimalia\t\t\t\t\t\t
2\t1\taccepted\tphylum\tChordata\t\t\t\t\t\t
3\t2\taccepted\tclass\tMammalia\t\t\t\t\t\t
4\t3\taccepted\torder\tCarnivora\t\t\t\t\t\t
5\t4\taccepted\tfamily\tFelidae\tFischer, 1817\t\t\t\t\t
6\t5\taccepted\tgenus\tPuma\tJardine, 1834\t\tPuma\t\t\t
7\t6\taccepted\tspecies\tPuma concolor\t(Linnaeus, 1771)\tconcolor\tPuma\t\t\t
8\t7\tsynonym\tspecies\tFelis concolor\tLinnaeus, 1771\tconcolor\tFelis\t\t\t
20\t7\tsynonym\tspecies\tPanthera concolor\tGay, 1847\tconcolor\tPanthera\t\t\t
21\t7\tsynonym\tspecies\tPanthera concolor\tLoche, 1858\tconcolor\tPanthera\t\t\t
30\t2\taccepted\tclass\tAves\t\t\t\t\t\t
31\t30\taccepted\tgenus\tOenanthe\tVieillot, 1816\t\tOenanthe\t\t\t
33\t30\taccepted\tgenus\tDrupa\t\t\tDrupa\t\t\t
34\t3\taccepted\tgenus\tDrupa\t\t\tDrupa\t\t\t
10\t\taccepted\tkingdom\tPlantae\t\t\t\t\t\t
11\t10\taccepted\tfamily\tPinaceae\t\t\t\t\t\t
12\t11\taccepted\tgenus\tAbies\tMill.\t\tAbies\t\t\t
13\t12\taccepted\tspecies\tAbies alba\tMill.\talba\tAbies\t\t\t
32\t10\taccepted\tgenus\tOenanthe\tL.\t\tOenanthe\t\t\t
";

fn build_engine() -> (tempfile::TempDir, MatchEngine) {
    let dir = tempfile::tempdir().unwrap();
    let archive = write_archive(dir.path());
    let index_dir = dir.path().join("index");
    build_index(&archive, &index_dir, &DefaultNameParser).unwrap();
    let engine = MatchEngine::new(TaxonIndex::open(&index_dir).unwrap());
    (dir, engine)
}

fn write_archive(dir: &Path) -> std::path::PathBuf {
    let archive = dir.join("checklist.zip");
    let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
    writer
        .start_file("NameUsage.tsv", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(CHECKLIST.as_bytes()).unwrap();
    writer.finish().unwrap();
    archive
}

fn animal_query(name: &str) -> MatchQuery {
    MatchQuery {
        name: Some(name.to_string()),
        rank: Some(Rank::Species),
        classification: Classification {
            kingdom: Some("Animalia".into()),
            ..Classification::default()
        },
        ..MatchQuery::default()
    }
}

#[test]
fn exact_name_matches_with_full_confidence() {
    let (_dir, engine) = build_engine();
    let result = engine.match_usage(&animal_query("Puma concolor")).unwrap();
    assert_eq!(result.match_type, MatchType::Exact);
    assert_eq!(result.usage.as_ref().unwrap().id, "7");
    assert_eq!(result.confidence, 100);
}

#[test]
fn misspelled_name_matches_fuzzily() {
    let (_dir, engine) = build_engine();
    let result = engine.match_usage(&animal_query("Puma concolar")).unwrap();
    assert_eq!(result.match_type, MatchType::Fuzzy);
    assert_eq!(result.usage.as_ref().unwrap().id, "7");
    assert!(result.confidence >= 80 && result.confidence < 100);
}

#[test]
fn unknown_species_falls_back_to_its_genus() {
    let (_dir, engine) = build_engine();
    let query = MatchQuery {
        name: Some("Puma imaginaria".into()),
        ..MatchQuery::default()
    };
    let result = engine.match_usage(&query).unwrap();
    assert_eq!(result.match_type, MatchType::HigherRank);
    assert_eq!(result.usage.as_ref().unwrap().id, "6");
}

#[test]
fn strict_mode_never_falls_back() {
    let (_dir, engine) = build_engine();
    let query = MatchQuery {
        name: Some("Puma imaginaria".into()),
        strict: true,
        ..MatchQuery::default()
    };
    let result = engine.match_usage(&query).unwrap();
    assert_eq!(result.match_type, MatchType::None);
    assert!(result.usage.is_none());
}

#[test]
fn conflicting_kingdom_escalates_past_the_species() {
    let (_dir, engine) = build_engine();
    // Abies alba is a plant; an animal context must not match it
    let result = engine.match_usage(&animal_query("Abies alba")).unwrap();
    assert_ne!(
        result.usage.as_ref().map(|u| u.id.as_str()),
        Some("13"),
        "matched the conflicting species"
    );
    assert_eq!(result.match_type, MatchType::HigherRank);
    assert_eq!(result.usage.as_ref().unwrap().id, "1");
}

#[test]
fn agreeing_kingdom_matches_the_species() {
    let (_dir, engine) = build_engine();
    let query = MatchQuery {
        name: Some("Abies alba".into()),
        rank: Some(Rank::Species),
        classification: Classification {
            kingdom: Some("Plantae".into()),
            ..Classification::default()
        },
        ..MatchQuery::default()
    };
    let result = engine.match_usage(&query).unwrap();
    assert_eq!(result.match_type, MatchType::Exact);
    assert_eq!(result.usage.as_ref().unwrap().id, "13");
}

#[test]
fn usage_key_overrides_all_names() {
    let (_dir, engine) = build_engine();
    let query = MatchQuery {
        usage_key: Some("8".into()),
        name: Some("Puma concolor".into()),
        ..MatchQuery::default()
    };
    let result = engine.match_usage(&query).unwrap();
    assert_eq!(result.match_type, MatchType::Exact);
    assert_eq!(result.confidence, 100);
    assert_eq!(result.usage.as_ref().unwrap().id, "8");
    assert_eq!(
        render_notes(&result.notes).as_deref(),
        Some("All provided names were ignored since the usageKey was provided")
    );
}

#[test]
fn missing_usage_key_is_a_confident_no_match() {
    let (_dir, engine) = build_engine();
    let query = MatchQuery {
        usage_key: Some("404".into()),
        ..MatchQuery::default()
    };
    let result = engine.match_usage(&query).unwrap();
    assert_eq!(result.match_type, MatchType::None);
    assert_eq!(result.confidence, 100);
}

#[test]
fn empty_query_reports_no_name() {
    let (_dir, engine) = build_engine();
    let result = engine.match_usage(&MatchQuery::default()).unwrap();
    assert_eq!(result.match_type, MatchType::None);
    assert!(result.notes.contains(&Note::NoNameGiven));
}

#[test]
fn excluded_subtree_candidates_score_zero() {
    let (_dir, engine) = build_engine();
    let mut query = animal_query("Puma concolor");
    query.exclude = HashSet::from(["6".to_string()]);
    query.verbose = true;
    let result = engine.match_usage(&query).unwrap();
    assert_ne!(result.usage.as_ref().map(|u| u.id.as_str()), Some("7"));
    let excluded = result
        .alternatives
        .iter()
        .find(|c| c.usage.id == "7")
        .expect("excluded candidate reported as alternative");
    assert!(excluded.notes.contains(&Note::ExcludedBy("6".into())));
    assert_eq!(excluded.confidence, 0);
}

#[test]
fn bracket_authorship_rewards_agreeing_combination_authors() {
    let (_dir, engine) = build_engine();
    // the query cites the basionym authors, the usage carries them as plain
    // combination authors; the cross compare must reward the agreement
    let mut query = animal_query("Felis concolor (Linnaeus, 1771)");
    query.verbose = true;
    let result = engine.match_usage(&query).unwrap();
    assert_eq!(result.usage.as_ref().unwrap().id, "8");
    assert!(
        result.notes.contains(&Note::AuthorshipSimilarity(1)),
        "notes were {:?}",
        result.notes
    );
}

#[test]
fn synonym_homonyms_pick_the_lowest_id() {
    let (_dir, engine) = build_engine();
    // two synonyms of the same taxon share a name; the tie must resolve
    // deterministically and say so
    let result = engine
        .match_usage(&animal_query("Panthera concolor"))
        .unwrap();
    assert_eq!(result.match_type, MatchType::Exact);
    assert_eq!(result.usage.as_ref().unwrap().id, "20");
    assert!(
        result.notes.contains(&Note::SynonymHomonyms(2)),
        "notes were {:?}",
        result.notes
    );
}

#[test]
fn cross_kingdom_homonyms_match_nothing() {
    let (_dir, engine) = build_engine();
    // the bird and the plant genus share nothing, not even a kingdom
    let result = engine
        .match_usage(&MatchQuery {
            name: Some("Oenanthe".into()),
            ..MatchQuery::default()
        })
        .unwrap();
    assert_eq!(result.match_type, MatchType::None);
    assert!(result.usage.is_none());
    assert!(
        result
            .notes
            .contains(&Note::NoLowestDenominator("Oenanthe".into())),
        "notes were {:?}",
        result.notes
    );
}

#[test]
fn class_spanning_homonyms_resolve_to_the_shared_phylum() {
    let (_dir, engine) = build_engine();
    let result = engine
        .match_usage(&MatchQuery {
            name: Some("Drupa".into()),
            ..MatchQuery::default()
        })
        .unwrap();
    assert_eq!(result.match_type, MatchType::HigherRank);
    assert_eq!(result.usage.as_ref().unwrap().id, "2");
    assert_eq!(result.confidence, 92);
}

#[test]
fn weak_ambiguous_cluster_escalates_instead_of_resolving() {
    let (_dir, engine) = build_engine();
    // a contradicted kingdom drags both homonyms far below acceptance; their
    // shared phylum must not come back, the kingdom itself must
    let result = engine
        .match_usage(&MatchQuery {
            name: Some("Drupa".into()),
            classification: Classification {
                kingdom: Some("Plantae".into()),
                ..Classification::default()
            },
            ..MatchQuery::default()
        })
        .unwrap();
    assert_eq!(result.match_type, MatchType::HigherRank);
    assert_eq!(result.usage.as_ref().unwrap().id, "10");
}

#[test]
fn verbose_match_carries_score_breakdown() {
    let (_dir, engine) = build_engine();
    let mut query = animal_query("Puma concolor");
    query.verbose = true;
    let result = engine.match_usage(&query).unwrap();
    let note = render_notes(&result.notes).unwrap();
    assert!(note.starts_with("Similarity: name="), "note was {note}");
    assert!(note.contains("score="), "note was {note}");
}

#[test]
fn synonym_projection_resolves_the_accepted_usage() {
    let (_dir, engine) = build_engine();
    let query = MatchQuery {
        usage_key: Some("8".into()),
        ..MatchQuery::default()
    };
    let result = engine.match_usage(&query).unwrap();
    let projected = project(engine.index(), &result).unwrap();
    assert!(projected.synonym);
    assert_eq!(projected.usage.as_ref().unwrap().id, "8");
    assert_eq!(
        projected.usage.as_ref().unwrap().label_html,
        "<i>Felis concolor</i> Linnaeus, 1771"
    );
    assert_eq!(projected.accepted_usage.as_ref().unwrap().id, "7");

    let names: Vec<&str> = projected
        .classification
        .iter()
        .map(|r| r.scientific_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Animalia",
            "Chordata",
            "Mammalia",
            "Carnivora",
            "Felidae",
            "Puma",
            "Puma concolor"
        ]
    );
    assert_eq!(projected.diagnostics.match_type, MatchType::Exact);
    assert_eq!(projected.diagnostics.confidence, 100);
}

#[test]
fn lowercase_garbage_input_stays_strict() {
    let (_dir, engine) = build_engine();
    // verbatim term still hits, but nothing fuzzy and no fallback
    let result = engine
        .match_usage(&MatchQuery {
            name: Some("puma concolor".into()),
            ..MatchQuery::default()
        })
        .unwrap();
    assert_eq!(result.match_type, MatchType::Exact);
    assert_eq!(result.usage.as_ref().unwrap().id, "7");

    let miss = engine
        .match_usage(&MatchQuery {
            name: Some("puma concolar".into()),
            ..MatchQuery::default()
        })
        .unwrap();
    assert_eq!(miss.match_type, MatchType::None);
}
