use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use backbone_types::{Classification, LINNEAN_RANKS, Rank};

static NULL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\\N|\\?NULL|null)\s*$").unwrap());
static FIRST_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+").unwrap());

/// Conservative cleaning of a verbatim input string: collapses whitespace
/// and control characters, drops common verbatim NULL tokens and normalizes
/// unicode into NFC. Returns `None` when nothing usable remains.
pub fn clean(value: Option<&str>) -> Option<String> {
    let raw = value?;
    if raw.is_empty() || NULL_PATTERN.is_match(raw) {
        return None;
    }
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        if c.is_whitespace() || c.is_control() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    if out.is_empty() {
        return None;
    }
    Some(out.nfc().collect())
}

/// Clean every higher rank of the query classification, keeping only the
/// first word of each entry. Classification context fields often carry
/// trailing authors or annotations that would spoil the comparison.
pub fn clean_classification(cl: &mut Classification) {
    for rank in LINNEAN_RANKS {
        if rank == Rank::Species {
            continue;
        }
        if let Some(value) = cl.get(rank) {
            let cleaned = clean(Some(value))
                .and_then(|v| FIRST_WORD.find(&v).map(|m| m.as_str().to_string()));
            cl.set(rank, cleaned);
        }
    }
}

/// Name and rank assembled from whatever combination of full name and
/// atomized parts a request carried.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameAndRank {
    pub name: Option<String>,
    pub rank: Option<Rank>,
}

/// Build the query name from the full scientific name when given, otherwise
/// from the atomized parts, backfilling the genus from the classification
/// context. An authorship passed separately is appended when the name does
/// not already contain it.
pub fn assemble_name(
    scientific_name: Option<&str>,
    authorship: Option<&str>,
    generic_name: Option<&str>,
    specific_epithet: Option<&str>,
    infraspecific_epithet: Option<&str>,
    rank: Option<Rank>,
    classification: &Classification,
) -> NameAndRank {
    let scientific_name = clean(scientific_name);
    let authorship = clean(authorship);
    let generic_name = clean(generic_name);
    let specific_epithet = clean(specific_epithet);
    let infraspecific_epithet = clean(infraspecific_epithet);

    if let Some(name) = scientific_name {
        let name = match &authorship {
            Some(auth) if !name.contains(auth.as_str()) => format!("{name} {auth}"),
            _ => name,
        };
        return NameAndRank {
            name: Some(name),
            rank,
        };
    }

    let genus = generic_name.or_else(|| clean(classification.get(Rank::Genus)));
    let Some(genus) = genus else {
        return NameAndRank { name: None, rank };
    };

    let mut name = genus;
    let mut inferred = Some(Rank::Genus);
    if let Some(se) = &specific_epithet {
        name.push(' ');
        name.push_str(se);
        inferred = Some(Rank::Species);
        if let Some(ie) = &infraspecific_epithet {
            name.push(' ');
            name.push_str(ie);
            inferred = Some(Rank::InfraspecificName);
        }
    }
    if let Some(auth) = &authorship {
        name.push(' ');
        name.push_str(auth);
    }
    NameAndRank {
        name: Some(name),
        rank: rank.or(inferred),
    }
}
