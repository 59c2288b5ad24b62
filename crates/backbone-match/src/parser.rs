use std::sync::LazyLock;

use regex::Regex;

use backbone_types::{NameParser, NameType, ParsedName, Rank, UnparsableName};

static VIRUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(virus(es)?|viroids?|phages?|prions?|ictv)\b").unwrap());
static OTU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(BOLD:[0-9A-Z]{7}|SH\d+\.\d{2}FU)$").unwrap());
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(incertae sedis|unknown|unplaced|not assigned|awaiting allocation)$")
        .unwrap()
});
static HYBRID_FORMULA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" (×|x) [A-ZÆŒ]").unwrap());
static UNINOMIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-ZÆŒ][\p{L}-]+$").unwrap());
static INFRAGENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(([A-ZÆŒ][\p{L}-]+)\)$").unwrap());
static EPITHET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zïëöüäåéèčáàæœ][a-zïëöüäåéèčáàæœ-]*$").unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").unwrap());

/// Rank markers that may appear between epithets.
const RANK_MARKERS: [(&str, Rank); 12] = [
    ("subsp.", Rank::Subspecies),
    ("ssp.", Rank::Subspecies),
    ("var.", Rank::Variety),
    ("subvar.", Rank::Subvariety),
    ("f.", Rank::Form),
    ("fo.", Rank::Form),
    ("forma", Rank::Form),
    ("cv.", Rank::Cultivar),
    ("natio", Rank::Natio),
    ("morph", Rank::Morph),
    ("ab.", Rank::Aberration),
    ("agg.", Rank::SpeciesAggregate),
];

/// Tokens marking an indetermined or uncertain epithet. Anything after them
/// is dropped so "Abies spec." matches Abies alone.
const INDET_MARKERS: [&str; 6] = ["sp.", "spec.", "sp", "indet.", "cf.", "aff."];

/// A pragmatic scientific name parser.
///
/// Covers uninomials, binomials and trinomials with optional infrageneric
/// part, rank markers, combination and basionym authorship, and rejects
/// virus names, OTU identifiers, hybrid formulas and placeholders with
/// their detected [`NameType`]. It does not attempt the full grammar of
/// nomenclatural codes; it is one implementation of the parsing capability
/// and can be swapped out.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultNameParser;

impl NameParser for DefaultNameParser {
    fn parse(&self, name: &str, rank: Option<Rank>) -> Result<ParsedName, UnparsableName> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(unparsable(NameType::NoName, name));
        }
        if PLACEHOLDER.is_match(trimmed) {
            return Err(unparsable(NameType::Placeholder, name));
        }
        if OTU.is_match(trimmed) {
            return Err(unparsable(NameType::Otu, name));
        }
        if VIRUS.is_match(trimmed) {
            return Err(unparsable(NameType::Virus, name));
        }
        if HYBRID_FORMULA.is_match(trimmed) {
            return Err(unparsable(NameType::Hybrid, name));
        }

        let mut name_type = NameType::Scientific;
        let mut rest = trimmed;
        if let Some(stripped) = rest.strip_prefix("Candidatus ").or_else(|| rest.strip_prefix("Ca. ")) {
            name_type = NameType::Candidatus;
            rest = stripped;
        }
        // named hybrids keep their epithets, only the marker goes
        let rest = rest.replace("× ", "").replace('×', "");

        let mut tokens = rest.split_whitespace().peekable();
        let Some(first) = tokens.next() else {
            return Err(unparsable(NameType::NoName, name));
        };
        if !UNINOMIAL.is_match(first) {
            return Err(unparsable(NameType::Doubtful, name));
        }

        let mut pn = ParsedName {
            name_type: Some(name_type),
            genus_or_above: Some(first.to_string()),
            ..ParsedName::default()
        };

        if let Some(token) = tokens.peek()
            && let Some(caps) = INFRAGENERIC.captures(token)
        {
            pn.infrageneric = Some(caps[1].to_string());
            tokens.next();
        }

        let mut marker_rank: Option<Rank> = None;
        let mut indet = false;
        for token in tokens.by_ref() {
            let lower = token.to_lowercase();
            // markers are printed lowercase; an uppercase "F." is an author
            if token == lower
                && let Some((_, r)) = RANK_MARKERS.iter().find(|(m, _)| *m == lower)
            {
                marker_rank = Some(*r);
                continue;
            }
            if INDET_MARKERS.contains(&lower.as_str()) {
                indet = true;
                pn.name_type = Some(NameType::Informal);
                break;
            }
            if EPITHET.is_match(token) {
                if pn.specific_epithet.is_none() {
                    pn.specific_epithet = Some(token.to_string());
                } else if pn.infraspecific_epithet.is_none() {
                    pn.infraspecific_epithet = Some(token.to_string());
                }
                continue;
            }
            // authorship starts here
            let offset = token.as_ptr() as usize - rest.as_ptr() as usize;
            parse_authorship(&rest[offset..], &mut pn);
            break;
        }

        pn.rank = marker_rank
            .or(match (&pn.specific_epithet, &pn.infraspecific_epithet) {
                (_, Some(_)) => Some(Rank::InfraspecificName),
                (Some(_), None) => Some(Rank::Species),
                _ => None,
            })
            .or(rank);
        if indet && pn.specific_epithet.is_none() {
            pn.rank = Some(Rank::Species);
        }
        Ok(pn)
    }
}

fn unparsable(name_type: NameType, name: &str) -> UnparsableName {
    UnparsableName {
        name_type,
        name: name.to_string(),
    }
}

fn parse_authorship(raw: &str, pn: &mut ParsedName) {
    let raw = raw.trim();
    let mut combination = raw;
    if let Some(stripped) = raw.strip_prefix('(') {
        match stripped.split_once(')') {
            Some((bracket, tail)) => {
                let (author, year) = split_year(bracket);
                pn.bracket_authorship = author;
                pn.bracket_year = year;
                combination = tail.trim();
            }
            None => combination = stripped,
        }
    }
    let (author, year) = split_year(combination);
    pn.authorship = author;
    pn.year = year;
}

fn split_year(section: &str) -> (Option<String>, Option<String>) {
    let year = YEAR.find(section).map(|m| m.as_str().to_string());
    let author = YEAR
        .replace(section, "")
        .trim()
        .trim_end_matches([',', ' '])
        .to_string();
    let author = if author.is_empty() { None } else { Some(author) };
    (author, year)
}
