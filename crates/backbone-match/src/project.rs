//! Projection of an engine result into the synonym-resolved API view.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use backbone_index::{IndexError, TaxonIndex};
use backbone_types::{ClassificationEntry, MatchType, Rank, TaxonUsage, TaxonomicStatus};

use crate::engine::{Candidate, MatchResult};
use crate::notes::render_notes;

/// Extinct taxa carry the dagger in their label.
const EXTINCT_SYMBOL: char = '†';

/// Splits an infraspecific name around its rank marker so the marker itself
/// stays unitalicized.
static RANK_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(.+[a-z]) ((?:notho)?(?:infra|super|sub)?(?:gx|natio|morph|klepton|lusus|strain|chemoform|(?:subsp|f\. ?sp|[a-z]{1,4})\.|[a-z]{3,6}var\.?))( [a-z][^ ]*?)?( .+)?$",
    )
    .unwrap()
});

/// A plain Linnean uninomial, binomial or trinomial without authorship,
/// optionally with an infrageneric part in brackets.
static LINNEAN_NAME_NO_AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    const EPITHET: &str = "[a-z0-9ïëöüäåéèčáàæœ-]+";
    Regex::new(&format!(
        "^[A-ZÆŒ]{EPITHET}(?: \\([A-ZÆŒ]{EPITHET}\\))?(?: {EPITHET}(?: {EPITHET})?)?$"
    ))
    .unwrap()
});

/// One usage flattened for the API, with display labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedName {
    pub id: String,
    pub scientific_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    pub label: String,
    pub label_html: String,
    pub extinct: bool,
    pub status: TaxonomicStatus,
}

/// Diagnostic block of a projected match.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub match_type: MatchType,
    pub confidence: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaxonomicStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Only ever populated on the top level result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Match2>,
}

/// The synonym-resolved match response.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match2 {
    pub synonym: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<RankedName>,
    /// The accepted usage a synonym points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_usage: Option<RankedName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classification: Vec<RankedName>,
    pub diagnostics: Diagnostics,
}

/// Projects an engine result, resolving synonyms to their accepted usage
/// through the index.
pub fn project(index: &TaxonIndex, result: &MatchResult) -> Result<Match2, IndexError> {
    let alternatives = result
        .alternatives
        .iter()
        .map(|c| project_candidate(index, c))
        .collect::<Result<Vec<_>, _>>()?;
    let mut projected = project_usage(index, result.usage.as_ref())?;
    projected.diagnostics = Diagnostics {
        match_type: result.match_type,
        confidence: result.confidence,
        status: result.usage.as_ref().map(|u| u.status),
        note: render_notes(&result.notes),
        alternatives,
    };
    Ok(projected)
}

fn project_candidate(index: &TaxonIndex, candidate: &Candidate) -> Result<Match2, IndexError> {
    let mut projected = project_usage(index, Some(&candidate.usage))?;
    projected.diagnostics = Diagnostics {
        match_type: candidate.match_type,
        confidence: candidate.confidence,
        status: Some(candidate.usage.status),
        note: render_notes(&candidate.notes),
        alternatives: Vec::new(),
    };
    Ok(projected)
}

fn project_usage(index: &TaxonIndex, usage: Option<&TaxonUsage>) -> Result<Match2, IndexError> {
    let Some(usage) = usage else {
        return Ok(Match2 {
            synonym: false,
            usage: None,
            accepted_usage: None,
            classification: Vec::new(),
            diagnostics: empty_diagnostics(),
        });
    };
    let synonym = usage.status.is_synonym();
    let accepted_usage = if synonym {
        match &usage.parent_id {
            Some(parent) => index.match_by_usage_id(parent)?.map(|u| ranked(&u)),
            None => None,
        }
    } else {
        None
    };
    Ok(Match2 {
        synonym,
        usage: Some(ranked(usage)),
        accepted_usage,
        classification: ranked_classification(usage),
        diagnostics: empty_diagnostics(),
    })
}

fn empty_diagnostics() -> Diagnostics {
    Diagnostics {
        match_type: MatchType::None,
        confidence: 0,
        status: None,
        note: None,
        alternatives: Vec::new(),
    }
}

/// Flattens a usage with its display labels.
pub fn ranked(usage: &TaxonUsage) -> RankedName {
    RankedName {
        id: usage.id.clone(),
        scientific_name: usage.scientific_name.clone(),
        authorship: usage.authorship.clone(),
        rank: usage.rank.map(rank_str),
        label: label(usage),
        label_html: label_html(usage),
        extinct: usage.extinct,
        status: usage.status,
    }
}

/// The ancestors of a usage ordered root first. The index stores them
/// unordered, so the order is always derived from their ranks.
fn ranked_classification(usage: &TaxonUsage) -> Vec<RankedName> {
    let mut entries: Vec<&ClassificationEntry> = usage.classification.iter().collect();
    entries.sort_by_key(|e| e.parsed_rank().map_or(i32::MAX, Rank::ordinal));
    entries
        .iter()
        .map(|e| RankedName {
            id: e.id.clone(),
            scientific_name: e.scientific_name.clone(),
            authorship: e.authorship.clone(),
            rank: Some(entry_rank_str(e)),
            label: format_label(&e.scientific_name, e.authorship.as_deref(), e.extinct),
            label_html: format_label_html(
                &e.scientific_name,
                e.authorship.as_deref(),
                e.parsed_rank(),
                e.extinct,
            ),
            extinct: e.extinct,
            status: e.status,
        })
        .collect()
}

fn rank_str(rank: Rank) -> String {
    rank.to_string().to_uppercase().replace(' ', "_")
}

fn entry_rank_str(entry: &ClassificationEntry) -> String {
    match entry.parsed_rank() {
        Some(r) => rank_str(r),
        None => entry.rank.to_uppercase().replace(' ', "_"),
    }
}

/// Plain display label: dagger for extinct taxa, then the name with its
/// authorship.
pub fn label(usage: &TaxonUsage) -> String {
    format_label(&usage.scientific_name, usage.authorship.as_deref(), usage.extinct)
}

/// Display label with the name in italics for genus level and below.
pub fn label_html(usage: &TaxonUsage) -> String {
    format_label_html(
        &usage.scientific_name,
        usage.authorship.as_deref(),
        usage.rank,
        usage.extinct,
    )
}

fn format_label(name: &str, authorship: Option<&str>, extinct: bool) -> String {
    let mut out = String::new();
    if extinct {
        out.push(EXTINCT_SYMBOL);
    }
    out.push_str(name);
    append_authorship(&mut out, name, authorship);
    out
}

fn format_label_html(
    name: &str,
    authorship: Option<&str>,
    rank: Option<Rank>,
    extinct: bool,
) -> String {
    let mut out = String::new();
    if extinct {
        out.push(EXTINCT_SYMBOL);
    }
    if rank.is_some_and(|r| r >= Rank::Genus) {
        out.push_str(&italicize(name));
    } else {
        out.push_str(name);
    }
    append_authorship(&mut out, name, authorship);
    out
}

fn append_authorship(out: &mut String, name: &str, authorship: Option<&str>) {
    if let Some(a) = authorship
        && !a.is_empty()
        && !name.contains(a)
    {
        out.push(' ');
        out.push_str(a);
    }
}

fn italicize(name: &str) -> String {
    if let Some(caps) = RANK_MARKER.captures(name) {
        let mut out = format!("<i>{}</i> {}", &caps[1], &caps[2]);
        if let Some(epithet) = caps.get(3) {
            out.push_str(" <i>");
            out.push_str(epithet.as_str().trim_start());
            out.push_str("</i>");
        }
        if let Some(tail) = caps.get(4) {
            out.push_str(tail.as_str());
        }
        out
    } else if LINNEAN_NAME_NO_AUTHOR.is_match(name) {
        format!("<i>{name}</i>")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(name: &str, rank: Rank) -> TaxonUsage {
        TaxonUsage {
            id: "1".into(),
            scientific_name: name.into(),
            canonical_name: name.into(),
            rank: Some(rank),
            status: TaxonomicStatus::Accepted,
            ..TaxonUsage::default()
        }
    }

    #[test]
    fn species_label_is_italic_with_plain_authorship() {
        let mut u = usage("Puma concolor", Rank::Species);
        u.authorship = Some("(Linnaeus, 1771)".into());
        assert_eq!(label(&u), "Puma concolor (Linnaeus, 1771)");
        assert_eq!(label_html(&u), "<i>Puma concolor</i> (Linnaeus, 1771)");
    }

    #[test]
    fn family_label_is_not_italicized() {
        let u = usage("Felidae", Rank::Family);
        assert_eq!(label_html(&u), "Felidae");
    }

    #[test]
    fn extinct_label_gets_the_dagger() {
        let mut u = usage("Smilodon populator", Rank::Species);
        u.extinct = true;
        assert_eq!(label(&u), "†Smilodon populator");
        assert_eq!(label_html(&u), "†<i>Smilodon populator</i>");
    }

    #[test]
    fn rank_marker_stays_unitalicized() {
        let u = usage("Puma concolor subsp. cougar", Rank::Subspecies);
        assert_eq!(
            label_html(&u),
            "<i>Puma concolor</i> subsp. <i>cougar</i>"
        );
    }

    #[test]
    fn authorship_already_in_name_is_not_doubled() {
        let mut u = usage("Puma concolor (Linnaeus, 1771)", Rank::Species);
        u.authorship = Some("(Linnaeus, 1771)".into());
        assert_eq!(label(&u), "Puma concolor (Linnaeus, 1771)");
    }

    #[test]
    fn classification_is_ordered_by_rank() {
        let mut u = usage("Puma concolor", Rank::Species);
        for (id, name, rank) in [
            ("g", "Puma", "genus"),
            ("k", "Animalia", "kingdom"),
            ("f", "Felidae", "family"),
        ] {
            u.classification.push(ClassificationEntry {
                id: id.into(),
                scientific_name: name.into(),
                authorship: None,
                rank: rank.into(),
                status: TaxonomicStatus::Accepted,
                extinct: false,
            });
        }
        let ranked = ranked_classification(&u);
        let names: Vec<&str> = ranked.iter().map(|r| r.scientific_name.as_str()).collect();
        assert_eq!(names, vec!["Animalia", "Felidae", "Puma"]);
        assert_eq!(ranked[0].rank.as_deref(), Some("KINGDOM"));
        assert_eq!(ranked[2].label_html, "<i>Puma</i>");
    }

    #[test]
    fn rank_strings_use_enum_form() {
        assert_eq!(rank_str(Rank::SpeciesAggregate), "SPECIES_AGGREGATE");
        assert_eq!(rank_str(Rank::Species), "SPECIES");
    }
}
