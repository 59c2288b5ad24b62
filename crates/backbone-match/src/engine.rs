//! The fuzzy matching engine.
//!
//! One query runs through a fixed pipeline: clean the inputs, atomize the
//! name, retrieve candidates from the index, score each candidate against
//! the query, then pick a winner or escalate to ever higher ranks until
//! something matches with enough confidence.

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use backbone_index::{IndexError, MAX_CANDIDATES, NameHit, TaxonIndex, filter_species_aggregate};
use backbone_types::{
    AuthorComparator, Classification, LINNEAN_RANKS, MatchType, NameParser, NameSimilarity,
    NameType, ParsedName, Rank, TaxonUsage,
};

use crate::authorship::DefaultAuthorComparator;
use crate::clean::{NameAndRank, assemble_name, clean, clean_classification};
use crate::higher::{norm, to_kingdom};
use crate::notes::Note;
use crate::parser::DefaultNameParser;
use crate::score;
use crate::similarity::JaroWinklerSimilarity;

/// Accept threshold for direct matches.
const MIN_CONFIDENCE: i32 = 80;
/// Accept threshold when only a higher rank was queried.
const MIN_CONFIDENCE_FOR_HIGHER_MATCHES: i32 = 90;
/// Candidates this close to the best count as equally good when checking
/// whether they span conflicting classes.
const MIN_CONFIDENCE_ACROSS_RANKS: i32 = 1;

/// Ranks tried, lowest first, when a name itself finds no match and the
/// provided classification is used as a fallback query.
const HIGHER_QUERY_RANK: [Rank; 7] = [
    Rank::Species,
    Rank::Genus,
    Rank::Family,
    Rank::Order,
    Rank::Class,
    Rank::Phylum,
    Rank::Kingdom,
];

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// One match request against the backbone.
#[derive(Clone, Debug, Default)]
pub struct MatchQuery {
    /// When set, all name fields are ignored and the usage is looked up
    /// directly.
    pub usage_key: Option<String>,
    pub name: Option<String>,
    pub authorship: Option<String>,
    /// Atomized parts, used to assemble a name when no full name is given.
    pub generic_name: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,
    pub rank: Option<Rank>,
    pub classification: Classification,
    /// Usage ids never to match; candidates inside an excluded subtree are
    /// zeroed out, not removed, so they stay visible as alternatives.
    pub exclude: HashSet<String>,
    /// Never fall back to a higher rank.
    pub strict: bool,
    /// Report alternatives and score breakdowns.
    pub verbose: bool,
}

/// A scored candidate.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub usage: TaxonUsage,
    pub match_type: MatchType,
    pub confidence: i32,
    pub notes: Vec<Note>,
}

/// Outcome of a match request.
#[derive(Clone, Debug)]
pub struct MatchResult {
    pub usage: Option<TaxonUsage>,
    pub match_type: MatchType,
    pub confidence: i32,
    pub notes: Vec<Note>,
    pub alternatives: Vec<Candidate>,
}

impl MatchResult {
    fn none(confidence: i32, notes: Vec<Note>, alternatives: Vec<Candidate>) -> MatchResult {
        MatchResult {
            usage: None,
            match_type: MatchType::None,
            confidence,
            notes,
            alternatives,
        }
    }

    fn is_match(&self) -> bool {
        self.match_type != MatchType::None && self.usage.is_some()
    }
}

/// Internal scoring mode. The three modes blend the same components with
/// different weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Name, authorship, classification and rank all contribute.
    Fuzzy,
    /// Exact name semantics with heavily amplified penalties, used for
    /// unparsable names and verbatim-case queries.
    Strict,
    /// Matching a higher taxon extracted from the query.
    Higher,
}

pub struct MatchEngine<P = DefaultNameParser, A = DefaultAuthorComparator, S = JaroWinklerSimilarity>
{
    index: TaxonIndex,
    parser: P,
    authors: A,
    similarity: S,
}

impl MatchEngine {
    pub fn new(index: TaxonIndex) -> MatchEngine {
        MatchEngine::with_parts(
            index,
            DefaultNameParser,
            DefaultAuthorComparator,
            JaroWinklerSimilarity,
        )
    }
}

impl<P: NameParser, A: AuthorComparator, S: NameSimilarity> MatchEngine<P, A, S> {
    pub fn with_parts(index: TaxonIndex, parser: P, authors: A, similarity: S) -> Self {
        MatchEngine {
            index,
            parser,
            authors,
            similarity,
        }
    }

    pub fn index(&self) -> &TaxonIndex {
        &self.index
    }

    pub fn match_usage(&self, query: &MatchQuery) -> Result<MatchResult, MatchError> {
        if let Some(key) = &query.usage_key {
            return self.match_by_key(key);
        }

        let authorship = clean(query.authorship.as_deref());
        let mut classification = query.classification.clone();
        clean_classification(&mut classification);

        let NameAndRank { name, rank } = assemble_name(
            query.name.as_deref(),
            authorship.as_deref(),
            query.generic_name.as_deref(),
            query.specific_epithet.as_deref(),
            query.infraspecific_epithet.as_deref(),
            query.rank,
            &classification,
        );
        let Some(name) = name else {
            return Ok(MatchResult::none(100, vec![Note::NoNameGiven], Vec::new()));
        };

        self.match_internal(
            &name,
            authorship.as_deref(),
            rank,
            &mut classification,
            &query.exclude,
            query.strict,
            query.verbose,
        )
    }

    fn match_by_key(&self, key: &str) -> Result<MatchResult, MatchError> {
        Ok(match self.index.match_by_usage_id(key)? {
            Some(usage) => MatchResult {
                usage: Some(usage),
                match_type: MatchType::Exact,
                confidence: 100,
                notes: vec![Note::UsageKeyIgnoredNames],
                alternatives: Vec::new(),
            },
            None => MatchResult::none(100, Vec::new(), Vec::new()),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn match_internal(
        &self,
        name: &str,
        authorship: Option<&str>,
        rank: Option<Rank>,
        classification: &mut Classification,
        exclude: &HashSet<String>,
        strict: bool,
        verbose: bool,
    ) -> Result<MatchResult, MatchError> {
        let mut mode = if strict { Mode::Strict } else { Mode::Fuzzy };
        let mut rank = rank;
        let mut canonical = name.to_string();
        let mut query_name_type = None;
        let mut parsed: Option<ParsedName> = None;

        // all-lowercase and ALL-UPPERCASE strings are garbage input more
        // often than real names, match them verbatim only
        if name == name.to_lowercase() || name == name.to_uppercase() {
            mode = Mode::Strict;
            rank = rank.or(Some(Rank::Unranked));
        } else {
            match self.parser.parse(name, rank) {
                Ok(pn) => {
                    if let Some(c) = pn.canonical_name() {
                        canonical = c;
                    }
                    if classification.genus.is_none()
                        && pn.genus_or_above.is_some()
                        && pn.rank.is_some_and(Rank::is_infrageneric_strictly)
                    {
                        classification.genus = pn.genus_or_above.clone();
                    }
                    rank = rank.or(pn.rank);
                    query_name_type = pn.name_type;
                    // a parse can still succeed on a name the parser flags
                    // as unparsable in kind, match those verbatim only
                    if pn.name_type.is_some_and(|t| !t.is_parsable()) {
                        mode = Mode::Strict;
                    }
                    parsed = Some(pn);
                }
                Err(e) => {
                    debug!(name, name_type = ?e.name_type, "name not atomizable");
                    query_name_type = Some(e.name_type);
                    mode = Mode::Strict;
                    if e.name_type == NameType::Otu {
                        rank = Some(Rank::Unranked);
                    }
                }
            }
        }

        let match1 = self.match_once(
            mode,
            query_name_type,
            &canonical,
            authorship,
            parsed.as_ref(),
            rank,
            classification,
            exclude,
            verbose,
        )?;

        // a fuzzy species hit in a genus that conflicts with the provided
        // classification is usually wrong, prefer the genus itself then
        if match1.match_type == MatchType::Fuzzy
            && match1
                .usage
                .as_ref()
                .and_then(|u| u.rank)
                .is_some_and(Rank::is_species_or_below)
            && let Some(genus) = parsed.as_ref().and_then(|pn| pn.genus_or_above.as_deref())
            && let Some(usage) = &match1.usage
            && !usage
                .canonical_name
                .starts_with(&format!("{genus} "))
            && self.next_above_genus_differs(classification, usage)
        {
            let gm = self.match_once(
                Mode::Higher,
                None,
                genus,
                None,
                None,
                Some(Rank::Genus),
                classification,
                exclude,
                verbose,
            )?;
            if gm.is_match()
                && gm.usage.as_ref().and_then(|u| u.rank) == Some(Rank::Genus)
            {
                return Ok(higher_match(gm, match1));
            }
        }

        if match1.is_match() || strict {
            return Ok(match1);
        }

        // escalation: drop name parts from the bottom up until a usable
        // higher taxon matches
        let mut supra_generic_only = false;
        if let Some(pn) = &parsed
            && pn.genus_or_above.is_some()
            && (pn.specific_epithet.is_some() || rank.is_some_and(Rank::is_infrageneric))
        {
            if (pn.infraspecific_epithet.is_some() || rank.is_some_and(Rank::is_infraspecific))
                && let Some(species) = pn.canonical_species_name()
            {
                let m = self.match_once(
                    Mode::Fuzzy,
                    query_name_type,
                    &species,
                    None,
                    Some(pn),
                    Some(Rank::Species),
                    classification,
                    exclude,
                    verbose,
                )?;
                if m.is_match() {
                    return Ok(higher_match(m, match1));
                }
            }
            if let Some(genus) = pn.genus_or_above.as_deref() {
                let m = self.match_once(
                    Mode::Higher,
                    None,
                    genus,
                    None,
                    None,
                    None,
                    classification,
                    exclude,
                    verbose,
                )?;
                if m.is_match() {
                    return Ok(higher_match(m, match1));
                }
            }
            supra_generic_only = true;
        }

        for r in HIGHER_QUERY_RANK {
            if supra_generic_only && !r.is_suprageneric() {
                continue;
            }
            let Some(value) = classification.get(r).map(str::to_string) else {
                continue;
            };
            let m = self.match_once(
                Mode::Higher,
                None,
                &value,
                None,
                None,
                Some(r),
                classification,
                exclude,
                verbose,
            )?;
            if m.is_match() {
                return Ok(higher_match(m, match1));
            }
        }

        let alternatives = if verbose { match1.alternatives } else { Vec::new() };
        Ok(MatchResult::none(100, match1.notes, alternatives))
    }

    /// One retrieval and scoring round for a single canonical name.
    #[allow(clippy::too_many_arguments)]
    fn match_once(
        &self,
        mode: Mode,
        query_name_type: Option<NameType>,
        canonical: &str,
        authorship: Option<&str>,
        parsed: Option<&ParsedName>,
        rank: Option<Rank>,
        classification: &Classification,
        exclude: &HashSet<String>,
        verbose: bool,
    ) -> Result<MatchResult, MatchError> {
        let fuzzy = mode == Mode::Fuzzy;
        let mut hits = self.index.match_by_name(canonical, fuzzy, MAX_CANDIDATES)?;
        filter_species_aggregate(rank, &mut hits);

        let mut candidates: Vec<Candidate> = hits
            .into_iter()
            .map(|hit| {
                self.score_candidate(
                    mode,
                    query_name_type,
                    canonical,
                    authorship,
                    parsed,
                    rank,
                    classification,
                    hit,
                    verbose,
                )
            })
            .collect();

        for c in &mut candidates {
            if let Some(id) = excluded_id(&c.usage, exclude) {
                c.confidence = 0;
                c.notes.push(Note::ExcludedBy(id));
            }
        }

        self.select(canonical, mode, candidates, verbose)
    }

    #[allow(clippy::too_many_arguments)]
    fn score_candidate(
        &self,
        mode: Mode,
        query_name_type: Option<NameType>,
        canonical: &str,
        authorship: Option<&str>,
        parsed: Option<&ParsedName>,
        rank: Option<Rank>,
        classification: &Classification,
        hit: NameHit,
        verbose: bool,
    ) -> Candidate {
        let NameHit { usage, match_type } = hit;
        let rank_sim = score::rank_similarity(rank, usage.rank);
        let status = score::status_score(usage.status);
        let mut notes = Vec::new();

        let total = match mode {
            Mode::Fuzzy => {
                let name_sim = score::name_similarity(
                    &self.similarity,
                    query_name_type,
                    canonical,
                    &usage.canonical_name,
                );
                let author_sim = self.author_similarity(authorship, parsed, &usage);
                let class_sim = score::classification_similarity(classification, &usage);
                let unlikely = score::fuzzy_match_unlikelihood(canonical, match_type, rank);
                notes.push(Note::NameSimilarity(name_sim));
                notes.push(Note::AuthorshipSimilarity(author_sim));
                notes.push(Note::ClassificationSimilarity(class_sim));
                notes.push(Note::RankSimilarity(rank_sim));
                notes.push(Note::StatusScore(status));
                if unlikely != 0 {
                    notes.push(Note::FuzzyMatchUnlikely(unlikely));
                }
                name_sim
                    + score::inc_neg_score(author_sim * 2, 2)
                    + class_sim
                    + rank_sim
                    + status
                    + unlikely
            }
            Mode::Strict => {
                let name_sim = score::name_similarity(
                    &self.similarity,
                    query_name_type,
                    canonical,
                    &usage.canonical_name,
                );
                let author_sim = self.author_similarity(authorship, parsed, &usage);
                let kingdom_sim = score::kingdom_similarity(
                    to_kingdom(classification.kingdom.as_deref()),
                    to_kingdom(usage.kingdom.as_deref()),
                );
                notes.push(Note::NameSimilarity(name_sim));
                notes.push(Note::AuthorshipSimilarity(author_sim));
                notes.push(Note::KingdomSimilarity(kingdom_sim));
                notes.push(Note::RankSimilarity(rank_sim));
                notes.push(Note::StatusScore(status));
                name_sim
                    + score::inc_neg_score(author_sim * 4, 8)
                    + score::inc_neg_score(kingdom_sim, 10)
                    + score::inc_neg_score(rank_sim, 10)
                    + status
            }
            Mode::Higher => {
                let name_sim =
                    score::name_similarity(&self.similarity, None, canonical, &usage.canonical_name);
                let class_sim = score::classification_similarity(classification, &usage);
                notes.push(Note::NameSimilarity(name_sim));
                notes.push(Note::ClassificationSimilarity(class_sim));
                notes.push(Note::RankSimilarity(rank_sim));
                notes.push(Note::StatusScore(status));
                name_sim + class_sim + rank_sim * 2 + status
            }
        };
        if verbose {
            notes.push(Note::Score(total));
        }

        Candidate {
            usage,
            match_type,
            confidence: total,
            notes,
        }
    }

    /// Authorship agreement, -12..8. The candidate's authorship atoms come
    /// from parsing its name; recombination and basionym authors are
    /// compared pairwise, with a cross check when the basionym side of
    /// either name is unknown.
    fn author_similarity(
        &self,
        authorship: Option<&str>,
        parsed: Option<&ParsedName>,
        usage: &TaxonUsage,
    ) -> i32 {
        let query = match parsed {
            Some(pn) if pn.authorship.is_some() || pn.bracket_authorship.is_some() => pn.clone(),
            _ => {
                let Some(raw) = authorship else { return 0 };
                let mut pn = ParsedName::default();
                let full = format!("Q q {raw}");
                if let Ok(p) = self.parser.parse(&full, None) {
                    pn.authorship = p.authorship;
                    pn.year = p.year;
                    pn.bracket_authorship = p.bracket_authorship;
                    pn.bracket_year = p.bracket_year;
                }
                pn
            }
        };
        if query.authorship.is_none() && query.year.is_none() && query.bracket_authorship.is_none()
        {
            return 0;
        }

        let full = match &usage.authorship {
            Some(a) if !usage.canonical_name.is_empty() => {
                format!("{} {}", usage.canonical_name, a)
            }
            _ => usage.scientific_name.clone(),
        };
        let Ok(mpn) = self.parser.parse(&full, None) else {
            return 0;
        };

        let mut total = 0;
        let recomb = self.authors.compare(
            query.authorship.as_deref(),
            query.year.as_deref(),
            mpn.authorship.as_deref(),
            mpn.year.as_deref(),
        );
        let mut bracket = self.authors.compare(
            query.bracket_authorship.as_deref(),
            query.bracket_year.as_deref(),
            mpn.bracket_authorship.as_deref(),
            mpn.bracket_year.as_deref(),
        );
        if bracket == backbone_types::Equality::Unknown {
            // one side lacks basionym authors, compare across to the other
            // side's combination authors at a small discount
            let cross = if query.bracket_authorship.is_some() && mpn.bracket_authorship.is_none() {
                self.authors.compare(
                    query.bracket_authorship.as_deref(),
                    query.bracket_year.as_deref(),
                    mpn.authorship.as_deref(),
                    mpn.year.as_deref(),
                )
            } else if mpn.bracket_authorship.is_some() && query.bracket_authorship.is_none() {
                self.authors.compare(
                    query.authorship.as_deref(),
                    query.year.as_deref(),
                    mpn.bracket_authorship.as_deref(),
                    mpn.bracket_year.as_deref(),
                )
            } else {
                backbone_types::Equality::Unknown
            };
            match cross {
                backbone_types::Equality::Equal => total -= 1,
                backbone_types::Equality::Different => total += 1,
                backbone_types::Equality::Unknown => {}
            }
            bracket = cross;
        }
        total + equality_to_similarity(recomb, 3) + equality_to_similarity(bracket, 1)
    }

    /// Picks the winning candidate or reports why none can be chosen.
    fn select(
        &self,
        canonical: &str,
        mode: Mode,
        mut candidates: Vec<Candidate>,
        verbose: bool,
    ) -> Result<MatchResult, MatchError> {
        if candidates.is_empty() {
            return Ok(MatchResult::none(100, Vec::new(), Vec::new()));
        }
        candidates.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.usage.scientific_name.cmp(&b.usage.scientific_name))
        });
        let min = if mode == Mode::Higher {
            MIN_CONFIDENCE_FOR_HIGHER_MATCHES
        } else {
            MIN_CONFIDENCE
        };

        let mut selection_notes = Vec::new();
        let mut best_idx = 0;
        if candidates.len() > 1 {
            let tie = candidates[0].confidence == candidates[1].confidence;
            let ambiguous =
                similar_but_span_rank(&candidates, MIN_CONFIDENCE_ACROSS_RANKS, Rank::Class);
            if tie || ambiguous {
                let threshold = if ambiguous { MIN_CONFIDENCE_ACROSS_RANKS } else { 0 };
                let best_conf = candidates[0].confidence;
                let interesting: Vec<usize> = (0..candidates.len())
                    .filter(|&i| best_conf - candidates[i].confidence <= threshold)
                    .collect();
                let all_equal = interesting.iter().all(|&i| {
                    equal_classification(&candidates[0].usage, &candidates[i].usage, Rank::Species)
                });
                if all_equal {
                    // synonym homonyms of one taxon, pick deterministically
                    best_idx = interesting
                        .iter()
                        .copied()
                        .min_by(|&a, &b| candidates[a].usage.id.cmp(&candidates[b].usage.id))
                        .unwrap_or(0);
                    selection_notes.push(Note::SynonymHomonyms(interesting.len()));
                } else {
                    let of_interest: Vec<&Candidate> =
                        interesting.iter().map(|&i| &candidates[i]).collect();
                    if let Some(usage) = self.match_lowest_denominator(&of_interest)? {
                        let confidence = score::norm_confidence(candidates[0].confidence);
                        let alternatives = if verbose {
                            normalize_alternatives(candidates)
                        } else {
                            Vec::new()
                        };
                        // a shared ancestor is only worth returning when the
                        // cluster itself scored well enough to accept
                        if confidence < min {
                            return Ok(MatchResult::none(
                                99,
                                vec![Note::TooLittleConfidence],
                                alternatives,
                            ));
                        }
                        return Ok(MatchResult {
                            usage: Some(usage),
                            match_type: MatchType::HigherRank,
                            confidence,
                            notes: selection_notes,
                            alternatives,
                        });
                    }
                    let note = if ambiguous {
                        Note::NoLowestDenominator(canonical.to_string())
                    } else {
                        Note::MultipleEqualMatches(canonical.to_string())
                    };
                    let alternatives = if verbose {
                        normalize_alternatives(candidates)
                    } else {
                        Vec::new()
                    };
                    return Ok(MatchResult::none(99, vec![note], alternatives));
                }
            }
        }

        let next_boost = if candidates.len() == 1 {
            selection_notes.push(Note::SingleMatchBoost(5));
            5
        } else {
            let second = if best_idx == 0 { 1 } else { 0 };
            let d = ((candidates[best_idx].confidence - candidates[second].confidence) / 2)
                .clamp(0, 5);
            selection_notes.push(Note::NextMatchBoost(d));
            d
        };

        let best = candidates.swap_remove(best_idx);
        let confidence = score::norm_confidence(best.confidence + next_boost);

        if confidence < min {
            let alternatives = if verbose {
                let mut all = candidates;
                all.push(best);
                all.sort_by(|a, b| b.confidence.cmp(&a.confidence));
                normalize_alternatives(all)
            } else {
                Vec::new()
            };
            return Ok(MatchResult::none(99, vec![Note::TooLittleConfidence], alternatives));
        }

        let mut notes = best.notes;
        notes.extend(selection_notes);
        let alternatives = if verbose {
            candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));
            normalize_alternatives(candidates)
        } else {
            Vec::new()
        };
        Ok(MatchResult {
            usage: Some(best.usage),
            match_type: best.match_type,
            confidence,
            notes,
            alternatives,
        })
    }

    /// Resolves equally good but differently classified candidates to their
    /// lowest shared ancestor, if they have one.
    fn match_lowest_denominator(
        &self,
        candidates: &[&Candidate],
    ) -> Result<Option<TaxonUsage>, MatchError> {
        for rank in backbone_types::DWC_RANKS.iter().rev() {
            let mut keys = candidates
                .iter()
                .map(|c| c.usage.higher_rank_key(*rank));
            let Some(Some(first)) = keys.next() else {
                continue;
            };
            if keys.all(|k| k == Some(first)) {
                return Ok(self.index.match_by_usage_id(first)?);
            }
        }
        Ok(None)
    }

    /// Walks the Linnean ranks above genus and reports whether the first
    /// rank both the query classification and the candidate know about
    /// disagrees.
    fn next_above_genus_differs(
        &self,
        classification: &Classification,
        usage: &TaxonUsage,
    ) -> bool {
        let mut rank = Rank::Genus.next_higher_linnean_rank();
        while let Some(r) = rank {
            if let (Some(q), Some(m)) = (classification.get(r), usage.higher_rank(r)) {
                return norm(q) != norm(m);
            }
            rank = r.next_higher_linnean_rank();
        }
        false
    }
}

fn equality_to_similarity(eq: backbone_types::Equality, factor: i32) -> i32 {
    match eq {
        backbone_types::Equality::Equal => 2 * factor,
        backbone_types::Equality::Different => -3 * factor,
        backbone_types::Equality::Unknown => 0,
    }
}

/// Id that put this candidate inside an excluded subtree, if any.
fn excluded_id(usage: &TaxonUsage, exclude: &HashSet<String>) -> Option<String> {
    if exclude.is_empty() {
        return None;
    }
    if exclude.contains(&usage.id) {
        return Some(usage.id.clone());
    }
    usage
        .classification
        .iter()
        .find(|e| exclude.contains(&e.id))
        .map(|e| e.id.clone())
}

/// True when the top candidates are as good as each other but sit in
/// conflicting classifications at or above the given rank.
fn similar_but_span_rank(candidates: &[Candidate], max_diff: i32, rank: Rank) -> bool {
    let best = candidates[0].confidence;
    let close: Vec<&Candidate> = candidates
        .iter()
        .take_while(|c| best - c.confidence <= max_diff)
        .collect();
    if close.len() < 2 {
        return false;
    }
    close
        .iter()
        .skip(1)
        .any(|c| !equal_classification(&close[0].usage, &c.usage, rank))
}

/// Compares the Linnean classification of two usages from kingdom down,
/// stopping above ranks below `stop`.
fn equal_classification(a: &TaxonUsage, b: &TaxonUsage, stop: Rank) -> bool {
    for r in LINNEAN_RANKS {
        if stop.higher_than(r) {
            break;
        }
        match (a.higher_rank(r), b.higher_rank(r)) {
            (None, None) => {}
            (Some(x), Some(y)) if norm(x) == norm(y) => {}
            _ => return false,
        }
    }
    true
}

/// Promotes a higher-rank fallback, carrying the original attempt's
/// candidates along as alternatives.
fn higher_match(mut higher: MatchResult, original: MatchResult) -> MatchResult {
    higher.match_type = MatchType::HigherRank;
    let self_id = higher.usage.as_ref().map(|u| u.id.clone());
    let mut seen: HashSet<String> = higher
        .alternatives
        .iter()
        .map(|c| c.usage.id.clone())
        .collect();
    for alt in original.alternatives {
        if Some(&alt.usage.id) == self_id.as_ref() || !seen.insert(alt.usage.id.clone()) {
            continue;
        }
        higher.alternatives.push(alt);
    }
    higher
        .alternatives
        .retain(|c| Some(&c.usage.id) != self_id.as_ref());
    higher
}

/// Alternatives report normalized confidence like the main result.
fn normalize_alternatives(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    for c in &mut candidates {
        c.confidence = score::norm_confidence(c.confidence);
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use backbone_types::{ClassificationEntry, TaxonomicStatus};

    fn usage(id: &str, canonical: &str, rank: Rank) -> TaxonUsage {
        TaxonUsage {
            id: id.into(),
            scientific_name: canonical.into(),
            canonical_name: canonical.into(),
            rank: Some(rank),
            status: TaxonomicStatus::Accepted,
            ..TaxonUsage::default()
        }
    }

    fn candidate(id: &str, canonical: &str, confidence: i32) -> Candidate {
        Candidate {
            usage: usage(id, canonical, Rank::Species),
            match_type: MatchType::Exact,
            confidence,
            notes: Vec::new(),
        }
    }

    #[test]
    fn excluded_id_checks_classification() {
        let mut u = usage("9", "Puma concolor", Rank::Species);
        u.classification.push(ClassificationEntry {
            id: "3".into(),
            scientific_name: "Felidae".into(),
            authorship: None,
            rank: "family".into(),
            status: TaxonomicStatus::Accepted,
            extinct: false,
        });
        let exclude: HashSet<String> = ["3".to_string()].into();
        assert_eq!(excluded_id(&u, &exclude), Some("3".to_string()));

        let direct: HashSet<String> = ["9".to_string()].into();
        assert_eq!(excluded_id(&u, &direct), Some("9".to_string()));

        let miss: HashSet<String> = ["42".to_string()].into();
        assert_eq!(excluded_id(&u, &miss), None);
    }

    #[test]
    fn equal_classification_stops_at_rank() {
        let mut a = usage("1", "Puma concolor", Rank::Species);
        let mut b = usage("2", "Puma concolor", Rank::Species);
        a.kingdom = Some("Animalia".into());
        b.kingdom = Some("Animalia".into());
        a.genus = Some("Puma".into());
        b.genus = Some("Felis".into());
        // comparing only down to class ignores the genus conflict
        assert!(equal_classification(&a, &b, Rank::Class));
        assert!(!equal_classification(&a, &b, Rank::Species));
    }

    #[test]
    fn span_rank_detects_class_conflicts() {
        let mut a = candidate("1", "Oenanthe", 90);
        let mut b = candidate("2", "Oenanthe", 90);
        a.usage.class = Some("Aves".into());
        b.usage.class = Some("Magnoliopsida".into());
        assert!(similar_but_span_rank(&[a.clone(), b.clone()], 1, Rank::Class));

        b.usage.class = Some("Aves".into());
        assert!(!similar_but_span_rank(&[a.clone(), b.clone()], 1, Rank::Class));

        // a clearly worse second candidate is not ambiguous
        b.usage.class = Some("Magnoliopsida".into());
        b.confidence = 70;
        assert!(!similar_but_span_rank(&[a, b], 1, Rank::Class));
    }

    #[test]
    fn higher_match_merges_alternatives() {
        let higher = MatchResult {
            usage: Some(usage("10", "Puma", Rank::Genus)),
            match_type: MatchType::Exact,
            confidence: 95,
            notes: Vec::new(),
            alternatives: vec![candidate("11", "Pumana", 60)],
        };
        let original = MatchResult::none(
            99,
            Vec::new(),
            vec![candidate("10", "Puma concolor", 70), candidate("12", "Puma concolar", 65)],
        );
        let merged = higher_match(higher, original);
        assert_eq!(merged.match_type, MatchType::HigherRank);
        let ids: Vec<&str> = merged
            .alternatives
            .iter()
            .map(|c| c.usage.id.as_str())
            .collect();
        assert_eq!(ids, vec!["11", "12"]);
    }
}
