use std::path::Path;

use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::query::{FuzzyTermQuery, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, IndexReader, TantivyDocument, Term};
use tracing::{debug, info, warn};

use backbone_types::{MatchType, Rank, TaxonUsage};

use crate::error::IndexError;
use crate::normalize::normalize;
use crate::schema::{TaxonFields, fields_of};

/// Upper bound on candidates retrieved per name query.
pub const MAX_CANDIDATES: usize = 50;

/// One candidate retrieved for a name query, tagged with how the canonical
/// name related to the query string.
#[derive(Clone, Debug)]
pub struct NameHit {
    pub usage: TaxonUsage,
    pub match_type: MatchType,
}

/// Read-only lookup over a built taxon index.
///
/// Concurrent readers share one [`IndexReader`]; the index is never written
/// after [`crate::build_index`] has committed.
pub struct TaxonIndex {
    reader: IndexReader,
    fields: TaxonFields,
}

impl TaxonIndex {
    pub fn open(index_dir: &Path) -> Result<TaxonIndex, IndexError> {
        let index = Index::open_in_dir(index_dir)?;
        let fields = fields_of(&index.schema())?;
        let reader = index.reader()?;
        info!(index_dir = %index_dir.display(), docs = reader.searcher().num_docs(), "taxon index opened");
        Ok(TaxonIndex { reader, fields })
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Authoritative lookup by usage id.
    pub fn match_by_usage_id(&self, id: &str) -> Result<Option<TaxonUsage>, IndexError> {
        let searcher = self.reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(self.fields.id, id),
            IndexRecordOption::Basic,
        );
        let docs = searcher.search(&query, &TopDocs::with_limit(3))?;
        match docs.first() {
            Some((_, addr)) => {
                let doc: TantivyDocument = searcher.doc(*addr)?;
                Ok(Some(self.usage_of(&doc)?))
            }
            None => {
                warn!(id, "no usage found in taxon index");
                Ok(None)
            }
        }
    }

    /// Retrieve candidates for a canonical name, exact or fuzzy.
    ///
    /// The query is normalized with the same pipeline the builder used. A
    /// fuzzy lookup allows two edits for names longer than ten characters,
    /// one otherwise; if the fuzzy query itself fails, one exact retry is
    /// made before giving up. Hits whose canonical name equals the query
    /// case-insensitively are tagged [`MatchType::Exact`], everything else
    /// [`MatchType::Fuzzy`].
    pub fn match_by_name(
        &self,
        name: &str,
        fuzzy: bool,
        max_matches: usize,
    ) -> Result<Vec<NameHit>, IndexError> {
        let analyzed = normalize(name);
        debug!(query = name, analyzed, fuzzy, "name lookup");

        // queries need at least 2 characters to match a real name
        if analyzed.chars().count() < 2 {
            return Ok(Vec::new());
        }

        let term = Term::from_field_text(self.fields.canonical, &analyzed);
        if fuzzy {
            let distance = if analyzed.chars().count() > 10 { 2 } else { 1 };
            let query = FuzzyTermQuery::new(term.clone(), distance, true);
            match self.search_hits(&query, name, max_matches) {
                Ok(hits) => return Ok(hits),
                Err(e) => {
                    warn!(query = name, error = %e, "fuzzy lookup failed, retrying exact");
                }
            }
        }
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        self.search_hits(&query, name, max_matches)
    }

    /// Alphabetical canonical-name prefix scan for auto-complete.
    pub fn autocomplete(&self, prefix: &str, limit: usize) -> Result<Vec<TaxonUsage>, IndexError> {
        let analyzed = normalize(prefix);
        if analyzed.chars().count() < 2 {
            return Ok(Vec::new());
        }
        let searcher = self.reader.searcher();
        let term = Term::from_field_text(self.fields.canonical, &analyzed);
        // distance 0 turns the fuzzy prefix automaton into a plain prefix
        // query; collecting the whole doc set keeps the alphabetical cut
        // independent of doc order
        let query = FuzzyTermQuery::new_prefix(term, 0, false);
        let docs = searcher.search(&query, &DocSetCollector)?;
        let mut usages = Vec::with_capacity(docs.len());
        for addr in docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            usages.push(self.usage_of(&doc)?);
        }
        usages.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
        usages.truncate(limit);
        Ok(usages)
    }

    fn search_hits(
        &self,
        query: &dyn Query,
        name: &str,
        max_matches: usize,
    ) -> Result<Vec<NameHit>, IndexError> {
        let searcher = self.reader.searcher();
        let docs = searcher.search(query, &TopDocs::with_limit(max_matches))?;
        let mut hits = Vec::with_capacity(docs.len());
        let name_lower = name.to_lowercase();
        for (_, addr) in docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let usage = self.usage_of(&doc)?;
            let match_type = if name_lower == usage.canonical_name.to_lowercase() {
                MatchType::Exact
            } else {
                // even a term query can surface this because indexed terms
                // are aggressively normalized
                MatchType::Fuzzy
            };
            hits.push(NameHit { usage, match_type });
        }
        if hits.is_empty() {
            debug!(query = name, "no name match");
        }
        Ok(hits)
    }

    fn usage_of(&self, doc: &TantivyDocument) -> Result<TaxonUsage, IndexError> {
        let payload = doc
            .get_first(self.fields.usage)
            .and_then(|v| v.as_str())
            .unwrap_or("");
        Ok(serde_json::from_str(payload)?)
    }
}

/// Drop exact hits that resolve a species-aggregate query to a non-aggregate
/// usage; if any were dropped, fuzzy hits go too so the engine escalates to
/// a higher-rank match instead.
pub fn filter_species_aggregate(query_rank: Option<Rank>, hits: &mut Vec<NameHit>) {
    if query_rank != Some(Rank::SpeciesAggregate) {
        return;
    }
    let before = hits.len();
    hits.retain(|hit| {
        let keep = !(hit.match_type == MatchType::Exact
            && hit.usage.rank != Some(Rank::SpeciesAggregate));
        if !keep {
            info!(
                rank = ?hit.usage.rank,
                name = hit.usage.scientific_name,
                "species aggregate query hit a non-aggregate, preferring higher matches"
            );
        }
        keep
    });
    if hits.len() < before {
        hits.retain(|hit| {
            let keep = hit.match_type != MatchType::Fuzzy;
            if !keep {
                info!(
                    name = hit.usage.scientific_name,
                    "dropping fuzzy hit alongside species aggregate mismatch"
                );
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backbone_types::TaxonomicStatus;

    fn hit(rank: Rank, match_type: MatchType, name: &str) -> NameHit {
        NameHit {
            usage: TaxonUsage {
                id: name.to_string(),
                scientific_name: name.to_string(),
                canonical_name: name.to_string(),
                rank: Some(rank),
                status: TaxonomicStatus::Accepted,
                ..TaxonUsage::default()
            },
            match_type,
        }
    }

    #[test]
    fn aggregate_filter_only_applies_to_aggregate_queries() {
        let mut hits = vec![hit(Rank::Species, MatchType::Exact, "Puma concolor")];
        filter_species_aggregate(Some(Rank::Species), &mut hits);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn aggregate_filter_drops_exact_non_aggregates_and_fuzzies() {
        let mut hits = vec![
            hit(Rank::Species, MatchType::Exact, "Puma concolor"),
            hit(Rank::SpeciesAggregate, MatchType::Exact, "Puma concolor"),
            hit(Rank::Species, MatchType::Fuzzy, "Puma concolar"),
        ];
        filter_species_aggregate(Some(Rank::SpeciesAggregate), &mut hits);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].usage.rank, Some(Rank::SpeciesAggregate));
    }

    #[test]
    fn aggregate_filter_keeps_fuzzies_when_nothing_dropped() {
        let mut hits = vec![
            hit(Rank::SpeciesAggregate, MatchType::Exact, "Puma concolor"),
            hit(Rank::Species, MatchType::Fuzzy, "Puma concolar"),
        ];
        filter_species_aggregate(Some(Rank::SpeciesAggregate), &mut hits);
        assert_eq!(hits.len(), 2);
    }
}
