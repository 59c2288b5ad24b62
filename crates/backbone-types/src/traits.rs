use thiserror::Error;

use crate::rank::Rank;
use crate::usage::{Equality, NameType};

/// Atomized scientific name as produced by a [`NameParser`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedName {
    pub name_type: Option<NameType>,
    /// Uninomial or the genus part of a binomial.
    pub genus_or_above: Option<String>,
    /// Infrageneric epithet, e.g. a subgenus in brackets.
    pub infrageneric: Option<String>,
    pub specific_epithet: Option<String>,
    pub infraspecific_epithet: Option<String>,
    /// Rank as encoded in the name itself, e.g. by a "subsp." marker.
    pub rank: Option<Rank>,
    pub authorship: Option<String>,
    pub year: Option<String>,
    pub bracket_authorship: Option<String>,
    pub bracket_year: Option<String>,
}

impl ParsedName {
    /// Canonical name without authorship, year or indetermined markers.
    pub fn canonical_name(&self) -> Option<String> {
        let genus = self.genus_or_above.as_deref()?;
        let mut name = genus.to_string();
        if let Some(se) = &self.specific_epithet {
            name.push(' ');
            name.push_str(se);
            if let Some(ie) = &self.infraspecific_epithet {
                name.push(' ');
                name.push_str(ie);
            }
        }
        Some(name)
    }

    /// Canonical binomial, dropping any infraspecific epithet.
    pub fn canonical_species_name(&self) -> Option<String> {
        match (&self.genus_or_above, &self.specific_epithet) {
            (Some(genus), Some(se)) => Some(format!("{genus} {se}")),
            _ => None,
        }
    }
}

/// Raised for name strings that cannot be atomized, e.g. viruses, hybrid
/// formulas and OTU identifiers. The detected type is still reported so the
/// caller can adjust its matching mode.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unparsable {name_type:?} name: {name}")]
pub struct UnparsableName {
    pub name_type: NameType,
    pub name: String,
}

/// Scientific name parser capability.
///
/// Implementations turn a verbatim name string into its atomized parts, or
/// report the detected [`NameType`] when the name cannot be atomized.
pub trait NameParser: Send + Sync {
    fn parse(&self, name: &str, rank: Option<Rank>) -> Result<ParsedName, UnparsableName>;

    /// Convenience used by the index builder: canonical form, or `None` for
    /// names the parser rejects.
    fn parse_to_canonical(&self, name: &str, rank: Option<Rank>) -> Option<String> {
        self.parse(name, rank).ok().and_then(|pn| pn.canonical_name())
    }
}

/// Authorship comparison capability over author and year strings.
pub trait AuthorComparator: Send + Sync {
    fn compare(
        &self,
        author1: Option<&str>,
        year1: Option<&str>,
        author2: Option<&str>,
        year2: Option<&str>,
    ) -> Equality;
}

/// String similarity capability, scaled 0 to 100.
pub trait NameSimilarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}
