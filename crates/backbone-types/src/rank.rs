use std::fmt;

use serde::{Deserialize, Serialize};

/// Taxonomic rank, declared from the highest rank down to [`Rank::Unranked`].
///
/// The declaration order doubles as an ordinal scale: rank distance scoring
/// subtracts ordinals, so the in-between ranks (legions, cohorts, the
/// infrasubspecific zoo) must keep their relative positions. Ordinals are
/// only ever stored inside a freshly built index, never across releases.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    Domain,
    Superkingdom,
    Kingdom,
    Subkingdom,
    Infrakingdom,
    Superphylum,
    Phylum,
    Subphylum,
    Infraphylum,
    Superclass,
    Class,
    Subclass,
    Infraclass,
    Parvclass,
    Superlegion,
    Legion,
    Sublegion,
    Infralegion,
    Supercohort,
    Cohort,
    Subcohort,
    Infracohort,
    Magnorder,
    Superorder,
    Grandorder,
    Order,
    Suborder,
    Infraorder,
    Parvorder,
    Superfamily,
    Family,
    Subfamily,
    Infrafamily,
    Supertribe,
    Tribe,
    Subtribe,
    Infratribe,
    SupragenericName,
    Genus,
    Subgenus,
    Infragenus,
    Section,
    Subsection,
    Series,
    Subseries,
    InfragenericName,
    SpeciesAggregate,
    Species,
    InfraspecificName,
    Grex,
    Subspecies,
    CultivarGroup,
    Convariety,
    InfrasubspecificName,
    Proles,
    Race,
    Natio,
    Aberration,
    Morph,
    Variety,
    Subvariety,
    Form,
    Subform,
    Pathovar,
    Biovar,
    Chemovar,
    Morphovar,
    Phagovar,
    Serovar,
    Chemoform,
    FormaSpecialis,
    Cultivar,
    Strain,
    Other,
    Unranked,
}

/// The seven major Linnean ranks, highest first.
pub const LINNEAN_RANKS: [Rank; 7] = [
    Rank::Kingdom,
    Rank::Phylum,
    Rank::Class,
    Rank::Order,
    Rank::Family,
    Rank::Genus,
    Rank::Species,
];

/// The DarwinCore ranks, identical to the Linnean set.
pub const DWC_RANKS: [Rank; 7] = LINNEAN_RANKS;

impl Rank {
    /// Position in the declaration order, used for rank distance scoring.
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    /// Parse a verbatim rank string, case insensitive, spaces allowed in
    /// place of underscores. Also accepts the common latin rank markers.
    pub fn parse(value: &str) -> Option<Rank> {
        let norm = value
            .trim()
            .trim_end_matches('.')
            .to_ascii_uppercase()
            .replace([' ', '-'], "_");
        let rank = match norm.as_str() {
            "DOMAIN" | "SUPERREGNUM" => Rank::Domain,
            "SUPERKINGDOM" => Rank::Superkingdom,
            "KINGDOM" | "REGNUM" => Rank::Kingdom,
            "SUBKINGDOM" => Rank::Subkingdom,
            "INFRAKINGDOM" => Rank::Infrakingdom,
            "SUPERPHYLUM" => Rank::Superphylum,
            "PHYLUM" | "DIVISION" => Rank::Phylum,
            "SUBPHYLUM" => Rank::Subphylum,
            "INFRAPHYLUM" => Rank::Infraphylum,
            "SUPERCLASS" => Rank::Superclass,
            "CLASS" | "CLASSIS" => Rank::Class,
            "SUBCLASS" => Rank::Subclass,
            "INFRACLASS" => Rank::Infraclass,
            "PARVCLASS" => Rank::Parvclass,
            "SUPERLEGION" => Rank::Superlegion,
            "LEGION" => Rank::Legion,
            "SUBLEGION" => Rank::Sublegion,
            "INFRALEGION" => Rank::Infralegion,
            "SUPERCOHORT" => Rank::Supercohort,
            "COHORT" => Rank::Cohort,
            "SUBCOHORT" => Rank::Subcohort,
            "INFRACOHORT" => Rank::Infracohort,
            "MAGNORDER" => Rank::Magnorder,
            "SUPERORDER" => Rank::Superorder,
            "GRANDORDER" => Rank::Grandorder,
            "ORDER" | "ORDO" => Rank::Order,
            "SUBORDER" => Rank::Suborder,
            "INFRAORDER" => Rank::Infraorder,
            "PARVORDER" => Rank::Parvorder,
            "SUPERFAMILY" => Rank::Superfamily,
            "FAMILY" | "FAMILIA" => Rank::Family,
            "SUBFAMILY" => Rank::Subfamily,
            "INFRAFAMILY" => Rank::Infrafamily,
            "SUPERTRIBE" => Rank::Supertribe,
            "TRIBE" | "TRIBUS" => Rank::Tribe,
            "SUBTRIBE" => Rank::Subtribe,
            "INFRATRIBE" => Rank::Infratribe,
            "SUPRAGENERIC_NAME" => Rank::SupragenericName,
            "GENUS" | "GEN" => Rank::Genus,
            "SUBGENUS" | "SUBGEN" | "SUBG" => Rank::Subgenus,
            "INFRAGENUS" => Rank::Infragenus,
            "SECTION" | "SECT" => Rank::Section,
            "SUBSECTION" => Rank::Subsection,
            "SERIES" | "SER" => Rank::Series,
            "SUBSERIES" => Rank::Subseries,
            "INFRAGENERIC_NAME" => Rank::InfragenericName,
            "SPECIES_AGGREGATE" | "AGG" | "AGGREGATE" => Rank::SpeciesAggregate,
            "SPECIES" | "SP" | "SPEC" => Rank::Species,
            "INFRASPECIFIC_NAME" => Rank::InfraspecificName,
            "GREX" | "GX" => Rank::Grex,
            "SUBSPECIES" | "SUBSP" | "SSP" => Rank::Subspecies,
            "CULTIVAR_GROUP" => Rank::CultivarGroup,
            "CONVARIETY" | "CONVAR" => Rank::Convariety,
            "INFRASUBSPECIFIC_NAME" => Rank::InfrasubspecificName,
            "PROLES" => Rank::Proles,
            "RACE" => Rank::Race,
            "NATIO" => Rank::Natio,
            "ABERRATION" | "AB" => Rank::Aberration,
            "MORPH" => Rank::Morph,
            "VARIETY" | "VARIETAS" | "VAR" => Rank::Variety,
            "SUBVARIETY" | "SUBVAR" => Rank::Subvariety,
            "FORM" | "FORMA" | "F" => Rank::Form,
            "SUBFORM" | "SUBF" => Rank::Subform,
            "PATHOVAR" | "PV" => Rank::Pathovar,
            "BIOVAR" => Rank::Biovar,
            "CHEMOVAR" => Rank::Chemovar,
            "MORPHOVAR" => Rank::Morphovar,
            "PHAGOVAR" => Rank::Phagovar,
            "SEROVAR" => Rank::Serovar,
            "CHEMOFORM" => Rank::Chemoform,
            "FORMA_SPECIALIS" | "F_SP" => Rank::FormaSpecialis,
            "CULTIVAR" | "CV" => Rank::Cultivar,
            "STRAIN" => Rank::Strain,
            "OTHER" => Rank::Other,
            "UNRANKED" => Rank::Unranked,
            _ => return None,
        };
        Some(rank)
    }

    /// Reconstruct a rank from a stored ordinal. The index stores ordinals,
    /// so this only has to round-trip values produced by [`Rank::ordinal`].
    pub fn from_ordinal(ordinal: i32) -> Option<Rank> {
        ALL_RANKS.get(usize::try_from(ordinal).ok()?).copied()
    }

    pub fn not_other_or_unranked(self) -> bool {
        self != Rank::Other && self != Rank::Unranked
    }

    /// Ranks that carry no information on where exactly in the hierarchy a
    /// name sits.
    pub fn is_uncomparable(self) -> bool {
        matches!(
            self,
            Rank::InfragenericName
                | Rank::InfraspecificName
                | Rank::InfrasubspecificName
                | Rank::Other
                | Rank::Unranked
        )
    }

    /// Ranks restricted to the cultivated plant code.
    pub fn is_cultivar_code(self) -> bool {
        matches!(
            self,
            Rank::Cultivar | Rank::CultivarGroup | Rank::Convariety | Rank::Grex
        )
    }

    pub fn is_suprageneric(self) -> bool {
        self < Rank::Genus && self.not_other_or_unranked()
    }

    pub fn is_supraspecific(self) -> bool {
        self < Rank::Species && self.not_other_or_unranked()
    }

    pub fn is_species_or_below(self) -> bool {
        self >= Rank::SpeciesAggregate && self.not_other_or_unranked()
    }

    pub fn is_infrageneric(self) -> bool {
        self > Rank::Genus && self.not_other_or_unranked()
    }

    /// Infrageneric but above the species level, e.g. subgenus or section.
    pub fn is_infrageneric_strictly(self) -> bool {
        self.is_infrageneric() && self.is_supraspecific()
    }

    pub fn is_infraspecific(self) -> bool {
        self > Rank::Species && self.not_other_or_unranked()
    }

    pub fn is_infrasubspecific(self) -> bool {
        self > Rank::Subspecies && self.not_other_or_unranked()
    }

    /// True if this rank sits above `other` in the hierarchy.
    pub fn higher_than(self, other: Rank) -> bool {
        self < other
    }

    /// The closest major Linnean rank above this one, if any.
    pub fn next_higher_linnean_rank(self) -> Option<Rank> {
        if !self.not_other_or_unranked() {
            return None;
        }
        LINNEAN_RANKS
            .iter()
            .rev()
            .find(|r| **r < self)
            .copied()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // lowercase name with spaces, e.g. "species aggregate"
        let debug = format!("{self:?}");
        let mut out = String::with_capacity(debug.len() + 2);
        for (i, c) in debug.char_indices() {
            if c.is_uppercase() {
                if i > 0 {
                    out.push(' ');
                }
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        }
        f.write_str(&out)
    }
}

const ALL_RANKS: [Rank; 75] = [
    Rank::Domain,
    Rank::Superkingdom,
    Rank::Kingdom,
    Rank::Subkingdom,
    Rank::Infrakingdom,
    Rank::Superphylum,
    Rank::Phylum,
    Rank::Subphylum,
    Rank::Infraphylum,
    Rank::Superclass,
    Rank::Class,
    Rank::Subclass,
    Rank::Infraclass,
    Rank::Parvclass,
    Rank::Superlegion,
    Rank::Legion,
    Rank::Sublegion,
    Rank::Infralegion,
    Rank::Supercohort,
    Rank::Cohort,
    Rank::Subcohort,
    Rank::Infracohort,
    Rank::Magnorder,
    Rank::Superorder,
    Rank::Grandorder,
    Rank::Order,
    Rank::Suborder,
    Rank::Infraorder,
    Rank::Parvorder,
    Rank::Superfamily,
    Rank::Family,
    Rank::Subfamily,
    Rank::Infrafamily,
    Rank::Supertribe,
    Rank::Tribe,
    Rank::Subtribe,
    Rank::Infratribe,
    Rank::SupragenericName,
    Rank::Genus,
    Rank::Subgenus,
    Rank::Infragenus,
    Rank::Section,
    Rank::Subsection,
    Rank::Series,
    Rank::Subseries,
    Rank::InfragenericName,
    Rank::SpeciesAggregate,
    Rank::Species,
    Rank::InfraspecificName,
    Rank::Grex,
    Rank::Subspecies,
    Rank::CultivarGroup,
    Rank::Convariety,
    Rank::InfrasubspecificName,
    Rank::Proles,
    Rank::Race,
    Rank::Natio,
    Rank::Aberration,
    Rank::Morph,
    Rank::Variety,
    Rank::Subvariety,
    Rank::Form,
    Rank::Subform,
    Rank::Pathovar,
    Rank::Biovar,
    Rank::Chemovar,
    Rank::Morphovar,
    Rank::Phagovar,
    Rank::Serovar,
    Rank::Chemoform,
    Rank::FormaSpecialis,
    Rank::Cultivar,
    Rank::Strain,
    Rank::Other,
    Rank::Unranked,
];
