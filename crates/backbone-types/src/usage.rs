use serde::{Deserialize, Serialize};

use crate::rank::Rank;

/// Taxonomic status reduced to the three values the index stores.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxonomicStatus {
    Accepted,
    #[default]
    Doubtful,
    Synonym,
}

impl TaxonomicStatus {
    /// Parse the verbatim checklist status column. Anything that is not a
    /// plain accepted or synonym entry counts as doubtful.
    pub fn parse(value: &str) -> TaxonomicStatus {
        match value.trim() {
            "accepted" => TaxonomicStatus::Accepted,
            "synonym" => TaxonomicStatus::Synonym,
            _ => TaxonomicStatus::Doubtful,
        }
    }

    pub fn is_synonym(self) -> bool {
        self == TaxonomicStatus::Synonym
    }
}

/// The kingdoms of the backbone, plus incertae sedis for the root.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kingdom {
    IncertaeSedis,
    Animalia,
    Archaea,
    Bacteria,
    Chromista,
    Fungi,
    Plantae,
    Protozoa,
    Viruses,
}

impl Kingdom {
    pub fn parse(value: &str) -> Option<Kingdom> {
        let kingdom = match value.trim().to_ascii_lowercase().as_str() {
            "incertae sedis" => Kingdom::IncertaeSedis,
            "animalia" | "metazoa" => Kingdom::Animalia,
            "archaea" => Kingdom::Archaea,
            "bacteria" => Kingdom::Bacteria,
            "chromista" => Kingdom::Chromista,
            "fungi" => Kingdom::Fungi,
            "plantae" | "viridiplantae" => Kingdom::Plantae,
            "protozoa" => Kingdom::Protozoa,
            "viruses" | "virus" => Kingdom::Viruses,
            _ => return None,
        };
        Some(kingdom)
    }
}

/// Broad category a name string falls into, as detected by the name parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameType {
    Scientific,
    Virus,
    Hybrid,
    Otu,
    Cultivar,
    Candidatus,
    Informal,
    Doubtful,
    Placeholder,
    NoName,
}

impl NameType {
    /// Whether the parser can produce atomized parts for names of this type.
    pub fn is_parsable(self) -> bool {
        !matches!(
            self,
            NameType::Virus | NameType::Hybrid | NameType::Otu | NameType::Placeholder
                | NameType::NoName
        )
    }
}

/// How a usage was matched against the query.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "EXACT")]
    Exact,
    #[serde(rename = "FUZZY")]
    Fuzzy,
    #[serde(rename = "HIGHERRANK")]
    HigherRank,
    #[serde(rename = "NONE")]
    None,
}

/// Trivalent outcome of an authorship comparison.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Equality {
    Equal,
    Different,
    Unknown,
}

/// One ancestor of an indexed usage, stored denormalized with the usage.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEntry {
    pub id: String,
    #[serde(rename = "scientificName")]
    pub scientific_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<String>,
    /// Verbatim rank string from the checklist, e.g. "class" or "tribe".
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub status: TaxonomicStatus,
    #[serde(default)]
    pub extinct: bool,
}

impl ClassificationEntry {
    pub fn parsed_rank(&self) -> Option<Rank> {
        Rank::parse(&self.rank)
    }
}

/// Denormalized view of one indexed name usage: the record itself, shortcut
/// fields for the major Linnean ancestors and the full ancestor set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonUsage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub scientific_name: String,
    pub canonical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
    pub status: TaxonomicStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_epithet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_status: Option<String>,
    #[serde(default)]
    pub extinct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kingdom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phylum: Option<String>,
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgenus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    /// All ancestors, unordered. Ordering is always derived by rank lookup.
    #[serde(default)]
    pub classification: Vec<ClassificationEntry>,
}

impl TaxonUsage {
    /// Shortcut-field lookup for the major Linnean ranks plus subgenus.
    pub fn higher_rank(&self, rank: Rank) -> Option<&str> {
        let value = match rank {
            Rank::Kingdom => &self.kingdom,
            Rank::Phylum => &self.phylum,
            Rank::Class => &self.class,
            Rank::Order => &self.order,
            Rank::Family => &self.family,
            Rank::Genus => &self.genus,
            Rank::Subgenus => &self.subgenus,
            Rank::Species => &self.species,
            _ => &None,
        };
        value.as_deref()
    }

    /// Id of the ancestor at the given rank, if present in the classification.
    pub fn higher_rank_key(&self, rank: Rank) -> Option<&str> {
        self.classification
            .iter()
            .find(|e| e.parsed_rank() == Some(rank))
            .map(|e| e.id.as_str())
    }
}

/// Higher classification context a caller can send along with a query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kingdom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phylum: Option<String>,
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgenus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
}

impl Classification {
    pub fn get(&self, rank: Rank) -> Option<&str> {
        let value = match rank {
            Rank::Kingdom => &self.kingdom,
            Rank::Phylum => &self.phylum,
            Rank::Class => &self.class,
            Rank::Order => &self.order,
            Rank::Family => &self.family,
            Rank::Genus => &self.genus,
            Rank::Subgenus => &self.subgenus,
            Rank::Species => &self.species,
            _ => &None,
        };
        value.as_deref()
    }

    pub fn set(&mut self, rank: Rank, value: Option<String>) {
        match rank {
            Rank::Kingdom => self.kingdom = value,
            Rank::Phylum => self.phylum = value,
            Rank::Class => self.class = value,
            Rank::Order => self.order = value,
            Rank::Family => self.family = value,
            Rank::Genus => self.genus = value,
            Rank::Subgenus => self.subgenus = value,
            Rank::Species => self.species = value,
            _ => {}
        }
    }
}
