//! Taxon index over a checklist export.
//!
//! The index is built once at startup from a `NameUsage.tsv` inside a zipped
//! checklist archive and then opened read-only. It preselects candidate
//! usages for the match engine: by id, by canonical name (exact or within a
//! bounded edit distance) and by canonical-name prefix for auto-complete.
//!
//! Every document stores the full denormalized [`backbone_types::TaxonUsage`]
//! so a hit never needs a second lookup.

mod builder;
mod error;
mod index;
mod normalize;
mod schema;

pub use builder::{BuildStats, build_index};
pub use error::IndexError;
pub use index::{MAX_CANDIDATES, NameHit, TaxonIndex, filter_species_aggregate};
pub use normalize::normalize;
