//! Shared vocabulary and data model for backbone taxonomy matching.
//!
//! The crate holds the rank/status enums used throughout the index and the
//! matching pipeline, the denormalized [`TaxonUsage`] view of an indexed
//! checklist record, the [`Classification`] context callers can pass along
//! with a query, and the pluggable capability contracts ([`NameParser`],
//! [`AuthorComparator`], [`NameSimilarity`]) the match engine is built
//! against.
//!
//! Rank ordinals are load-bearing: [`Rank`] variants are declared from the
//! highest rank down to [`Rank::Unranked`], and rank distance scoring relies
//! on that declaration order. Ordinals are never persisted across releases,
//! so reordering is safe as long as index and service are rebuilt together.

mod rank;
mod traits;
mod usage;

pub use rank::{DWC_RANKS, LINNEAN_RANKS, Rank};
pub use traits::{AuthorComparator, NameParser, NameSimilarity, ParsedName, UnparsableName};
pub use usage::{
    Classification, ClassificationEntry, Equality, Kingdom, MatchType, NameType, TaxonUsage,
    TaxonomicStatus,
};
