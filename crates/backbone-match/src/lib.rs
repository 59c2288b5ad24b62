//! Fuzzy match engine over the taxon index.
//!
//! Resolves a scientific name, optionally with authorship, a stated rank and
//! a higher-classification context, to exactly one backbone usage or to an
//! explicit no-match. Candidate retrieval lives in `backbone-index`; this
//! crate owns input cleaning, name assembly, the scoring pipeline, the
//! tie-break and escalation logic, and the projection of a match into the
//! synonym-resolved API view.
//!
//! The engine is generic over three capabilities (name parsing, authorship
//! comparison, string similarity) and ships workable defaults for all three.

mod authorship;
mod clean;
mod engine;
mod higher;
mod notes;
mod parser;
mod project;
mod score;
mod similarity;

pub use authorship::DefaultAuthorComparator;
pub use clean::{NameAndRank, assemble_name, clean};
pub use engine::{Candidate, MatchEngine, MatchError, MatchQuery, MatchResult};
pub use notes::{Note, render_notes};
pub use parser::DefaultNameParser;
pub use project::{Diagnostics, Match2, RankedName, label, label_html, project, ranked};
pub use similarity::JaroWinklerSimilarity;
