use std::fmt;

/// Structured diagnostic attached to a match result.
///
/// Notes stay structured inside the engine and are only rendered into the
/// single "; "-joined diagnostic string at the response boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Note {
    UsageKeyIgnoredNames,
    NameSimilarity(i32),
    AuthorshipSimilarity(i32),
    ClassificationSimilarity(i32),
    KingdomSimilarity(i32),
    RankSimilarity(i32),
    StatusScore(i32),
    FuzzyMatchUnlikely(i32),
    Score(i32),
    SingleMatchBoost(i32),
    NextMatchBoost(i32),
    ExcludedBy(String),
    SynonymHomonyms(usize),
    MultipleEqualMatches(String),
    NoLowestDenominator(String),
    TooLittleConfidence,
    NoNameGiven,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::UsageKeyIgnoredNames => {
                write!(f, "All provided names were ignored since the usageKey was provided")
            }
            Note::NameSimilarity(v) => write!(f, "Similarity: name={v}"),
            Note::AuthorshipSimilarity(v) => write!(f, "authorship={v}"),
            Note::ClassificationSimilarity(v) => write!(f, "classification={v}"),
            Note::KingdomSimilarity(v) => write!(f, "kingdom={v}"),
            Note::RankSimilarity(v) => write!(f, "rank={v}"),
            Note::StatusScore(v) => write!(f, "status={v}"),
            Note::FuzzyMatchUnlikely(v) => write!(f, "fuzzy={v}"),
            Note::Score(v) => write!(f, "score={v}"),
            Note::SingleMatchBoost(v) => write!(f, "singleMatch={v}"),
            Note::NextMatchBoost(v) => write!(f, "nextMatch={v}"),
            Note::ExcludedBy(id) => write!(f, "excluded by {id}"),
            Note::SynonymHomonyms(n) => write!(f, "{n} synonym homonyms"),
            Note::MultipleEqualMatches(name) => write!(f, "Multiple equal matches for {name}"),
            Note::NoLowestDenominator(name) => {
                write!(f, "No lowest denominator in equal matches for {name}")
            }
            Note::TooLittleConfidence => write!(f, "No match because of too little confidence"),
            Note::NoNameGiven => write!(f, "No name given"),
        }
    }
}

/// Renders notes into the single diagnostic string of a response.
pub fn render_notes(notes: &[Note]) -> Option<String> {
    if notes.is_empty() {
        return None;
    }
    Some(
        notes
            .iter()
            .map(Note::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_breakdown_renders_joined() {
        let notes = vec![
            Note::NameSimilarity(96),
            Note::AuthorshipSimilarity(0),
            Note::ClassificationSimilarity(-2),
            Note::RankSimilarity(6),
            Note::StatusScore(1),
            Note::Score(101),
        ];
        assert_eq!(
            render_notes(&notes).as_deref(),
            Some("Similarity: name=96; authorship=0; classification=-2; rank=6; status=1; score=101")
        );
    }

    #[test]
    fn empty_notes_render_nothing() {
        assert_eq!(render_notes(&[]), None);
    }

    #[test]
    fn standalone_messages() {
        assert_eq!(
            Note::ExcludedBy("4PQWW".into()).to_string(),
            "excluded by 4PQWW"
        );
        assert_eq!(Note::SynonymHomonyms(3).to_string(), "3 synonym homonyms");
        assert_eq!(
            Note::MultipleEqualMatches("Puma concolor".into()).to_string(),
            "Multiple equal matches for Puma concolor"
        );
    }
}
