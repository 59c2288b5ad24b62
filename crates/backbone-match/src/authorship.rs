use backbone_types::{AuthorComparator, Equality};

/// Filler tokens that carry no author identity.
const NOISE: [&str; 6] = ["et", "al", "al.", "and", "ex", "in"];

/// Surname based authorship comparison.
///
/// Author strings are split into individual names, abbreviations compare by
/// prefix so "L." equals "Linnaeus", and years act as a veto: two different
/// years always make the comparison [`Equality::Different`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAuthorComparator;

impl AuthorComparator for DefaultAuthorComparator {
    fn compare(
        &self,
        author1: Option<&str>,
        year1: Option<&str>,
        author2: Option<&str>,
        year2: Option<&str>,
    ) -> Equality {
        let years = compare_years(year1, year2);
        if years == Equality::Different {
            return Equality::Different;
        }
        let authors = compare_authors(author1, author2);
        if authors == Equality::Unknown {
            years
        } else {
            authors
        }
    }
}

fn compare_years(y1: Option<&str>, y2: Option<&str>) -> Equality {
    match (parse_year(y1), parse_year(y2)) {
        (Some(a), Some(b)) if a == b => Equality::Equal,
        (Some(_), Some(_)) => Equality::Different,
        _ => Equality::Unknown,
    }
}

fn parse_year(y: Option<&str>) -> Option<u32> {
    let digits: String = y?.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

fn compare_authors(a1: Option<&str>, a2: Option<&str>) -> Equality {
    let t1 = author_tokens(a1);
    let t2 = author_tokens(a2);
    if t1.is_empty() || t2.is_empty() {
        return Equality::Unknown;
    }
    let (small, large) = if t1.len() <= t2.len() { (&t1, &t2) } else { (&t2, &t1) };
    let matched = small
        .iter()
        .filter(|a| large.iter().any(|b| surnames_match(a, b)))
        .count();
    if matched == small.len() {
        Equality::Equal
    } else if matched == 0 {
        Equality::Different
    } else {
        Equality::Unknown
    }
}

/// Splits an authorship string into normalized surname tokens.
fn author_tokens(authorship: Option<&str>) -> Vec<String> {
    let Some(raw) = authorship else {
        return Vec::new();
    };
    raw.to_lowercase()
        .split([',', '&', ';'])
        .flat_map(|part| part.split_whitespace())
        .map(|t| t.trim_matches(['(', ')']).to_string())
        .filter(|t| !t.is_empty() && !NOISE.contains(&t.as_str()))
        .collect()
}

/// Abbreviated surnames compare by prefix, e.g. "l." matches "linnaeus".
fn surnames_match(a: &str, b: &str) -> bool {
    let abbrev_a = a.ends_with('.');
    let abbrev_b = b.ends_with('.');
    let a = a.trim_end_matches('.');
    let b = b.trim_end_matches('.');
    if a.is_empty() || b.is_empty() {
        return false;
    }
    match (abbrev_a, abbrev_b) {
        (false, false) => a == b,
        (true, false) => b.starts_with(a),
        (false, true) => a.starts_with(b),
        (true, true) => a.starts_with(b) || b.starts_with(a),
    }
}
