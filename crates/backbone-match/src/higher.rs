use backbone_types::Kingdom;

/// Compares two higher taxon names, yielding `eq` on a match, `neq` on a
/// mismatch and `missing` when either side is absent.
pub fn compare_higher_taxa(
    query: Option<&str>,
    reference: Option<&str>,
    eq: i32,
    neq: i32,
    missing: i32,
) -> i32 {
    let q = query.map(norm).filter(|s| !s.is_empty());
    let r = reference.map(norm).filter(|s| !s.is_empty());
    match (q, r) {
        (Some(q), Some(r)) => {
            if q == r {
                eq
            } else {
                neq
            }
        }
        _ => missing,
    }
}

/// Lowercased, alphabetic-only form used for higher taxon equality.
pub fn norm(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn to_kingdom(name: Option<&str>) -> Option<Kingdom> {
    Kingdom::parse(name?)
}
