use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize a scientific name into the canonical query form used for the
/// indexed name terms: trimmed, lowercased, diacritics folded and inner
/// whitespace collapsed to single spaces.
///
/// Both the builder and all query paths must go through this function so
/// that indexed terms and query terms live in the same space.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.nfd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_whitespace() || c.is_control() {
            pending_space = !out.is_empty();
            continue;
        }
        if c == '×' {
            // hybrid marker carries no lookup value
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn folds_case_and_diacritics() {
        assert_eq!(normalize("Vèronica pérsica"), "veronica persica");
        assert_eq!(normalize("PUMA CONCOLOR"), "puma concolor");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  Abies \t alba \n "), "abies alba");
    }

    #[test]
    fn drops_hybrid_marker() {
        assert_eq!(normalize("× Sorbopyrus auricularis"), "sorbopyrus auricularis");
        assert_eq!(normalize("Abies × alba"), "abies alba");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize("   "), "");
    }
}
