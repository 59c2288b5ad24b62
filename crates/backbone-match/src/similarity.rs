use backbone_types::NameSimilarity;

/// Fuzzy string distance scaled to 0..100, backed by Jaro-Winkler.
///
/// Scientific name variants mostly differ in suffixes (gender endings,
/// latinisation), which Jaro-Winkler's common-prefix weighting handles well.
#[derive(Clone, Copy, Debug, Default)]
pub struct JaroWinklerSimilarity;

impl NameSimilarity for JaroWinklerSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(&a.to_lowercase(), &b.to_lowercase()) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names_score_100() {
        let sim = JaroWinklerSimilarity;
        assert_eq!(sim.similarity("Puma concolor", "Puma concolor"), 100.0);
        assert_eq!(sim.similarity("Puma concolor", "PUMA CONCOLOR"), 100.0);
    }

    #[test]
    fn close_variants_score_high() {
        let sim = JaroWinklerSimilarity;
        let s = sim.similarity("Puma concolor", "Puma concolour");
        assert!(s > 90.0 && s < 100.0, "got {s}");
    }

    #[test]
    fn unrelated_names_score_low() {
        let sim = JaroWinklerSimilarity;
        let s = sim.similarity("Puma concolor", "Abies alba");
        assert!(s < 70.0, "got {s}");
    }
}
