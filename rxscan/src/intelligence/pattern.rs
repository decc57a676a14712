use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{CandidateSet, FormattedText, MedicineCandidate, Strategy};

use super::extractor::MedicineExtractor;

/// Applied in order; earlier rules win ties in the final ranking.
static RULES: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        // Runs of capitalized words on one line
        Regex::new(r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)*\b").expect("valid capitalized-word rule"),
        // Amount with a dosage unit
        Regex::new(r"\b\d+[ \t]*(?:mg|g|ml|tablet|tab|cap|capsule)\b")
            .expect("valid dosage rule"),
        Regex::new(r"\b[A-Z]{2,}\b").expect("valid all-caps rule"),
        Regex::new(r"\b[a-z]+[ \t]*\d+[a-z]*\b").expect("valid alphanumeric rule"),
    ]
});

static LINE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid line cleanup pattern"));

const LINE_KEYWORDS: &[&str] = &["tab", "cap", "mg", "ml", "inj", "ointment"];

/// Local, heuristic extractor. Favours recall over precision.
#[derive(Debug, Clone, Copy)]
pub struct PatternExtractor {
    min_length: usize,
}

impl PatternExtractor {
    pub const DEFAULT_MIN_LENGTH: usize = 4;

    pub fn new(min_length: usize) -> Self {
        Self {
            min_length: min_length.max(1),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.pattern_min_length)
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn extract_from_str(&self, text: &str) -> Vec<MedicineCandidate> {
        let mut candidates = CandidateSet::new(Strategy::Pattern);

        for rule in RULES.iter() {
            for found in rule.find_iter(text) {
                self.offer(&mut candidates, found.as_str());
            }
        }

        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if !has_keyword(line) {
                continue;
            }
            let cleaned = LINE_NOISE.replace_all(line, "");
            self.offer(&mut candidates, &cleaned);
        }

        debug!(count = candidates.len(), "Pattern extraction finished");
        candidates.into_ranked()
    }

    fn offer(&self, candidates: &mut CandidateSet, name: &str) {
        let name = name.trim();
        if name.chars().count() >= self.min_length {
            candidates.insert(name);
        }
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_LENGTH)
    }
}

fn has_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    LINE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

#[async_trait]
impl MedicineExtractor for PatternExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Pattern
    }

    async fn extract(&self, text: &FormattedText) -> Result<Vec<MedicineCandidate>> {
        Ok(self.extract_from_str(&text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(text: &str) -> Vec<String> {
        PatternExtractor::default()
            .extract_from_str(text)
            .into_iter()
            .map(|c| c.name)
            .collect()
    }

    #[test]
    fn test_prescription_sample() {
        assert_eq!(
            names("Paracetamol 500 mg\nTAB ABC123\n"),
            vec!["Paracetamol 500 mg", "Paracetamol", "TAB ABC123", "500 mg"]
        );
    }

    #[test]
    fn test_short_matches_are_dropped() {
        let found = names("Rx\nCrocin Advance\nDOLO 650");
        assert_eq!(found, vec!["Crocin Advance", "DOLO"]);
        assert!(found.iter().all(|name| name.chars().count() > 3));
    }

    #[test]
    fn test_lowercase_dose_combination() {
        assert_eq!(
            names("amoxicillin 250mg"),
            vec!["amoxicillin 250mg", "250mg"]
        );
    }

    #[test]
    fn test_keyword_line_is_cleaned() {
        assert_eq!(
            names("Tab. Azithral-500 (OD)"),
            vec!["Tab Azithral-500 OD", "Azithral"]
        );
    }

    #[test]
    fn test_case_variants_are_deduplicated() {
        assert_eq!(names("Ibuprofen\nIBUPROFEN"), vec!["Ibuprofen"]);
    }

    #[test]
    fn test_capitalized_run_stays_on_one_line() {
        let found = names("Metformin\nGlimepiride");
        assert_eq!(found, vec!["Glimepiride", "Metformin"]);
    }

    #[test]
    fn test_custom_min_length() {
        let extractor = PatternExtractor::new(11);
        let found: Vec<_> = extractor
            .extract_from_str("Paracetamol 500 mg\nTAB ABC123\n")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(found, vec!["Paracetamol 500 mg", "Paracetamol"]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(names("").is_empty());
        assert!(names("\n  \n").is_empty());
    }

    #[test]
    fn test_trait_extract_tags_source() {
        let text = FormattedText::new(vec!["Cetirizine 10 mg".to_string()]);
        let extractor = PatternExtractor::default();
        let found = tokio_test::block_on(extractor.extract(&text)).unwrap();

        assert_eq!(extractor.strategy(), Strategy::Pattern);
        assert!(!found.is_empty());
        assert!(found.iter().all(|c| c.source == Strategy::Pattern));
    }
}
