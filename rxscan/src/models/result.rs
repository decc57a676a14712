use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FormattedText, MedicineCandidate, Strategy};

/// Why a result carries no text or no candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// The OCR engine reported a failed operation
    OcrFailed,
    /// The poll budget ran out before the engine finished
    OcrTimedOut,
    /// The engine finished but returned no legible lines
    NoText,
    /// Candidate extraction failed and was downgraded to an empty list
    ExtractionFailed,
}

/// Outcome of one pipeline run, handed to the caller for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: FormattedText,
    pub medicines: Vec<MedicineCandidate>,
    pub strategy: Strategy,
    pub degraded: bool,
    pub degraded_reason: Option<DegradedReason>,
    /// Number of lines the OCR engine returned before formatting
    pub transcript_lines: usize,
    pub processed_at: DateTime<Utc>,
}

impl ExtractionResult {
    pub fn completed(
        text: FormattedText,
        medicines: Vec<MedicineCandidate>,
        strategy: Strategy,
        transcript_lines: usize,
    ) -> Self {
        Self {
            text,
            medicines,
            strategy,
            degraded: false,
            degraded_reason: None,
            transcript_lines,
            processed_at: Utc::now(),
        }
    }

    pub fn degraded(strategy: Strategy, reason: DegradedReason) -> Self {
        Self {
            text: FormattedText::default(),
            medicines: Vec::new(),
            strategy,
            degraded: true,
            degraded_reason: Some(reason),
            transcript_lines: 0,
            processed_at: Utc::now(),
        }
    }

    /// The formatted text as one newline-joined string.
    pub fn extracted_text(&self) -> String {
        self.text.to_string()
    }

    pub fn medicine_names(&self) -> Vec<&str> {
        self.medicines.iter().map(|m| m.name.as_str()).collect()
    }
}
