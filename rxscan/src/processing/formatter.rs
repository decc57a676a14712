use crate::models::{FormattedText, Transcript};

/// Reflows OCR lines so that a line whose successor starts without a capital
/// letter absorbs that successor. Prescriptions often wrap a drug name's
/// dosage onto the next line without re-capitalizing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, transcript: &Transcript) -> FormattedText {
        format_lines(transcript.lines())
    }
}

pub fn format_lines<S: AsRef<str>>(lines: &[S]) -> FormattedText {
    let lines: Vec<&str> = lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .collect();

    let mut merged = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let mut current = lines[i].to_string();
        if let Some(next) = lines.get(i + 1) {
            if !starts_uppercase(next) {
                current.push(' ');
                current.push_str(next);
                i += 1;
            }
        }
        merged.push(current);
        i += 1;
    }

    FormattedText::new(merged)
}

fn starts_uppercase(line: &str) -> bool {
    line.chars().next().is_some_and(char::is_uppercase)
}
