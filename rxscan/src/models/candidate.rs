use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Which extraction strategy produced (or should produce) candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Pattern,
    Entity,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Pattern => "pattern",
            Strategy::Entity => "entity",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pattern" => Ok(Strategy::Pattern),
            "entity" | "ner" => Ok(Strategy::Entity),
            other => Err(format!(
                "unknown extraction strategy '{other}', expected 'pattern' or 'entity'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineCandidate {
    pub name: String,
    pub source: Strategy,
}

impl MedicineCandidate {
    pub fn new(name: impl Into<String>, source: Strategy) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// Insertion-ordered candidate collection, deduplicated on the lowercase,
/// whitespace-collapsed form of each name. The first spelling seen wins.
#[derive(Debug)]
pub struct CandidateSet {
    source: Strategy,
    seen: HashSet<String>,
    items: Vec<MedicineCandidate>,
}

impl CandidateSet {
    pub fn new(source: Strategy) -> Self {
        Self {
            source,
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    /// Returns false if the name is blank or already present.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if !self.seen.insert(normalize(name)) {
            return false;
        }
        self.items.push(MedicineCandidate::new(name, self.source));
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<MedicineCandidate> {
        self.items
    }

    /// Longest names first; equal lengths keep insertion order.
    pub fn into_ranked(self) -> Vec<MedicineCandidate> {
        let mut items = self.items;
        items.sort_by(|a, b| b.name.chars().count().cmp(&a.name.chars().count()));
        items
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("pattern".parse::<Strategy>(), Ok(Strategy::Pattern));
        assert_eq!(" Entity ".parse::<Strategy>(), Ok(Strategy::Entity));
        assert_eq!("ner".parse::<Strategy>(), Ok(Strategy::Entity));
        assert!("llm".parse::<Strategy>().is_err());
        assert!("regex".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_candidate_set_dedupes_case_and_whitespace() {
        let mut set = CandidateSet::new(Strategy::Pattern);
        assert!(set.insert("Amoxicillin  500 mg"));
        assert!(!set.insert("amoxicillin 500 MG"));
        assert!(!set.insert("   "));
        assert!(set.insert("Ibuprofen"));

        let names: Vec<_> = set.into_vec().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Amoxicillin  500 mg", "Ibuprofen"]);
    }

    #[test]
    fn test_ranked_is_stable_for_equal_lengths() {
        let mut set = CandidateSet::new(Strategy::Pattern);
        set.insert("Bbbb");
        set.insert("Longest name");
        set.insert("Aaaa");

        let names: Vec<_> = set.into_ranked().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Longest name", "Bbbb", "Aaaa"]);
    }

    #[test]
    fn test_candidates_carry_source_tag() {
        let mut set = CandidateSet::new(Strategy::Entity);
        set.insert("Paracetamol");
        let candidates = set.into_vec();
        assert_eq!(candidates[0].source, Strategy::Entity);
    }
}
