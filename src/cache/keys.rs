//! Cache key definitions.

use crate::domain::types::AgeGroup;

/// Identifies one cached content lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentKey {
    /// Headings of a symptom, by normalized name.
    Symptom(String),
    /// Description of a symptom, by normalized name.
    SymptomDescription(String),
    /// Sub-headings of a heading visible to one age group.
    Heading { heading_id: i64, age_group: AgeGroup },
    /// Search hits for a term within one age group.
    Search { term: String, age_group: AgeGroup },
    /// The editor link index.
    AllUrls,
}

impl ContentKey {
    /// Search keys drop every whitespace character so `"high temp"` and
    /// `"hightemp"` share an entry.
    pub fn search(term: &str, age_group: AgeGroup) -> Self {
        Self::Search {
            term: term.chars().filter(|c| !c.is_whitespace()).collect(),
            age_group,
        }
    }

    /// Whether an empty result computed for this key is worth storing.
    pub fn caches_empty(&self) -> bool {
        !matches!(
            self,
            ContentKey::Search { .. } | ContentKey::SymptomDescription(_)
        )
    }

    /// Metric label for hit/miss counters.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentKey::Symptom(_) => "symptom",
            ContentKey::SymptomDescription(_) => "symptom_description",
            ContentKey::Heading { .. } => "heading",
            ContentKey::Search { .. } => "search",
            ContentKey::AllUrls => "all_urls",
        }
    }
}
