//! Query intent classification and rule-based query expansion.
//!
//! Classification is a fixed-vocabulary keyword match: a query asking for a
//! narrow fact (fee, entry requirement, schedule) about a course is a
//! "specific detail" query and is answered by extraction over freshly
//! scraped content instead of the recommendation flow.

use courseadvisor_shared::ExpansionRule;

/// Keywords marking a query as asking for a specific detail.
const SPECIFIC_DETAIL_KEYWORDS: &[&str] = &[
    "fee",
    "cost",
    "price",
    "charge",
    "entry",
    "requirements",
    "prerequisite",
    "schedule",
    "intake",
    "start date",
    "duration",
    "course dates",
];

/// The subset of detail keywords that select the schedule-extraction prompt.
const SCHEDULE_KEYWORDS: &[&str] = &["schedule", "intake", "start date", "duration", "course dates"];

/// Classification of one raw query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryIntent {
    /// Asks for a narrow fact about one course.
    pub specific_detail: bool,
    /// Asks specifically about schedule/intake/dates.
    pub schedule_related: bool,
}

/// Classify `query` against the fixed keyword vocabulary.
pub fn classify(query: &str) -> QueryIntent {
    let lower = query.to_lowercase();
    QueryIntent {
        specific_detail: SPECIFIC_DETAIL_KEYWORDS.iter().any(|k| lower.contains(k)),
        schedule_related: SCHEDULE_KEYWORDS.iter().any(|k| lower.contains(k)),
    }
}

/// Apply the configured expansion rules: when a trigger phrase appears in
/// the raw query, its extra terms are appended to the text used for
/// embedding. The raw query is untouched for display and prompting.
pub fn expand_query(query: &str, rules: &[ExpansionRule]) -> String {
    let lower = query.to_lowercase();
    let mut expanded = query.to_string();
    for rule in rules {
        if lower.contains(&rule.trigger.to_lowercase()) {
            expanded.push(' ');
            expanded.push_str(&rule.append);
        }
    }
    expanded
}
