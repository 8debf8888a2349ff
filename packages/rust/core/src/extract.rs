//! Per-field enrichment of course table rows from scraped page text.
//!
//! Extraction is a table of field/strategy pairs rather than hard-wired
//! calls: cheap pattern matching for fields with a reliable surface form
//! (event code, fee, duration), deterministic model extraction for fields
//! without one (entry requirements, schedule). Either way a miss leaves the
//! seeded catalog value in place.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use courseadvisor_catalog::extract_duration;
use courseadvisor_llm::{CompletionOptions, ModelClient};
use courseadvisor_shared::{ChatMessage, CourseRow};

use crate::prompts;

static EVENT_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)EVENT\s*CODE:\s*([A-Za-z0-9]+)").expect("valid event code regex")
});

// Singapore-dollar amount with cents, e.g. S$5,350.00.
static FEE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"S\$[\d,]+\.\d{2}").expect("valid fee regex"));

// ---------------------------------------------------------------------------
// Field strategy table
// ---------------------------------------------------------------------------

/// The row fields that are back-filled from scraped page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    CourseCode,
    Price,
    Duration,
    EntryRequirements,
    Schedule,
}

/// How one field is extracted from the scraped text.
pub enum Strategy {
    /// Deterministic surface-pattern match.
    Pattern(fn(&str) -> Option<String>),
    /// Deterministic model extraction; the function builds the prompt from
    /// the course title and the scraped text.
    Model(fn(&str, &str) -> String),
}

/// One field/strategy pair.
pub struct FieldExtractor {
    pub field: RowField,
    pub strategy: Strategy,
}

/// The extraction table. Reassigning a field to the other strategy is a
/// one-line change here.
pub const ROW_EXTRACTORS: &[FieldExtractor] = &[
    FieldExtractor {
        field: RowField::CourseCode,
        strategy: Strategy::Pattern(extract_event_code),
    },
    FieldExtractor {
        field: RowField::Price,
        strategy: Strategy::Pattern(extract_fee),
    },
    FieldExtractor {
        field: RowField::Duration,
        strategy: Strategy::Pattern(extract_duration),
    },
    FieldExtractor {
        field: RowField::EntryRequirements,
        strategy: Strategy::Model(prompts::entry_requirements_prompt),
    },
    FieldExtractor {
        field: RowField::Schedule,
        strategy: Strategy::Model(prompts::schedule_extraction_prompt),
    },
];

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Pull the event code out of scraped page text, if present.
pub fn extract_event_code(text: &str) -> Option<String> {
    EVENT_CODE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// First Singapore-dollar fee on the page.
pub fn extract_fee(text: &str) -> Option<String> {
    FEE_RE.find(text).map(|m| m.as_str().to_string())
}

/// Drop model extractions that declare the fact absent.
pub fn keep_extraction(response: String) -> Option<String> {
    let trimmed = response.trim();
    if trimmed.is_empty()
        || trimmed.contains("N/A")
        || trimmed.to_lowercase().contains("not available")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn store(row: &mut CourseRow, field: RowField, value: String) {
    match field {
        RowField::CourseCode => row.course_code = Some(value),
        RowField::Price => row.price = Some(value),
        RowField::Duration => row.duration = Some(value),
        RowField::EntryRequirements => row.entry_requirements = Some(value),
        RowField::Schedule => row.course_schedule = Some(value),
    }
}

/// Run every extractor in [`ROW_EXTRACTORS`] against the scraped text and
/// overlay the hits onto the seeded row. Pattern misses, "N/A" answers, and
/// failed model calls all keep the catalog value; the row stays usable.
pub async fn enrich_row(row: &mut CourseRow, scraped: &str, model: &ModelClient) {
    let options = CompletionOptions::extraction();

    for extractor in ROW_EXTRACTORS {
        match extractor.strategy {
            Strategy::Pattern(extract) => {
                if let Some(value) = extract(scraped) {
                    store(row, extractor.field, value);
                }
            }
            Strategy::Model(build_prompt) => {
                let prompt = build_prompt(&row.name, scraped);
                match model.complete(&[ChatMessage::user(prompt)], &options).await {
                    Ok(response) => {
                        if let Some(value) = keep_extraction(response) {
                            store(row, extractor.field, value);
                        }
                    }
                    Err(e) => warn!(
                        course = %row.name,
                        field = ?extractor.field,
                        error = %e,
                        "field extraction failed"
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_code_matches_with_flexible_spacing() {
        assert_eq!(
            extract_event_code("Details\nEVENT CODE: CRS2041\nVenue: Academy"),
            Some("CRS2041".to_string())
        );
        assert_eq!(
            extract_event_code("event code:bca881"),
            Some("bca881".to_string())
        );
        assert!(extract_event_code("no code on this page").is_none());
    }

    #[test]
    fn fee_requires_cents() {
        assert_eq!(
            extract_fee("Full fee: S$5,350.00 (before funding)"),
            Some("S$5,350.00".to_string())
        );
        assert!(extract_fee("around S$5,350 nett").is_none());
    }

    #[test]
    fn extraction_filter_discards_absent_answers() {
        assert!(keep_extraction("N/A".to_string()).is_none());
        assert!(keep_extraction("The information is not available.".to_string()).is_none());
        assert!(keep_extraction("   ".to_string()).is_none());
        assert_eq!(
            keep_extraction("Diploma in a built environment discipline.".to_string()).as_deref(),
            Some("Diploma in a built environment discipline.")
        );
    }

    #[test]
    fn pattern_fields_use_pattern_strategy() {
        for extractor in ROW_EXTRACTORS {
            let pattern = matches!(extractor.strategy, Strategy::Pattern(_));
            match extractor.field {
                RowField::CourseCode | RowField::Price | RowField::Duration => assert!(pattern),
                RowField::EntryRequirements | RowField::Schedule => assert!(!pattern),
            }
        }
    }

    #[test]
    fn pattern_miss_keeps_seeded_values() {
        let mut row = CourseRow {
            name: "Specialist Diploma in BIM (SDBIM)".into(),
            course_code: Some("SDBIM".into()),
            price: Some("S$4,000.00".into()),
            ..Default::default()
        };
        for extractor in ROW_EXTRACTORS {
            if let Strategy::Pattern(extract) = extractor.strategy {
                if let Some(value) = extract("a page with none of the patterns") {
                    store(&mut row, extractor.field, value);
                }
            }
        }
        assert_eq!(row.course_code.as_deref(), Some("SDBIM"));
        assert_eq!(row.price.as_deref(), Some("S$4,000.00"));
    }

    #[test]
    fn pattern_hit_overrides_seeded_values() {
        let mut row = CourseRow {
            name: "Specialist Diploma in BIM (SDBIM)".into(),
            course_code: Some("SDBIM".into()),
            ..Default::default()
        };
        let page = "EVENT CODE: CRS9001\nFee: S$6,200.00\nCompleted over 12 months.";
        for extractor in ROW_EXTRACTORS {
            if let Strategy::Pattern(extract) = extractor.strategy {
                if let Some(value) = extract(page) {
                    store(&mut row, extractor.field, value);
                }
            }
        }
        assert_eq!(row.course_code.as_deref(), Some("CRS9001"));
        assert_eq!(row.price.as_deref(), Some("S$6,200.00"));
        assert_eq!(row.duration.as_deref(), Some("12 months"));
    }
}
