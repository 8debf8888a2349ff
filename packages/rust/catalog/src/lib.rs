//! Course catalog loader.
//!
//! Parses the raw catalog document into a [`Catalog`] keyed by course title
//! and derives auxiliary fields (course code, duration) by pattern
//! extraction. Two document shapes are accepted: a JSON array of course
//! objects and a name-keyed map.
//!
//! Data-quality behavior preserved from the source catalog pipeline:
//! entries without a title are skipped with a warning, and duplicate titles
//! are last-write-wins. Both are logged so they stay visible.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use courseadvisor_shared::{AdvisorError, Catalog, CourseRecord, Result};

/// Primary course-code pattern: 2–5 uppercase letters followed by 2–5 digits,
/// matched as a whole word (e.g., `BCA123`).
static COURSE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,5}\d{2,5}\b").expect("valid course code regex"));

/// Fallback pattern: a parenthesized 3–5-letter acronym (e.g., `(SDCM)`).
static ACRONYM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z]{3,5})\)").expect("valid acronym regex"));

/// Duration pattern: `<number> month(s)|year(s)`, case-insensitive.
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+\s*(?:month|year)s?\b").expect("valid duration regex"));

/// Load and parse the catalog file at `path`.
///
/// A missing file or malformed document is an error; the orchestrator
/// treats it the same as an empty catalog ("knowledge base unavailable").
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path).map_err(|e| AdvisorError::io(path, e))?;
    let catalog = parse_catalog(&content)?;
    info!(courses = catalog.len(), path = %path.display(), "catalog loaded");
    Ok(catalog)
}

/// Parse a catalog document from its raw JSON text.
pub fn parse_catalog(content: &str) -> Result<Catalog> {
    let doc: Value = serde_json::from_str(content)
        .map_err(|e| AdvisorError::catalog(format!("malformed catalog document: {e}")))?;

    let mut catalog = Catalog::new();

    match doc {
        Value::Array(items) => {
            debug!(items = items.len(), "catalog document is an array");
            for item in items {
                let Some(title) = item.get("title").and_then(Value::as_str) else {
                    warn!("catalog item missing title, skipping");
                    continue;
                };
                if title.is_empty() {
                    warn!("catalog item has empty title, skipping");
                    continue;
                }
                insert_record(&mut catalog, record_from_fields(title, &item));
            }
        }
        Value::Object(entries) => {
            debug!(entries = entries.len(), "catalog document is a map");
            for (title, details) in entries {
                if title.is_empty() {
                    warn!("catalog entry has empty title key, skipping");
                    continue;
                }
                insert_record(&mut catalog, record_from_fields(&title, &details));
            }
        }
        other => {
            return Err(AdvisorError::catalog(format!(
                "unexpected catalog root type: expected array or object, got {}",
                type_name(&other)
            )));
        }
    }

    Ok(catalog)
}

fn insert_record(catalog: &mut Catalog, record: CourseRecord) {
    let title = record.title.clone();
    if catalog.insert(record).is_some() {
        warn!(%title, "duplicate course title, keeping the later entry");
    }
}

fn record_from_fields(title: &str, details: &Value) -> CourseRecord {
    let description = details
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let url = details
        .get("url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    CourseRecord {
        title: title.to_string(),
        course_code: extract_course_code(title),
        duration: extract_duration(&description),
        url,
        description,
        ..Default::default()
    }
}

/// Extract a course code from a title: the letters+digits pattern first,
/// then a parenthesized acronym.
pub fn extract_course_code(title: &str) -> Option<String> {
    if let Some(m) = COURSE_CODE_RE.find(title) {
        return Some(m.as_str().to_string());
    }
    ACRONYM_RE
        .captures(title)
        .map(|c| c[1].to_string())
}

/// Extract the first `<number> month(s)|year(s)` match from a description.
pub fn extract_duration(description: &str) -> Option<String> {
    DURATION_RE
        .find(description)
        .map(|m| m.as_str().trim().to_string())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
