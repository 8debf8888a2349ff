//! Core domain types for the course-advisory pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CourseRecord
// ---------------------------------------------------------------------------

/// A single course from the catalog, keyed by its full title.
///
/// `course_code` and `duration` are derived at load time by pattern
/// extraction; the remaining optional fields start empty and are filled
/// opportunistically per query (regex or model extraction over the scraped
/// course page).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Full course title (primary key within the catalog).
    pub title: String,
    /// Canonical URL of the official course page.
    pub url: String,
    /// Raw description text (the embedding source).
    pub description: String,
    /// Derived course code (e.g., `SDCM` or `BCA123`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    /// Derived duration (e.g., `12 months`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_covered: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The loaded course catalog, keyed by full title.
///
/// Duplicate titles are last-write-wins; the loader warns when this happens
/// but does not reject the catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    courses: HashMap<String, CourseRecord>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its title. Returns the displaced record when
    /// the title was already present.
    pub fn insert(&mut self, record: CourseRecord) -> Option<CourseRecord> {
        self.courses.insert(record.title.clone(), record)
    }

    /// Look up a course by its exact title.
    pub fn get(&self, title: &str) -> Option<&CourseRecord> {
        self.courses.get(title)
    }

    /// URL for a course title, if the course is known.
    pub fn url_for(&self, title: &str) -> Option<&str> {
        self.courses.get(title).map(|c| c.url.as_str())
    }

    /// Number of distinct courses.
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    /// Whether the catalog holds no courses at all.
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Iterate over all records.
    pub fn iter(&self) -> impl Iterator<Item = &CourseRecord> {
        self.courses.values()
    }
}

// ---------------------------------------------------------------------------
// FragmentMeta
// ---------------------------------------------------------------------------

/// Metadata row for one indexed fragment.
///
/// The metadata array is positionally aligned with the vector collection:
/// row `i` describes the `i`-th vector. The loader refuses artifact pairs
/// whose counts disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentMeta {
    /// The fragment text (a bounded, overlapping slice of a description).
    pub fragment_text: String,
    /// Title of the course the fragment was cut from.
    pub source_course_title: String,
    /// Canonical URL of that course.
    pub source_url: String,
}

// ---------------------------------------------------------------------------
// CourseRow
// ---------------------------------------------------------------------------

/// One row of the structured course table returned alongside the answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseRow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_schedule: Option<String>,
    pub url: String,
}

impl CourseRow {
    /// Seed a row from the static catalog record.
    pub fn from_record(record: &CourseRecord) -> Self {
        Self {
            name: record.title.clone(),
            course_code: record.course_code.clone(),
            duration: record.duration.clone(),
            price: record.price.clone(),
            entry_requirements: record.entry_requirements.clone(),
            course_schedule: record.course_schedule.clone(),
            url: record.url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat messages
// ---------------------------------------------------------------------------

/// Role of a chat message in the completion contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message sent to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
