//! Course resolution and display ordering.
//!
//! Explicit mentions of a known course (by full title or derived code,
//! whole-word and case-insensitive) take priority over retrieval order when
//! deciding which course a query is about.

use courseadvisor_shared::{Catalog, CourseRecord};

/// Find a course the raw query explicitly names, by full title or course
/// code. Titles with punctuation (parenthesized acronyms) match correctly
/// because the boundary check looks at alphanumeric neighbors, not regex
/// word boundaries.
pub fn find_explicit_course<'a>(catalog: &'a Catalog, query: &str) -> Option<&'a CourseRecord> {
    for course in catalog.iter() {
        if contains_whole(query, &course.title) {
            return Some(course);
        }
        if let Some(code) = &course.course_code {
            if contains_whole(query, code) {
                return Some(course);
            }
        }
    }
    None
}

/// Case-insensitive whole-word containment: the match may not be flanked by
/// alphanumeric characters.
fn contains_whole(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let hay = haystack.to_lowercase();
    let needle = needle.to_lowercase();

    let mut from = 0;
    while let Some(pos) = hay[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        let before_ok = hay[..start].chars().next_back().is_none_or(|c| !c.is_alphanumeric());
        let after_ok = hay[end..].chars().next().is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        from = start + 1;
    }
    false
}

/// Order course titles for display: courses whose titles carry none of the
/// deprioritized terms come first (diplomas before modular/certificate
/// variants), first-seen order preserved within each group, capped to `cap`.
pub fn prioritize_courses(titles: &[String], deprioritize_terms: &[String], cap: usize) -> Vec<String> {
    let demoted = |title: &str| {
        let lower = title.to_lowercase();
        deprioritize_terms.iter().any(|t| lower.contains(&t.to_lowercase()))
    };

    let mut ordered: Vec<String> = titles.iter().filter(|t| !demoted(t)).cloned().collect();
    ordered.extend(titles.iter().filter(|t| demoted(t)).cloned());
    ordered.truncate(cap);
    ordered
}
