//! Description fragmenting for the offline index build.
//!
//! Each course description is cut into bounded, overlapping fragments.
//! Breaks prefer whitespace near the window end so fragments do not split
//! words mid-way.

use courseadvisor_shared::{Catalog, FragmentMeta};

/// Fragment size in characters.
pub const CHUNK_SIZE: usize = 500;

/// Overlap between neighboring fragments, in characters.
pub const CHUNK_OVERLAP: usize = 50;

/// How far back from the window end a whitespace break is considered.
const BREAK_SLACK: usize = 50;

/// Split `text` into overlapping fragments of at most `size` characters.
///
/// Consecutive fragments share `overlap` characters. Empty and
/// whitespace-only inputs yield no fragments.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    assert!(size > overlap, "fragment size must exceed overlap");

    let chars: Vec<char> = text.chars().collect();
    let mut fragments = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let hard_end = (start + size).min(chars.len());
        let end = if hard_end < chars.len() {
            break_point(&chars, start, hard_end)
        } else {
            hard_end
        };

        let fragment: String = chars[start..end].iter().collect();
        let trimmed = fragment.trim();
        if !trimmed.is_empty() {
            fragments.push(trimmed.to_string());
        }

        if end == chars.len() {
            break;
        }
        // Step back by the overlap, but always make forward progress.
        start = end.saturating_sub(overlap).max(start + 1);
    }

    fragments
}

/// Prefer the last whitespace within `BREAK_SLACK` of the window end.
fn break_point(chars: &[char], start: usize, hard_end: usize) -> usize {
    let slack_floor = hard_end.saturating_sub(BREAK_SLACK).max(start + 1);
    for i in (slack_floor..hard_end).rev() {
        if chars[i].is_whitespace() {
            return i;
        }
    }
    hard_end
}

/// Cut every course description in `catalog` into fragments, producing the
/// metadata rows in build order. The caller embeds `fragment_text` values in
/// the same order, which preserves the positional alignment invariant.
pub fn build_fragments(catalog: &Catalog) -> Vec<FragmentMeta> {
    let mut rows = Vec::new();
    // Stable order keeps repeated builds comparable.
    let mut courses: Vec<_> = catalog.iter().collect();
    courses.sort_by(|a, b| a.title.cmp(&b.title));

    for course in courses {
        if course.description.trim().is_empty() {
            continue;
        }
        for fragment in chunk_text(&course.description, CHUNK_SIZE, CHUNK_OVERLAP) {
            rows.push(FragmentMeta {
                fragment_text: fragment,
                source_course_title: course.title.clone(),
                source_url: course.url.clone(),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseadvisor_shared::CourseRecord;

    #[test]
    fn short_text_is_one_fragment() {
        let fragments = chunk_text("BIM coordination basics.", CHUNK_SIZE, CHUNK_OVERLAP);
        assert_eq!(fragments, vec!["BIM coordination basics.".to_string()]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunk_text("", CHUNK_SIZE, CHUNK_OVERLAP).is_empty());
        assert!(chunk_text("   \n  ", CHUNK_SIZE, CHUNK_OVERLAP).is_empty());
    }

    #[test]
    fn long_text_produces_overlapping_fragments() {
        let word = "construction ";
        let text = word.repeat(100); // 1300 chars
        let fragments = chunk_text(&text, 500, 50);

        assert!(fragments.len() >= 3);
        for f in &fragments {
            assert!(f.chars().count() <= 500, "fragment too long: {}", f.len());
        }
        // Neighboring fragments share text because of the overlap.
        let tail: String = fragments[0].chars().rev().take(10).collect();
        let tail: String = tail.chars().rev().collect();
        assert!(fragments[1].contains(tail.trim()));
    }

    #[test]
    fn breaks_prefer_whitespace() {
        let text = format!("{} {}", "a".repeat(480), "b".repeat(480));
        let fragments = chunk_text(&text, 500, 50);
        // First fragment ends at the whitespace, not mid-word.
        assert_eq!(fragments[0], "a".repeat(480));
    }

    #[test]
    fn build_fragments_tags_source_course() {
        let mut catalog = Catalog::new();
        catalog.insert(CourseRecord {
            title: "Specialist Diploma in BIM (SDBIM)".into(),
            url: "https://example.com/sdbim".into(),
            description: "BIM coordination for the built environment.".into(),
            ..Default::default()
        });

        let rows = build_fragments(&catalog);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_course_title, "Specialist Diploma in BIM (SDBIM)");
        assert_eq!(rows[0].source_url, "https://example.com/sdbim");
    }

    #[test]
    fn build_fragments_skips_empty_descriptions() {
        let mut catalog = Catalog::new();
        catalog.insert(CourseRecord {
            title: "Empty".into(),
            url: "https://example.com/empty".into(),
            description: "  ".into(),
            ..Default::default()
        });
        assert!(build_fragments(&catalog).is_empty());
    }
}
