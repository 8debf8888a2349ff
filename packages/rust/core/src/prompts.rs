//! Prompt templates for the three answer modes and the per-field row
//! extractions.
//!
//! The extraction templates operate strictly over dynamically scraped
//! content and must emit [`NOT_AVAILABLE_SENTENCE`] verbatim when the fact
//! is absent, always suffixed with the course URL.

use courseadvisor_shared::CourseRecord;

/// Fixed fallback emitted when a requested fact is not on the page.
pub const NOT_AVAILABLE_SENTENCE: &str =
    "The requested information is not available on the official website.";

/// Suffix line pointing the user at the official page.
pub fn url_suffix(url: &str) -> String {
    format!("For more details, please refer to the official course website: {url}")
}

/// Template (a): schedule/intake-specific extraction over dynamic context.
pub fn schedule_prompt(course_title: &str, query: &str, dynamic_context: &str, url: &str) -> String {
    format!(
        r#"You are a helpful AI assistant. Your task is to extract all schedule, intake, and course date information for the course "{course_title}" from the provided context.
User Query: "{query}"
Context from Website:
{dynamic_context}

Instructions:
- Summarize all dates, times, and durations related to the course schedule.
- If the information is not present, state: "{NOT_AVAILABLE_SENTENCE}"
- Do not include any extra sentences.
- Always include the course URL at the end of the response.
- Your final answer should be formatted as: "[Extracted Answer]

{}""#,
        url_suffix(url)
    )
}

/// Template (b): general fact extraction (fees, requirements) over dynamic
/// context.
pub fn fact_prompt(course_title: &str, query: &str, dynamic_context: &str, url: &str) -> String {
    format!(
        r#"You are a data extraction assistant. Find the exact piece of information requested by the user from the provided context for the course: "{course_title}".
User Query: "{query}"
Context from Website:
{dynamic_context}

Instructions:
- Find the specific detail requested for the specified course.
- Respond with a concise and direct answer. Do not include extra sentences.
- If the information is not explicitly present, state: "{NOT_AVAILABLE_SENTENCE}"
- Always include the course URL at the end of the response.
- Your final answer should be formatted as: "[Extracted Answer]

{}""#,
        url_suffix(url)
    )
}

/// Compact per-course summary block used by the recommendation template.
pub fn course_summary_block(record: &CourseRecord) -> String {
    format!(
        "**Course Name:** **{}**\n**Event Code:** {}\n**Description:** {}\n**URL:** {}",
        record.title,
        record.course_code.as_deref().unwrap_or("N/A"),
        if record.description.is_empty() {
            "Description not available."
        } else {
            &record.description
        },
        if record.url.is_empty() { "URL not available" } else { &record.url },
    )
}

/// Template (c): recommendation/overview for general queries. Pre-builds
/// summary blocks for up to 3 courses and appends the raw retrieved URLs.
pub fn recommendation_prompt(
    query: &str,
    context: &str,
    summaries: &[String],
    retrieved_urls: &[String],
) -> String {
    let summaries_text = summaries.join("\n\n");
    let urls_text = retrieved_urls.join("\n");
    format!(
        r#"You are a helpful AI assistant knowledgeable about specialist training programmes.
Your task is to provide a structured, numbered list of the top {count} most relevant courses based on the user's query.

User Query: "{query}"

Course Information Context (from multiple sources):
{context}

Instructions:
1. Identify the top {count} most relevant courses from the provided context. Prioritize full diploma programmes over modular certificates.
2. Format your response as a numbered list (e.g., "1. Course Name...").
3. For each course, provide a concise summary using the following format:
   **Course Name:** [The full course name]
   **Event Code:** [The course event code]
   **Description:** [A brief summary of the course content]
   **URL:** [The official course URL]
4. End the response with a final sentence directing the user to the table below for more details.

Here are the course summaries to use:
---
{summaries_text}
---

Relevant URLs:
{urls_text}"#,
        count = summaries.len().max(1),
    )
}

/// Targeted row extraction: entry requirements as a single string.
pub fn entry_requirements_prompt(course_title: &str, scraped: &str) -> String {
    format!(
        r#"You are a data extraction bot. Extract the entry requirements for the course "{course_title}" from the provided text.
Text:
{scraped}
Instructions:
- Respond only with the entry requirements as a single string.
- If the information is not present, use "N/A".
- Do not include any extra text or conversational filler."#
    )
}

/// Targeted row extraction: schedule and intake dates.
pub fn schedule_extraction_prompt(course_title: &str, scraped: &str) -> String {
    format!(
        r#"You are a data extraction bot. Extract the schedule and intake dates for the course "{course_title}" from the provided text.
Text:
{scraped}
Instructions:
- Summarize the schedule and intake dates.
- If the information is not present, use "N/A".
- Do not include any extra text or conversational filler."#
    )
}
