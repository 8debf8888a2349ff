//! Per-query retrieval orchestration.
//!
//! One `answer` call walks the whole pipeline strictly sequentially:
//! lazy index load, query expansion and embedding, top-k retrieval, target
//! course resolution, optional page fetch, prompt selection, generation,
//! and row enrichment. No automatic retries anywhere; every external call
//! degrades to a fallback value and a logged warning so the caller always
//! receives valid text.

use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use courseadvisor_fetch::PageFetcher;
use courseadvisor_index::VectorIndex;
use courseadvisor_llm::{CompletionOptions, ModelClient};
use courseadvisor_shared::{Catalog, ChatMessage, CourseRow, RetrievalConfig};

use crate::extract;
use crate::intent::{self, QueryIntent};
use crate::prompts;
use crate::resolve;
use crate::session::SessionState;

/// Fixed reply when the index or catalog cannot serve any query.
const KB_UNAVAILABLE: &str =
    "I'm sorry, my knowledge base could not be loaded. Please try again later.";

/// Fixed reply when neither static fragments nor page content were found.
const NOTHING_FOUND: &str =
    "I couldn't find any information related to your question in the course catalog.";

/// The complete result of one query.
#[derive(Debug)]
pub struct AdvisorReply {
    /// Free-text answer. Always valid text, never an error.
    pub text: String,
    /// Structured course table, at most `max_display_courses` rows. The
    /// caller decides whether to render it; specific-detail follow-ups
    /// usually show text only.
    pub rows: Vec<CourseRow>,
    /// Whether the query asked for a specific detail about one course.
    pub specific_detail: bool,
}

impl AdvisorReply {
    fn text_only(text: impl Into<String>, specific_detail: bool) -> Self {
        Self {
            text: text.into(),
            rows: Vec::new(),
            specific_detail,
        }
    }
}

/// Query-time advisory engine. Owns the catalog, the lazily loaded index,
/// and the service clients; conversation state is owned by the caller and
/// passed into every call.
pub struct Advisor {
    catalog: Catalog,
    retrieval: RetrievalConfig,
    index_path: PathBuf,
    metadata_path: PathBuf,
    index: Option<VectorIndex>,
    fetcher: PageFetcher,
    model: ModelClient,
}

impl Advisor {
    /// Create an advisor that loads the index artifacts on first use.
    pub fn new(
        catalog: Catalog,
        retrieval: RetrievalConfig,
        index_path: PathBuf,
        metadata_path: PathBuf,
        fetcher: PageFetcher,
        model: ModelClient,
    ) -> Self {
        Self {
            catalog,
            retrieval,
            index_path,
            metadata_path,
            index: None,
            fetcher,
            model,
        }
    }

    /// Create an advisor around an already-built index.
    pub fn with_index(
        catalog: Catalog,
        retrieval: RetrievalConfig,
        index: VectorIndex,
        fetcher: PageFetcher,
        model: ModelClient,
    ) -> Self {
        Self {
            catalog,
            retrieval,
            index_path: PathBuf::new(),
            metadata_path: PathBuf::new(),
            index: Some(index),
            fetcher,
            model,
        }
    }

    /// Answer one query against the session's conversation state.
    #[instrument(skip_all, fields(query_len = query.len()))]
    pub async fn answer(&mut self, session: &mut SessionState, query: &str) -> AdvisorReply {
        // An empty catalog can never resolve a course or build a row, so it
        // is as unusable as a missing index. No service is called.
        if self.catalog.is_empty() {
            warn!("catalog is empty, knowledge base unavailable");
            return AdvisorReply::text_only(KB_UNAVAILABLE, false);
        }

        // Lazy index load. A load failure is terminal for this query, not
        // for the process.
        if self.index.is_none() {
            match VectorIndex::load(&self.index_path, &self.metadata_path) {
                Ok(index) => self.index = Some(index),
                Err(e) => {
                    warn!(error = %e, "semantic index load failed");
                    return AdvisorReply::text_only(KB_UNAVAILABLE, false);
                }
            }
        }

        // Expansion touches only the embedded text; prompts and the log see
        // the raw query.
        let expanded = intent::expand_query(query, &self.retrieval.expansions);
        let query_vector = match self.model.embed_one(&expanded).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed");
                return AdvisorReply::text_only(
                    format!(
                        "I apologize, but I encountered an error while processing \
                         your question: {e}"
                    ),
                    false,
                );
            }
        };

        let Some(index) = self.index.as_ref() else {
            return AdvisorReply::text_only(KB_UNAVAILABLE, false);
        };
        let hits = index.search(&query_vector, self.retrieval.top_k);
        let fragments = index.resolve(&hits);
        debug!(fragments = fragments.len(), "retrieval complete");

        // Distinct courses in first-seen order, with the URL each fragment
        // carries.
        let mut retrieved: Vec<(String, String)> = Vec::new();
        for meta in &fragments {
            if !retrieved.iter().any(|(t, _)| t == &meta.source_course_title) {
                retrieved.push((meta.source_course_title.clone(), meta.source_url.clone()));
            }
        }

        let query_intent = intent::classify(query);
        let target = self.resolve_target(session, query, &retrieved, query_intent);

        // One bounded fetch of the target course page; any failure or an
        // empty page degrades to static fragment context only.
        let dynamic_context = match &target {
            Some(title) => self.fetch_dynamic(title, &retrieved).await,
            None => None,
        };

        let static_context = fragments
            .iter()
            .map(|m| m.fragment_text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        if static_context.is_empty() && dynamic_context.is_none() {
            info!("no static or dynamic context, skipping model call");
            return AdvisorReply::text_only(NOTHING_FOUND, query_intent.specific_detail);
        }

        let display = resolve::prioritize_courses(
            &retrieved.iter().map(|(t, _)| t.clone()).collect::<Vec<_>>(),
            &self.retrieval.deprioritize_title_terms,
            self.retrieval.max_display_courses,
        );

        let text = if query_intent.specific_detail {
            self.answer_detail(session, query, query_intent, &target, &retrieved, dynamic_context)
                .await
        } else {
            self.answer_general(session, query, &static_context, dynamic_context, &display, &retrieved)
                .await
        };

        session.push_exchange(query, text.clone());
        if !query_intent.specific_detail {
            if let Some(title) = &target {
                session.set_last_discussed(title.clone());
            }
        }

        let rows = self.build_rows(&display).await;

        AdvisorReply {
            text,
            rows,
            specific_detail: query_intent.specific_detail,
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline steps
    // -----------------------------------------------------------------------

    /// Resolve the course this query is about. An explicit mention wins and
    /// overwrites "last discussed" immediately; a detail follow-up reuses
    /// the last discussed course; anything else falls back to the top hit.
    fn resolve_target(
        &self,
        session: &mut SessionState,
        query: &str,
        retrieved: &[(String, String)],
        query_intent: QueryIntent,
    ) -> Option<String> {
        if let Some(course) = resolve::find_explicit_course(&self.catalog, query) {
            session.set_last_discussed(course.title.clone());
            return Some(course.title.clone());
        }
        if query_intent.specific_detail {
            if let Some(last) = session.last_discussed() {
                return Some(last.to_string());
            }
        }
        retrieved.first().map(|(title, _)| title.clone())
    }

    /// URL for a resolved course, preferring the catalog record over the
    /// URL carried by the retrieved fragment.
    fn url_for(&self, title: &str, retrieved: &[(String, String)]) -> Option<String> {
        if let Some(url) = self.catalog.url_for(title) {
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }
        retrieved
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, url)| url.clone())
    }

    async fn fetch_dynamic(&self, title: &str, retrieved: &[(String, String)]) -> Option<String> {
        let url = self.url_for(title, retrieved)?;
        match self.fetcher.fetch_text(&url).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => {
                debug!(course = %title, "course page had no extractable content");
                None
            }
            Err(e) => {
                warn!(course = %title, error = %e, "course page fetch failed");
                None
            }
        }
    }

    /// Specific-detail answer: extraction over freshly scraped content. No
    /// dynamic context means the fact cannot be verified, so the fixed
    /// fallback sentence is returned without a model call.
    async fn answer_detail(
        &self,
        session: &SessionState,
        query: &str,
        query_intent: QueryIntent,
        target: &Option<String>,
        retrieved: &[(String, String)],
        dynamic_context: Option<String>,
    ) -> String {
        let title = match target {
            Some(t) => t.clone(),
            None => return NOTHING_FOUND.to_string(),
        };
        let url = self.url_for(&title, retrieved).unwrap_or_default();

        let Some(context) = dynamic_context else {
            return format!(
                "{}\n\n{}",
                prompts::NOT_AVAILABLE_SENTENCE,
                prompts::url_suffix(&url)
            );
        };

        let prompt = if query_intent.schedule_related {
            prompts::schedule_prompt(&title, query, &context, &url)
        } else {
            prompts::fact_prompt(&title, query, &context, &url)
        };
        self.generate(prompt, session, query).await
    }

    /// General answer: recommendation prompt over static fragments plus any
    /// dynamic content, with pre-built per-course summary blocks.
    async fn answer_general(
        &self,
        session: &SessionState,
        query: &str,
        static_context: &str,
        dynamic_context: Option<String>,
        display: &[String],
        retrieved: &[(String, String)],
    ) -> String {
        let mut context = static_context.to_string();
        if let Some(dynamic) = dynamic_context {
            if !context.is_empty() {
                context.push_str("\n\n");
            }
            context.push_str(&dynamic);
        }

        let summaries: Vec<String> = display
            .iter()
            .filter_map(|title| self.catalog.get(title))
            .map(prompts::course_summary_block)
            .collect();
        let urls: Vec<String> = retrieved.iter().map(|(_, url)| url.clone()).collect();

        let prompt = prompts::recommendation_prompt(query, &context, &summaries, &urls);
        self.generate(prompt, session, query).await
    }

    /// One completion call with the bounded history and the raw query as
    /// the final turn. Transport failures become an apology string so the
    /// caller always gets valid text.
    async fn generate(&self, system_prompt: String, session: &SessionState, query: &str) -> String {
        let mut messages = Vec::with_capacity(session.history_len() * 2 + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(session.history_messages());
        messages.push(ChatMessage::user(query));

        match self.model.complete(&messages, &CompletionOptions::default()).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "completion failed");
                format!(
                    "I apologize, but I encountered an error communicating with \
                     the AI service: {e}"
                )
            }
        }
    }

    /// Build the structured table: seed each row from the catalog, re-fetch
    /// the course page, and overlay pattern and model extractions. A failed
    /// fetch keeps the seeded row.
    async fn build_rows(&self, display: &[String]) -> Vec<CourseRow> {
        let mut rows = Vec::with_capacity(display.len());
        for title in display {
            let Some(record) = self.catalog.get(title) else {
                warn!(course = %title, "retrieved course missing from catalog, skipping row");
                continue;
            };
            let mut row = CourseRow::from_record(record);
            if !row.url.is_empty() {
                match self.fetcher.fetch_text(&row.url).await {
                    Ok(text) if !text.is_empty() => {
                        extract::enrich_row(&mut row, &text, &self.model).await;
                    }
                    Ok(_) => debug!(course = %title, "course page empty, keeping seeded row"),
                    Err(e) => warn!(course = %title, error = %e, "row fetch failed, keeping seeded row"),
                }
            }
            rows.push(row);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseadvisor_shared::{CourseRecord, FragmentMeta};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(page_base: &str) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert(CourseRecord {
            title: "Specialist Diploma in Construction Management (SDCM)".into(),
            url: format!("{page_base}/sdcm"),
            description: "Construction management for site professionals.".into(),
            course_code: Some("SDCM".into()),
            ..Default::default()
        });
        catalog.insert(CourseRecord {
            title: "Modular Certificate in Digital Delivery".into(),
            url: format!("{page_base}/mcdd"),
            description: "Digital delivery workflows.".into(),
            ..Default::default()
        });
        catalog
    }

    fn index() -> VectorIndex {
        let meta = vec![
            FragmentMeta {
                fragment_text: "Construction management for site professionals.".into(),
                source_course_title: "Specialist Diploma in Construction Management (SDCM)".into(),
                source_url: "https://example.com/sdcm".into(),
            },
            FragmentMeta {
                fragment_text: "Digital delivery workflows.".into(),
                source_course_title: "Modular Certificate in Digital Delivery".into(),
                source_url: "https://example.com/mcdd".into(),
            },
        ];
        VectorIndex::from_parts(2, vec![0.0, 0.0, 1.0, 0.0], meta).unwrap()
    }

    fn clients(base: &str) -> (PageFetcher, ModelClient) {
        let fetcher = PageFetcher::new(2).unwrap();
        let model = ModelClient::new(base, "test-key".into(), "chat", "embed").unwrap();
        (fetcher, model)
    }

    async fn mount_embeddings(server: &MockServer) {
        let body = serde_json::json!({"data": [{"index": 0, "embedding": [0.0, 0.0]}]});
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn mount_completions(server: &MockServer, content: &str) {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn empty_catalog_short_circuits_without_service_calls() {
        // Unroutable endpoint: any service call would error loudly.
        let (fetcher, model) = clients("http://127.0.0.1:1");
        let mut advisor = Advisor::with_index(
            Catalog::new(),
            RetrievalConfig::default(),
            index(),
            fetcher,
            model,
        );
        let mut session = SessionState::new(5);

        let reply = advisor.answer(&mut session, "recommend courses").await;
        assert_eq!(reply.text, KB_UNAVAILABLE);
        assert!(reply.rows.is_empty());
        assert!(!reply.specific_detail);
        assert_eq!(session.history_len(), 0);
    }

    #[tokio::test]
    async fn missing_index_artifacts_degrade_to_unavailable() {
        let (fetcher, model) = clients("http://127.0.0.1:1");
        let mut advisor = Advisor::new(
            catalog("https://example.com"),
            RetrievalConfig::default(),
            PathBuf::from("/nonexistent/fragments.vec"),
            PathBuf::from("/nonexistent/fragments.meta.json"),
            fetcher,
            model,
        );
        let mut session = SessionState::new(5);

        let reply = advisor.answer(&mut session, "recommend courses").await;
        assert_eq!(reply.text, KB_UNAVAILABLE);
        assert!(reply.rows.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_returns_inline_error_without_session_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (fetcher, model) = clients(&server.uri());
        let mut advisor = Advisor::with_index(
            catalog(&server.uri()),
            RetrievalConfig::default(),
            index(),
            fetcher,
            model,
        );
        let mut session = SessionState::new(5);
        session.set_last_discussed("Modular Certificate in Digital Delivery");

        let reply = advisor.answer(&mut session, "recommend courses").await;
        assert!(reply.text.contains("I apologize"));
        assert_eq!(session.history_len(), 0);
        assert_eq!(
            session.last_discussed(),
            Some("Modular Certificate in Digital Delivery")
        );
    }

    #[tokio::test]
    async fn general_query_generates_and_sets_last_discussed_to_top_hit() {
        let server = MockServer::start().await;
        mount_embeddings(&server).await;
        mount_completions(&server, "1. Specialist Diploma in Construction Management...").await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<p>EVENT CODE: CRS7001</p><p>Fee S$5,350.00 over 12 months</p>",
            ))
            .mount(&server)
            .await;

        let (fetcher, model) = clients(&server.uri());
        let mut advisor = Advisor::with_index(
            catalog(&server.uri()),
            RetrievalConfig::default(),
            index(),
            fetcher,
            model,
        );
        let mut session = SessionState::new(5);

        let reply = advisor
            .answer(&mut session, "Recommend courses for project managers")
            .await;

        assert!(reply.text.starts_with("1. Specialist Diploma"));
        assert!(!reply.specific_detail);
        // Query vector [0,0] is nearest the SDCM fragment.
        assert_eq!(
            session.last_discussed(),
            Some("Specialist Diploma in Construction Management (SDCM)")
        );
        assert_eq!(session.history_len(), 1);

        // Both courses become rows, enriched from the mocked page.
        assert_eq!(reply.rows.len(), 2);
        assert_eq!(reply.rows[0].course_code.as_deref(), Some("CRS7001"));
        assert_eq!(reply.rows[0].price.as_deref(), Some("S$5,350.00"));
        assert_eq!(reply.rows[0].duration.as_deref(), Some("12 months"));
    }

    #[tokio::test]
    async fn detail_follow_up_with_failed_fetch_degrades_to_fixed_sentence() {
        let server = MockServer::start().await;
        mount_embeddings(&server).await;
        // Course pages are gone; no completion mock is mounted because no
        // model call may happen on this path.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (fetcher, model) = clients(&server.uri());
        let mut advisor = Advisor::with_index(
            catalog(&server.uri()),
            RetrievalConfig::default(),
            index(),
            fetcher,
            model,
        );
        let mut session = SessionState::new(5);
        session.set_last_discussed("Specialist Diploma in Construction Management (SDCM)");

        let reply = advisor.answer(&mut session, "What are the fees?").await;

        assert!(reply.specific_detail);
        assert!(reply.text.starts_with(prompts::NOT_AVAILABLE_SENTENCE));
        assert!(reply.text.contains(&format!("{}/sdcm", server.uri())));
        // A detail follow-up never overwrites the discussion context.
        assert_eq!(
            session.last_discussed(),
            Some("Specialist Diploma in Construction Management (SDCM)")
        );
        assert_eq!(session.history_len(), 1);
    }

    #[tokio::test]
    async fn explicit_mention_overwrites_last_discussed() {
        let server = MockServer::start().await;
        mount_embeddings(&server).await;
        mount_completions(&server, "The fee is S$5,350.00.").await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<p>Full fee S$5,350.00</p>"),
            )
            .mount(&server)
            .await;

        let (fetcher, model) = clients(&server.uri());
        let mut advisor = Advisor::with_index(
            catalog(&server.uri()),
            RetrievalConfig::default(),
            index(),
            fetcher,
            model,
        );
        let mut session = SessionState::new(5);
        session.set_last_discussed("Modular Certificate in Digital Delivery");

        let reply = advisor.answer(&mut session, "What are the fees for SDCM?").await;

        assert!(reply.specific_detail);
        assert_eq!(reply.text, "The fee is S$5,350.00.");
        assert_eq!(
            session.last_discussed(),
            Some("Specialist Diploma in Construction Management (SDCM)")
        );
    }
}
