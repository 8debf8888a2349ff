//! Query-time advisory engine: intent classification, course resolution,
//! retrieval orchestration, prompt assembly, and row extraction.
//!
//! The [`Advisor`] owns the catalog, index, and service clients; callers
//! own a [`SessionState`] per conversation and pass it into every
//! [`Advisor::answer`] call.

pub mod extract;
pub mod intent;
pub mod orchestrator;
pub mod prompts;
pub mod resolve;
pub mod session;

pub use intent::{QueryIntent, classify, expand_query};
pub use orchestrator::{Advisor, AdvisorReply};
pub use resolve::{find_explicit_course, prioritize_courses};
pub use session::{Exchange, SessionState};
