//! Per-session conversation state.
//!
//! Owned by the caller and passed into every orchestrator call, so two
//! sessions never share hidden state. Holds a bounded FIFO of recent
//! exchanges plus the "last discussed course" reference used to resolve
//! follow-up queries that name no course.

use std::collections::VecDeque;

use courseadvisor_shared::ChatMessage;

/// One completed query/reply exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub query: String,
    pub reply: String,
}

/// Conversation state for a single session.
#[derive(Debug)]
pub struct SessionState {
    history: VecDeque<Exchange>,
    history_limit: usize,
    last_discussed: Option<String>,
}

impl SessionState {
    /// Create an empty session keeping at most `history_limit` exchanges.
    pub fn new(history_limit: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(history_limit),
            history_limit,
            last_discussed: None,
        }
    }

    /// Append an exchange, evicting the oldest when at capacity.
    pub fn push_exchange(&mut self, query: impl Into<String>, reply: impl Into<String>) {
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(Exchange {
            query: query.into(),
            reply: reply.into(),
        });
    }

    /// Recent exchanges, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Exchange> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Flatten the history into role-tagged messages for the completion
    /// request, oldest first.
    pub fn history_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() * 2);
        for exchange in &self.history {
            messages.push(ChatMessage::user(exchange.query.clone()));
            messages.push(ChatMessage::assistant(exchange.reply.clone()));
        }
        messages
    }

    /// Title of the most recently discussed course, if any.
    pub fn last_discussed(&self) -> Option<&str> {
        self.last_discussed.as_deref()
    }

    /// Overwrite the last discussed course.
    pub fn set_last_discussed(&mut self, title: impl Into<String>) {
        self.last_discussed = Some(title.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_five_most_recent() {
        let mut session = SessionState::new(5);
        for i in 1..=6 {
            session.push_exchange(format!("query {i}"), format!("reply {i}"));
        }

        assert_eq!(session.history_len(), 5);
        let queries: Vec<_> = session.history().map(|e| e.query.as_str()).collect();
        // Oldest (query 1) evicted first.
        assert_eq!(queries, vec!["query 2", "query 3", "query 4", "query 5", "query 6"]);
    }

    #[test]
    fn history_messages_alternate_roles_oldest_first() {
        let mut session = SessionState::new(5);
        session.push_exchange("first", "answer one");
        session.push_exchange("second", "answer two");

        let messages = session.history_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "answer one");
        assert_eq!(messages[3].content, "answer two");
    }

    #[test]
    fn last_discussed_starts_empty() {
        let mut session = SessionState::new(5);
        assert!(session.last_discussed().is_none());
        session.set_last_discussed("Specialist Diploma in BIM (SDBIM)");
        assert_eq!(session.last_discussed(), Some("Specialist Diploma in BIM (SDBIM)"));
    }
}
