//! Chat state snapshot

use metis_chat_core::session::{Message, Session};
use std::collections::HashMap;

/// Everything the UI renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    /// Known sessions, most recent first
    pub sessions: Vec<Session>,
    pub current_session_id: Option<String>,
    /// Messages per session id, oldest first
    pub messages: HashMap<String, Vec<Message>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl ChatState {
    pub fn current_session(&self) -> Option<&Session> {
        let id = self.current_session_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Messages of the current session; empty when none is selected
    pub fn current_messages(&self) -> &[Message] {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.messages.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
