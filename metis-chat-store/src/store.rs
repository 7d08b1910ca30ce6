//! Chat session store
//!
//! Actions take `&self`; state changes happen in short critical sections
//! that are never held across an `.await`. Results of network calls are
//! committed only if no newer request or local edit superseded them.

use metis_chat_api::{ApiError, ChatBackend};
use metis_chat_core::session::{normalize_messages, Message, RawOrder, Session};
use metis_chat_core::utils::is_temporary_id;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::state::ChatState;

/// Mutable store internals
#[derive(Default)]
struct Inner {
    state: ChatState,
    /// Requests started and not yet resolved
    in_flight: usize,
    /// Monotonic counter handing out request/edit epochs
    epoch: u64,
    /// Epoch of the latest `fetch_sessions` call
    list_epoch: u64,
    /// Epoch of the latest fetch or local edit per session id
    session_epochs: HashMap<String, u64>,
    /// Epoch at which a session appeared locally (new chat or confirmed create)
    added_epochs: HashMap<String, u64>,
}

impl Inner {
    fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn touch_session(&mut self, id: &str) -> u64 {
        let epoch = self.next_epoch();
        self.session_epochs.insert(id.to_string(), epoch);
        epoch
    }

    fn session_epoch(&self, id: &str) -> u64 {
        self.session_epochs.get(id).copied().unwrap_or(0)
    }

    fn begin_request(&mut self) {
        self.in_flight += 1;
        self.state.is_loading = true;
        self.state.error = None;
    }

    fn finish_request(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.state.is_loading = self.in_flight > 0;
    }

    fn fail(&mut self, context: &str, err: &ApiError) {
        let message = format!("{}: {}", context, err);
        error!("{}", message);
        self.state.error = Some(message);
    }
}

/// Chat session store shared by every view of the client
pub struct ChatStore {
    backend: Arc<dyn ChatBackend>,
    history_order: RawOrder,
    inner: Mutex<Inner>,
}

impl ChatStore {
    /// Create an empty store; list/get payloads are assumed newest-first
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            history_order: RawOrder::default(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Set how untimestamped list/get payloads are ordered
    pub fn with_history_order(mut self, order: RawOrder) -> Self {
        self.history_order = order;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    /// Load all sessions of the configured bot.
    ///
    /// Replaces the session list, merges each session's messages into the
    /// message map and selects the first session if none is current.
    /// Sessions created locally after the request started stay at the front.
    /// On failure the existing state is kept and `error` is set, unless a
    /// newer list request has already started.
    pub async fn fetch_sessions(&self) {
        let ticket = {
            let mut inner = self.inner.lock();
            inner.begin_request();
            let ticket = inner.next_epoch();
            inner.list_epoch = ticket;
            ticket
        };

        let result = self.backend.list_sessions().await;

        let mut inner = self.inner.lock();
        inner.finish_request();
        if inner.list_epoch != ticket {
            debug!("Discarding superseded session list");
            return;
        }
        let sessions = match result {
            Ok(sessions) => sessions,
            Err(e) => {
                inner.fail("Failed to fetch chat sessions", &e);
                return;
            }
        };

        for session in &sessions {
            // Keep local edits made while the list was in flight.
            if inner.session_epoch(&session.id) > ticket {
                debug!("Keeping newer local messages for session {}", session.id);
                continue;
            }
            let messages = normalize_messages(&session.messages, self.history_order);
            inner.state.messages.insert(session.id.clone(), messages);
        }

        // Sessions added locally after the request started are not in the list yet.
        let mut merged: Vec<Session> = inner
            .state
            .sessions
            .iter()
            .filter(|s| inner.added_epochs.get(&s.id).is_some_and(|&e| e > ticket))
            .filter(|s| sessions.iter().all(|listed| listed.id != s.id))
            .cloned()
            .collect();
        info!(
            "Fetched {} chat sessions ({} kept locally)",
            sessions.len(),
            merged.len()
        );
        merged.extend(sessions);
        inner.added_epochs.retain(|_, e| *e > ticket);

        if inner.state.current_session_id.is_none() {
            inner.state.current_session_id = merged.first().map(|s| s.id.clone());
        }
        inner.state.sessions = merged;
    }

    /// Refetch one session and overwrite only its message list.
    ///
    /// Temporary sessions are unknown to the server and are skipped.
    pub async fn fetch_session_by_id(&self, session_id: &str) {
        if is_temporary_id(session_id) {
            debug!("Skipping fetch of temporary session {}", session_id);
            return;
        }

        let ticket = {
            let mut inner = self.inner.lock();
            inner.begin_request();
            inner.touch_session(session_id)
        };

        let result = self.backend.get_session(session_id).await;

        let mut inner = self.inner.lock();
        inner.finish_request();
        if inner.session_epoch(session_id) != ticket {
            debug!("Discarding superseded fetch of session {}", session_id);
            return;
        }
        match result {
            Ok(session) => {
                let messages = normalize_messages(&session.messages, self.history_order);
                inner.state.messages.insert(session_id.to_string(), messages);
            }
            Err(e) => inner.fail("Failed to fetch chat session", &e),
        }
    }

    /// Start a new local chat without contacting the server.
    ///
    /// The session is created on the backend when its first message is sent.
    pub fn create_new_chat(&self) -> String {
        let session = Session::temporary(self.backend.bot_id());
        let id = session.id.clone();

        let mut inner = self.inner.lock();
        inner.state.sessions.insert(0, session);
        inner.state.messages.insert(id.clone(), Vec::new());
        let added = inner.next_epoch();
        inner.added_epochs.insert(id.clone(), added);
        inner.state.current_session_id = Some(id.clone());
        inner.state.error = None;
        debug!("Created temporary session {}", id);
        id
    }

    /// Send a message in the current session.
    ///
    /// The user message appears immediately. Failures are reported through
    /// `error`; the optimistic message stays in place.
    pub async fn send_message(&self, content: &str) {
        // Already recorded in `error`.
        let _ = self.send(content).await;
    }

    /// Create a chat and send its first message, returning the server session id.
    ///
    /// Unlike the other actions this returns the failure to the caller, in
    /// addition to recording it in `error`.
    pub async fn start_conversation(&self, content: &str) -> Result<String, StoreError> {
        self.create_new_chat();
        self.send(content).await
    }

    async fn send(&self, content: &str) -> Result<String, StoreError> {
        let session_id = {
            let mut inner = self.inner.lock();
            let Some(session_id) = inner.state.current_session_id.clone() else {
                warn!("Message dropped: no active chat session");
                inner.state.error = Some(StoreError::NoActiveSession.to_string());
                return Err(StoreError::NoActiveSession);
            };
            inner
                .state
                .messages
                .entry(session_id.clone())
                .or_default()
                .push(Message::optimistic_user(content));
            inner.touch_session(&session_id);
            inner.begin_request();
            session_id
        };

        if is_temporary_id(&session_id) {
            self.create_remote_session(&session_id, content).await
        } else {
            self.post_message(&session_id, content).await
        }
    }

    async fn create_remote_session(
        &self,
        temp_id: &str,
        content: &str,
    ) -> Result<String, StoreError> {
        let result = self.backend.create_session(content).await;

        let mut inner = self.inner.lock();
        inner.finish_request();
        let session = match result {
            Ok(session) => session,
            Err(e) => {
                inner.fail("Failed to create new chat", &e);
                return Err(e.into());
            }
        };

        let new_id = session.id.clone();
        // The response embeds the conversation in order, starting with our message.
        let messages = normalize_messages(&session.messages, RawOrder::OldestFirst);

        inner.state.sessions.retain(|s| s.id != temp_id && s.id != new_id);
        inner.state.sessions.insert(0, session);
        inner.state.messages.remove(temp_id);
        inner.state.messages.insert(new_id.clone(), messages);
        inner.session_epochs.remove(temp_id);
        inner.added_epochs.remove(temp_id);
        let confirmed = inner.touch_session(&new_id);
        inner.added_epochs.insert(new_id.clone(), confirmed);

        if inner.state.current_session_id.as_deref() == Some(temp_id) {
            inner.state.current_session_id = Some(new_id.clone());
        } else {
            debug!("Session {} confirmed after the user switched away", new_id);
        }
        info!("Temporary session {} confirmed as {}", temp_id, new_id);
        Ok(new_id)
    }

    async fn post_message(&self, session_id: &str, content: &str) -> Result<String, StoreError> {
        let result = self.backend.send_message(session_id, content).await;

        let mut inner = self.inner.lock();
        inner.finish_request();
        match result {
            Ok(reply) => {
                inner
                    .state
                    .messages
                    .entry(session_id.to_string())
                    .or_default()
                    .push(reply);
                inner.touch_session(session_id);
                Ok(session_id.to_string())
            }
            Err(e) => {
                inner.fail("Failed to send message", &e);
                Err(e.into())
            }
        }
    }

    /// Make `session_id` current; the id is not validated
    pub fn set_current_session(&self, session_id: impl Into<String>) {
        self.inner.lock().state.current_session_id = Some(session_id.into());
    }

    pub fn reset_error(&self) {
        self.inner.lock().state.error = None;
    }

    /// Clone of the full state
    pub fn snapshot(&self) -> ChatState {
        self.inner.lock().state.clone()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.inner.lock().state.sessions.clone()
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.inner.lock().state.current_session_id.clone()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.inner.lock().state.current_session().cloned()
    }

    pub fn current_messages(&self) -> Vec<Message> {
        self.inner.lock().state.current_messages().to_vec()
    }

    pub fn messages_for(&self, session_id: &str) -> Option<Vec<Message>> {
        self.inner.lock().state.messages.get(session_id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().state.is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().state.error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_tracks_overlapping_requests() {
        let mut inner = Inner::default();
        inner.begin_request();
        inner.begin_request();
        inner.finish_request();
        assert!(inner.state.is_loading);
        inner.finish_request();
        assert!(!inner.state.is_loading);
        inner.finish_request();
        assert_eq!(inner.in_flight, 0);
    }

    #[test]
    fn test_touch_session_is_monotonic() {
        let mut inner = Inner::default();
        let first = inner.touch_session("s1");
        let second = inner.touch_session("s1");
        assert!(second > first);
        assert_eq!(inner.session_epoch("s1"), second);
        assert_eq!(inner.session_epoch("unknown"), 0);
    }
}
