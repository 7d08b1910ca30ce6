//! Scripted in-memory backend for store tests

use async_trait::async_trait;
use metis_chat_api::{ApiError, ApiResult, ChatBackend};
use metis_chat_core::config::{ApiConfig, ApiConfigUpdate};
use metis_chat_core::session::{Message, Role, Session};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// A scripted response, optionally held back until a gate is released
pub struct Reply<T> {
    result: ApiResult<T>,
    gate: Option<oneshot::Receiver<()>>,
}

impl<T> Reply<T> {
    pub fn ok(value: T) -> Self {
        Self {
            result: Ok(value),
            gate: None,
        }
    }

    pub fn err(error: ApiError) -> Self {
        Self {
            result: Err(error),
            gate: None,
        }
    }

    /// Hold the reply until the returned sender fires
    pub fn gated(value: T) -> (Self, oneshot::Sender<()>) {
        Self::ok(value).held()
    }

    /// Hold this reply, success or failure, until the returned sender fires
    pub fn held(mut self) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        self.gate = Some(rx);
        (self, tx)
    }

    async fn resolve(self) -> ApiResult<T> {
        if let Some(gate) = self.gate {
            let _ = gate.await;
        }
        self.result
    }
}

#[derive(Default)]
pub struct FakeBackend {
    config: Mutex<ApiConfig>,
    creates: Mutex<VecDeque<Reply<Session>>>,
    sends: Mutex<VecDeque<Reply<Message>>>,
    lists: Mutex<VecDeque<Reply<Vec<Session>>>>,
    gets: Mutex<VecDeque<Reply<Session>>>,
    /// Operations in call order, e.g. `send:s1:Hello`
    pub calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(ApiConfig::new("sk-test", "bot-1", "http://fake")),
            ..Default::default()
        }
    }

    pub fn on_create(&self, reply: Reply<Session>) {
        self.creates.lock().push_back(reply);
    }

    pub fn on_send(&self, reply: Reply<Message>) {
        self.sends.lock().push_back(reply);
    }

    pub fn on_list(&self, reply: Reply<Vec<Session>>) {
        self.lists.lock().push_back(reply);
    }

    pub fn on_get(&self, reply: Reply<Session>) {
        self.gets.lock().push_back(reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

fn unscripted<T>(operation: &str) -> Reply<T> {
    Reply::err(ApiError::Status {
        status: 599,
        body: format!("no scripted reply for {}", operation),
    })
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn create_session(&self, initial_message: &str) -> ApiResult<Session> {
        self.record(format!("create:{}", initial_message));
        let reply = self.creates.lock().pop_front();
        reply.unwrap_or_else(|| unscripted("create")).resolve().await
    }

    async fn send_message(&self, session_id: &str, content: &str) -> ApiResult<Message> {
        self.record(format!("send:{}:{}", session_id, content));
        let reply = self.sends.lock().pop_front();
        reply.unwrap_or_else(|| unscripted("send")).resolve().await
    }

    async fn list_sessions(&self) -> ApiResult<Vec<Session>> {
        self.record("list".to_string());
        let reply = self.lists.lock().pop_front();
        reply.unwrap_or_else(|| unscripted("list")).resolve().await
    }

    async fn get_session(&self, session_id: &str) -> ApiResult<Session> {
        self.record(format!("get:{}", session_id));
        let reply = self.gets.lock().pop_front();
        reply.unwrap_or_else(|| unscripted("get")).resolve().await
    }

    fn update_config(&self, update: ApiConfigUpdate) {
        self.config.lock().apply(update);
    }

    fn config(&self) -> ApiConfig {
        self.config.lock().clone()
    }
}

pub fn message(id: &str, role: Role, content: &str) -> Message {
    Message {
        id: Some(id.to_string()),
        ..Message::new(role, content)
    }
}

pub fn session(id: &str, messages: Vec<Message>) -> Session {
    Session {
        id: id.to_string(),
        bot_id: "bot-1".to_string(),
        user: None,
        messages,
        start_date: 1_700_000_000_000,
    }
}

pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().filter_map(|m| m.id.clone()).collect()
}
