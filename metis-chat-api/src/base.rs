//! Backend trait and error taxonomy

use async_trait::async_trait;
use metis_chat_core::config::{ApiConfig, ApiConfigUpdate};
use metis_chat_core::session::{Message, Session};
use thiserror::Error;

/// Error type for chat backend operations
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend rejected the credentials (401/403)
    #[error("Authentication failed (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON
    #[error("Invalid response: {0}")]
    Decode(String),

    /// A locally generated session id was about to be sent to the server
    #[error("Session {0} has not been created on the server yet")]
    TemporarySession(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations offered by the remote chat backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Create a session seeded with one user message; returns the server's session
    async fn create_session(&self, initial_message: &str) -> ApiResult<Session>;

    /// Post a user message to an existing session; returns the AI reply
    async fn send_message(&self, session_id: &str, content: &str) -> ApiResult<Message>;

    /// List all sessions of the configured bot
    async fn list_sessions(&self) -> ApiResult<Vec<Session>>;

    /// Fetch one session with its full history
    async fn get_session(&self, session_id: &str) -> ApiResult<Session>;

    /// Merge a partial configuration; applies to calls started afterwards
    fn update_config(&self, update: ApiConfigUpdate);

    /// Snapshot of the current configuration
    fn config(&self) -> ApiConfig;

    fn bot_id(&self) -> String {
        self.config().bot_id
    }
}
