//! HTTP client implementation

use async_trait::async_trait;
use metis_chat_core::config::{ApiConfig, ApiConfigUpdate};
use metis_chat_core::session::{Message, Role, Session, User};
use metis_chat_core::utils::is_temporary_id;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::base::{ApiError, ApiResult, ChatBackend};

/// Outgoing user message
#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    #[serde(rename = "type")]
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    bot_id: &'a str,
    user: Option<User>,
    initial_messages: Vec<OutgoingMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    message: OutgoingMessage<'a>,
}

/// MetisAI chat API client
///
/// The configuration is read when each call starts, so
/// [`ChatBackend::update_config`] affects every call not yet issued.
pub struct ApiClient {
    client: Client,
    config: RwLock<ApiConfig>,
}

impl ApiClient {
    /// Create a new client using the transport's default timeouts
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config: RwLock::new(config),
        }
    }

    /// Create a new client with a request timeout
    pub fn with_timeout(config: ApiConfig, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            warn!("Failed to build HTTP client: {}", e);
            ApiError::Network(e)
        })?;
        Ok(Self {
            client,
            config: RwLock::new(config),
        })
    }

    fn session_url(config: &ApiConfig, session_id: &str) -> ApiResult<String> {
        if is_temporary_id(session_id) {
            return Err(ApiError::TemporarySession(session_id.to_string()));
        }
        Ok(format!(
            "{}/chat/session/{}",
            config.base(),
            urlencoding::encode(session_id)
        ))
    }

    /// Start a request carrying the auth headers of `config`
    fn request(&self, config: &ApiConfig, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        operation: &str,
    ) -> ApiResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| {
                warn!("{} failed: {}", operation, e);
                ApiError::Network(e)
            })?;
        let body = Self::check_status(response, operation).await?;
        serde_json::from_str(&body).map_err(|e| {
            warn!("{} returned an unexpected body: {}", operation, e);
            ApiError::Decode(format!("{}: {}", operation, e))
        })
    }

    async fn check_status(response: Response, operation: &str) -> ApiResult<String> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        warn!("{} failed with HTTP {}", operation, status);
        let status_code = status.as_u16();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(ApiError::Auth {
                status: status_code,
                body,
            })
        } else {
            Err(ApiError::Status {
                status: status_code,
                body,
            })
        }
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn create_session(&self, initial_message: &str) -> ApiResult<Session> {
        let config = self.config();
        let url = format!("{}/chat/session", config.base());
        let request = CreateSessionRequest {
            bot_id: &config.bot_id,
            user: None,
            initial_messages: vec![OutgoingMessage {
                role: Role::User,
                content: initial_message,
            }],
        };

        debug!("Creating chat session for bot {}", config.bot_id);
        let session: Session = self
            .execute(
                self.request(&config, Method::POST, &url).json(&request),
                "create session",
            )
            .await?;
        debug!("Created chat session {}", session.id);
        Ok(session)
    }

    async fn send_message(&self, session_id: &str, content: &str) -> ApiResult<Message> {
        let config = self.config();
        let url = format!("{}/message", Self::session_url(&config, session_id)?);
        let request = SendMessageRequest {
            message: OutgoingMessage {
                role: Role::User,
                content,
            },
        };

        debug!("Sending message to session {}", session_id);
        self.execute(
            self.request(&config, Method::POST, &url).json(&request),
            "send message",
        )
        .await
    }

    async fn list_sessions(&self) -> ApiResult<Vec<Session>> {
        let config = self.config();
        let url = format!("{}/chat/session", config.base());

        debug!("Listing chat sessions for bot {}", config.bot_id);
        let builder = self
            .request(&config, Method::GET, &url)
            .query(&[("botId", config.bot_id.as_str())]);
        let sessions: Vec<Session> = self.execute(builder, "list sessions").await?;
        debug!("Listed {} chat sessions", sessions.len());
        Ok(sessions)
    }

    async fn get_session(&self, session_id: &str) -> ApiResult<Session> {
        let config = self.config();
        let url = Self::session_url(&config, session_id)?;

        debug!("Fetching chat session {}", session_id);
        self.execute(self.request(&config, Method::GET, &url), "get session")
            .await
    }

    fn update_config(&self, update: ApiConfigUpdate) {
        let mut config = self.config.write();
        config.apply(update);
        debug!("API config updated (bot {}, base {})", config.bot_id, config.base_url);
    }

    fn config(&self) -> ApiConfig {
        self.config.read().clone()
    }
}
