//! Session data structures

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utils::{is_temporary_id, now_millis, temp_id};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Ai => "AI",
        }
    }
}

/// Message timestamp as delivered by the server: epoch millis or an RFC 3339 string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl Timestamp {
    /// Timestamp for "now", in the ISO form the client uses for local messages
    pub fn now() -> Self {
        Timestamp::Text(Utc::now().to_rfc3339())
    }

    /// Normalize to a UTC datetime, if the value can be interpreted
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Timestamp::Fractional(ms) => Utc.timestamp_millis_opt(ms.round() as i64).single(),
            Timestamp::Text(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| raw.parse::<i64>().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single())),
        }
    }
}

/// Billing information attached to an AI reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Billing {
    pub cost: f64,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server id, or a `temp-` id for optimistic local messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<Billing>,
}

impl Message {
    /// Create a message with no id, timestamp or metadata
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            attachments: None,
            timestamp: None,
            finish_reason: None,
            citations: None,
            tool_calls: None,
            rag: None,
            billing: None,
        }
    }

    /// Create an optimistic user message with a temporary id and the current time
    pub fn optimistic_user(content: impl Into<String>) -> Self {
        Self {
            id: Some(temp_id()),
            timestamp: Some(Timestamp::now()),
            ..Self::new(Role::User, content)
        }
    }

    /// Whether this message was created locally and not yet confirmed
    pub fn is_temporary(&self) -> bool {
        self.id.as_deref().map(is_temporary_id).unwrap_or(false)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_ref().and_then(Timestamp::to_datetime)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Session payloads nest the body under `message`; replies are flat.
        #[derive(Deserialize)]
        struct Body {
            #[serde(rename = "type")]
            role: Role,
            #[serde(default)]
            content: Option<String>,
            #[serde(default)]
            attachments: Option<Vec<Value>>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Helper {
            #[serde(default)]
            id: Option<String>,
            #[serde(default, rename = "type")]
            role: Option<Role>,
            #[serde(default)]
            content: Option<String>,
            #[serde(default)]
            attachments: Option<Vec<Value>>,
            #[serde(default)]
            timestamp: Option<Timestamp>,
            #[serde(default)]
            finish_reason: Option<String>,
            #[serde(default)]
            citations: Option<Vec<Value>>,
            #[serde(default)]
            tool_calls: Option<Vec<Value>>,
            #[serde(default)]
            rag: Option<Value>,
            #[serde(default)]
            billing: Option<Billing>,
            #[serde(default)]
            message: Option<Body>,
        }

        let helper = Helper::deserialize(deserializer)?;
        let (role, content, attachments) = match (helper.role, helper.message) {
            (Some(role), body) => {
                let body_content = body.as_ref().and_then(|b| b.content.clone());
                let body_attachments = body.and_then(|b| b.attachments);
                (
                    role,
                    helper.content.or(body_content),
                    helper.attachments.or(body_attachments),
                )
            }
            (None, Some(body)) => (
                body.role,
                helper.content.or(body.content),
                helper.attachments.or(body.attachments),
            ),
            (None, None) => return Err(serde::de::Error::missing_field("type")),
        };

        Ok(Self {
            id: helper.id,
            role,
            content: content.unwrap_or_default(),
            attachments,
            timestamp: helper.timestamp,
            finish_reason: helper.finish_reason,
            citations: helper.citations,
            tool_calls: helper.tool_calls,
            rag: helper.rag,
            billing: helper.billing,
        })
    }
}

/// User reference attached to a session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A conversation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Bot the session belongs to
    #[serde(default)]
    pub bot_id: String,
    #[serde(default)]
    pub user: Option<User>,
    /// Messages exactly as delivered by the server
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Start time in epoch milliseconds
    #[serde(default)]
    pub start_date: i64,
}

impl Session {
    /// Create a local placeholder session with a temporary id
    pub fn temporary(bot_id: impl Into<String>) -> Self {
        Self {
            id: temp_id(),
            bot_id: bot_id.into(),
            user: None,
            messages: Vec::new(),
            start_date: now_millis(),
        }
    }

    /// Whether this session exists only locally
    pub fn is_temporary(&self) -> bool {
        is_temporary_id(&self.id)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start_date).single()
    }
}
