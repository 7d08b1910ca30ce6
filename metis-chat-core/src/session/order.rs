//! Message ordering normalization
//!
//! The store always keeps messages oldest-first so new messages can be
//! appended without re-sorting. Server payloads do not guarantee that order.

use serde::{Deserialize, Serialize};

use super::store::Message;

/// Order in which a payload delivers its messages when timestamps cannot decide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Return `raw` ordered oldest-first.
///
/// When every message carries an interpretable timestamp the messages are
/// stably sorted by it; otherwise `fallback` describes the payload order.
pub fn normalize_messages(raw: &[Message], fallback: RawOrder) -> Vec<Message> {
    let stamps: Option<Vec<_>> = raw.iter().map(Message::created_at).collect();

    match stamps {
        Some(stamps) if !raw.is_empty() => {
            let mut indexed: Vec<_> = stamps.into_iter().zip(raw.iter().cloned()).collect();
            indexed.sort_by_key(|(at, _)| *at);
            indexed.into_iter().map(|(_, msg)| msg).collect()
        }
        _ => match fallback {
            RawOrder::NewestFirst => raw.iter().rev().cloned().collect(),
            RawOrder::OldestFirst => raw.to_vec(),
        },
    }
}
