//! Chat session data model
//!
//! Sessions and messages as exchanged with the chat backend, plus the
//! ordering rules applied when they are ingested.

pub mod order;
pub mod store;

pub use order::{normalize_messages, RawOrder};
pub use store::{Billing, Message, Role, Session, Timestamp, User};
