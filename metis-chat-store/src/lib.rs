//! Client-side chat session state
//!
//! [`ChatStore`] is the single source of truth for what the user sees: the
//! known sessions, the active one, every session's messages and the
//! loading/error flags. It applies optimistic updates before the backend
//! confirms them and reconciles with the server's answer afterwards.

pub mod error;
pub mod state;
pub mod store;

pub use error::StoreError;
pub use state::ChatState;
pub use store::ChatStore;
