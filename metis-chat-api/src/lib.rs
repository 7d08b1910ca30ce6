//! REST client for the MetisAI chat backend
//!
//! [`ChatBackend`] is the seam the session store talks through;
//! [`ApiClient`] is its HTTP implementation.

pub mod base;
pub mod client;

pub use base::{ApiError, ApiResult, ChatBackend};
pub use client::ApiClient;
