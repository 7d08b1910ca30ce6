//! Core types and utilities for metis-chat
//!
//! This crate provides the chat data model, configuration, credential
//! persistence and logging shared by the API client, the session store
//! and the CLI.

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod testing;
