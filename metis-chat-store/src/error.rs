//! Store error types

use metis_chat_api::ApiError;
use thiserror::Error;

/// Errors produced by store actions
#[derive(Error, Debug)]
pub enum StoreError {
    /// A message was sent while no session is current
    #[error("No active chat session")]
    NoActiveSession,

    /// The backend call failed
    #[error(transparent)]
    Api(#[from] ApiError),
}
