//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The backend reported no user for the given id.
    #[error("Not Matched")]
    NotMatched,

    /// A role-gated check ran without an authenticated user.
    #[error("No authenticated user")]
    NotAuthenticated,

    /// The store holds a session token but no user record.
    #[error("No persisted user record")]
    MissingUser,

    #[error("API error: {0}")]
    Api(#[from] envmon_api::ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] envmon_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
