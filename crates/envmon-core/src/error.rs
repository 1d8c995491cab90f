//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] envmon_storage::StorageError),

    #[error("API error: {0}")]
    Api(#[from] envmon_api::ApiError),

    #[error("Session error: {0}")]
    Session(#[from] envmon_session::SessionError),
}
