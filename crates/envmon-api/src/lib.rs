//! ENVMON API Client
//!
//! Thin HTTP collaborator for the console. Owns the backend base URL and
//! the session token; while a token is set it rides along as a `token`
//! header on every request.

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

pub type Result<T> = std::result::Result<T, ApiError>;
