//! Console configuration

use serde::{Deserialize, Serialize};

/// Deployment instance key. Persisted sessions written by a different
/// build are ignored during restoration when this does not match.
pub const SESSION_KEY: &str = "dGNhZG1pbjp0ZXN0MTIz";

const DEV_BASE_URL: &str = "http://localhost:8080/api/v1/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend API base URL
    pub base_url: String,
    /// Deployment instance key
    pub session_key: String,
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_key: SESSION_KEY.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEV_BASE_URL)
    }
}
