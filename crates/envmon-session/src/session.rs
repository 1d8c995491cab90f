//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User record as serialized by the backend. Unknown fields are ignored;
/// fields absent on older deployments default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_status: i64,
    #[serde(default)]
    pub user_role: i64,
    #[serde(default)]
    pub user_type: i64,
    #[serde(default)]
    pub area_code: Option<String>,
    #[serde(default)]
    pub last_logon_time: Option<String>,
    #[serde(default)]
    pub token: String,
}

/// Login response body handed to [`SessionManager::login`] after the
/// server accepted the credentials.
///
/// [`SessionManager::login`]: crate::SessionManager::login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub user: User,
}

/// The three states of the session machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No valid session
    Anonymous,
    /// Base session established via login or restoration
    Authenticated,
    /// Secondary token set on top of the base session
    Authorized,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Anonymous => "anonymous",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Authorized => "authorized",
        }
    }
}

/// Snapshot of the tab's session state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub authenticated: bool,
    pub authorized: bool,
    pub user: Option<User>,
    /// Start of the elapsed-session clock, offset-adjusted at login
    pub session_start: Option<DateTime<Utc>>,
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        if self.authenticated && self.authorized {
            SessionPhase::Authorized
        } else if self.authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }
}
