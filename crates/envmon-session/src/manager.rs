//! Session Manager
//!
//! Holds the session state machine for one console tab and funnels every
//! mutation through it: login, restoration after a reload, the secondary
//! authorization token, and logout. Persistence keys are shared across
//! reloads of the same tab, never across tabs.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use envmon_api::ApiClient;
use envmon_storage::SessionStore;

use crate::error::SessionError;
use crate::session::{LoginData, Session, User};
use crate::settings::Settings;
use crate::status;
use crate::Result;

/// Persisted storage keys.
const KEY_SESSION_KEY: &str = "sessionkey";
const KEY_SESSION_TOKEN: &str = "sessionToken";
const KEY_USER: &str = "user";
const KEY_SETTINGS: &str = "settings";

/// Token set by the development-mode login path.
const DEV_TOKEN: &str = "envadmin";

/// Backend-reported logon times trail the console clock by nine hours.
const LOGON_SKEW_HOURS: i64 = 9;

pub struct SessionManager {
    /// In-memory session state
    state: Arc<RwLock<Session>>,
    /// Effective settings; starts as the bundled copy
    settings: Arc<RwLock<Settings>>,
    /// Deployment instance key persisted alongside the token
    session_key: String,
    /// Tab-scoped persistence
    store: SessionStore,
    /// Backend API client
    api: ApiClient,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: SessionStore, session_key: String, settings: Settings) -> Self {
        Self {
            state: Arc::new(RwLock::new(Session::default())),
            settings: Arc::new(RwLock::new(settings)),
            session_key,
            store,
            api,
        }
    }

    /// Runs restoration and logs the outcome. Never fails: a broken store
    /// or user record leaves the manager in whatever state restoration had
    /// already reached.
    pub fn initialize(&self) {
        match self.restore() {
            Ok(true) => {
                tracing::info!(user_id = ?self.user_id(), "Restored session");
            }
            Ok(false) => {
                tracing::debug!("No persisted session to restore");
            }
            Err(e) => {
                tracing::warn!("Session restoration abandoned: {}", e);
            }
        }
    }

    /// Restores authenticated state from the persisted store.
    ///
    /// Returns `Ok(true)` when the stored session key matches this build
    /// and a session token exists. A missing or malformed user record
    /// aborts only the user part: the session stays authenticated with no
    /// user and no session-start clock.
    pub fn restore(&self) -> Result<bool> {
        let stored_key = self.store.get(KEY_SESSION_KEY)?;
        let stored_token = self.store.get(KEY_SESSION_TOKEN)?;

        if stored_key.as_deref() != Some(self.session_key.as_str()) || stored_token.is_none() {
            return Ok(false);
        }

        self.state.write().authenticated = true;
        // The persisted settings copy is write-only; the bundled
        // configuration passed at construction stays in effect here, and
        // the token is not re-attached to the client until the next login.

        let raw = self.store.get(KEY_USER)?.ok_or(SessionError::MissingUser)?;
        let user: User = serde_json::from_str(&raw)?;

        let session_start = user
            .last_logon_time
            .as_deref()
            .and_then(parse_logon_time)
            .map(|t| t + Duration::hours(LOGON_SKEW_HOURS))
            .unwrap_or_else(Utc::now);

        let mut state = self.state.write();
        state.session_start = Some(session_start);
        state.user = Some(user);

        Ok(true)
    }

    /// Development-mode login: the backend only confirms the user exists.
    pub async fn login_by_user_id(&self, user_id: &str) -> Result<()> {
        let response = self
            .api
            .post("check_user", &serde_json::json!({ "userid": user_id }))
            .await?;

        let matched = match response.get("result") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            _ => false,
        };
        if !matched {
            return Err(SessionError::NotMatched);
        }

        self.api.set_token(DEV_TOKEN);

        let raw = self.api.get("setting").await?;
        let settings = Settings::from_value(raw)?;

        self.store.set(KEY_SESSION_KEY, &self.session_key)?;
        self.store.set(KEY_SESSION_TOKEN, DEV_TOKEN)?;
        self.store
            .set(KEY_SETTINGS, &serde_json::to_string(&settings)?)?;

        *self.settings.write() = settings;
        self.state.write().authenticated = true;

        tracing::info!(user_id, "Logged in with development token");
        Ok(())
    }

    /// Completes a login whose credentials the server already validated;
    /// no remote call is made here.
    pub fn login(&self, data: LoginData) -> Result<()> {
        let user = data.user;

        self.store.set(KEY_SESSION_KEY, &self.session_key)?;
        self.api.set_token(&user.token);
        self.store.set(KEY_USER, &serde_json::to_string(&user)?)?;
        self.store.set(KEY_SESSION_TOKEN, &user.token)?;

        let user_id = user.user_id.clone();
        let mut state = self.state.write();
        // The skew keeps the elapsed clock aligned with the backend's
        // reported logon times.
        state.session_start = Some(Utc::now() + Duration::hours(LOGON_SKEW_HOURS));
        state.user = Some(user);
        state.authenticated = true;
        drop(state);

        tracing::info!(user_id = %user_id, "Logged in");
        Ok(())
    }

    /// Ends the session. The remote call is best-effort: local state is
    /// always clean when this returns, whatever the backend did.
    pub async fn logout(&self) {
        if let Err(e) = self.api.post("logout", &serde_json::json!({})).await {
            tracing::warn!("Logout API call failed: {}", e);
        }

        for key in [KEY_USER, KEY_SESSION_TOKEN, KEY_SESSION_KEY, KEY_SETTINGS] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, "Failed to clear persisted key: {}", e);
            }
        }
        self.api.clear_token();

        let mut state = self.state.write();
        state.authenticated = false;
        state.authorized = false;
        state.user = None;
        drop(state);

        tracing::info!("Logged out");
    }

    /// Secondary authorization: attaches an elevated token independent of
    /// the base session.
    pub fn set_token(&self, user: User) -> Result<()> {
        self.api.set_token(&user.token);
        self.store.set(KEY_USER, &serde_json::to_string(&user)?)?;

        let mut state = self.state.write();
        state.authorized = true;
        state.user = Some(user);

        Ok(())
    }

    pub fn unset_token(&self) -> Result<()> {
        self.api.clear_token();
        self.store.remove(KEY_USER)?;

        let mut state = self.state.write();
        state.authorized = false;
        state.user = None;

        Ok(())
    }

    /// Role gate for views. An empty allow-list admits everyone, including
    /// anonymous sessions; a non-empty list requires an authenticated user.
    pub fn has_permission(&self, allowed_types: &[i64]) -> Result<bool> {
        if allowed_types.is_empty() {
            return Ok(true);
        }

        let state = self.state.read();
        let user = state.user.as_ref().ok_or(SessionError::NotAuthenticated)?;
        Ok(allowed_types.contains(&user.user_type))
    }

    /// Reads the persisted user fresh on every call; tolerates the store
    /// being mutated behind this manager's back.
    pub fn is_admin(&self) -> bool {
        self.read_user().map(|u| u.user_role == 1).unwrap_or(false)
    }

    fn read_user(&self) -> Option<User> {
        let raw = self.store.get(KEY_USER).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn user_id(&self) -> Option<String> {
        self.read_user().map(|u| u.user_id)
    }

    pub fn user_name(&self) -> Option<String> {
        self.read_user().map(|u| u.user_name)
    }

    pub fn user_index(&self) -> Option<i64> {
        self.read_user().map(|u| u.id)
    }

    pub fn user_info(&self) -> Option<User> {
        self.read_user()
    }

    pub fn user_type(&self) -> Option<i64> {
        self.read_user().map(|u| u.user_type)
    }

    pub fn last_logon_time(&self) -> Option<String> {
        self.read_user().and_then(|u| u.last_logon_time)
    }

    pub fn user_area(&self) -> Option<String> {
        self.read_user().and_then(|u| u.area_code)
    }

    /// Elapsed time since login as `HH:mm:ss`, or `"00:00"` when no
    /// session start is recorded. Hours run past 24 without rollover, and
    /// the skew applied at login is not corrected here.
    pub fn session_duration(&self) -> String {
        let start = match self.state.read().session_start {
            Some(start) => start,
            None => return "00:00".to_string(),
        };

        let elapsed = (Utc::now() - start).max(Duration::zero());
        let secs = elapsed.num_seconds();
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }

    /// Decodes a station status bitmask into its error codes.
    pub fn parse_status_code(&self, code: u32) -> Vec<&'static str> {
        status::parse_status_code(code)
    }

    /// Long or short description for a problem code.
    pub fn problem_from_code(&self, code: u32, full_text: bool) -> String {
        self.settings.read().problem_label(code, full_text)
    }

    pub fn session(&self) -> Session {
        self.state.read().clone()
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().authenticated
    }

    pub fn is_authorized(&self) -> bool {
        self.state.read().authorized
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            settings: Arc::clone(&self.settings),
            session_key: self.session_key.clone(),
            store: self.store.clone(),
            api: self.api.clone(),
        }
    }
}

fn parse_logon_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| Utc.from_utc_datetime(&t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionPhase;

    const TEST_SESSION_KEY: &str = "dGNhZG1pbjp0ZXN0MTIz";

    fn test_user() -> User {
        User {
            id: 7,
            user_id: "op01".to_string(),
            user_name: "Operator One".to_string(),
            user_status: 1,
            user_role: 1,
            user_type: 2,
            area_code: Some("048".to_string()),
            last_logon_time: Some("2025-03-01 09:30:00".to_string()),
            token: "tok-op01".to_string(),
        }
    }

    fn test_manager() -> SessionManager {
        // Port 9 (discard) is never listening; remote calls fail fast
        let api = ApiClient::new("http://127.0.0.1:9/api/v1").unwrap();
        let store = SessionStore::open_in_memory().unwrap();
        let settings = Settings::bundled().unwrap();
        SessionManager::new(api, store, TEST_SESSION_KEY.to_string(), settings)
    }

    #[test]
    fn test_login_persists_token_and_authenticates() {
        let manager = test_manager();
        manager.login(LoginData { user: test_user() }).unwrap();

        let session = manager.session();
        assert!(session.authenticated);
        assert_eq!(session.phase(), SessionPhase::Authenticated);
        assert!(session.session_start.is_some());

        let store = manager.store.clone();
        assert_eq!(
            store.get("sessionToken").unwrap().as_deref(),
            Some("tok-op01")
        );
        assert_eq!(
            store.get("sessionkey").unwrap().as_deref(),
            Some(TEST_SESSION_KEY)
        );
        assert_eq!(manager.api.token().as_deref(), Some("tok-op01"));
    }

    #[tokio::test]
    async fn test_logout_cleans_up_even_when_remote_fails() {
        let manager = test_manager();
        manager.login(LoginData { user: test_user() }).unwrap();

        // The API client points at an unreachable port, so the remote
        // logout call fails; local cleanup must proceed regardless.
        manager.logout().await;

        let session = manager.session();
        assert!(!session.authenticated);
        assert!(!session.authorized);
        assert!(session.user.is_none());

        let store = manager.store.clone();
        for key in ["user", "sessionToken", "sessionkey", "settings"] {
            assert_eq!(store.get(key).unwrap(), None, "key {key}");
        }
        assert_eq!(manager.api.token(), None);
    }

    #[tokio::test]
    async fn test_login_by_user_id_surfaces_network_failure() {
        let manager = test_manager();
        let err = manager.login_by_user_id("op01").await.unwrap_err();
        assert!(matches!(err, SessionError::Api(_)));
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_has_permission() {
        let manager = test_manager();

        // Empty allow-list admits everyone, even with no user
        assert!(manager.has_permission(&[]).unwrap());

        // Non-empty allow-list with no user is the caller's bug
        assert!(matches!(
            manager.has_permission(&[1, 2]),
            Err(SessionError::NotAuthenticated)
        ));

        manager.login(LoginData { user: test_user() }).unwrap();
        assert!(manager.has_permission(&[2, 3]).unwrap());
        assert!(!manager.has_permission(&[1, 3]).unwrap());
        assert!(manager.has_permission(&[]).unwrap());
    }

    #[test]
    fn test_accessors_read_store_fresh() {
        let manager = test_manager();
        assert_eq!(manager.user_id(), None);
        assert!(!manager.is_admin());

        manager.login(LoginData { user: test_user() }).unwrap();
        assert_eq!(manager.user_id().as_deref(), Some("op01"));
        assert_eq!(manager.user_name().as_deref(), Some("Operator One"));
        assert_eq!(manager.user_index(), Some(7));
        assert_eq!(manager.user_type(), Some(2));
        assert_eq!(manager.user_area().as_deref(), Some("048"));
        assert_eq!(
            manager.last_logon_time().as_deref(),
            Some("2025-03-01 09:30:00")
        );
        assert!(manager.is_admin());

        // External mutation of the store is visible without any refresh
        manager.store.set("user", "not json").unwrap();
        assert_eq!(manager.user_id(), None);
        assert_eq!(manager.user_info(), None);
        assert!(!manager.is_admin());
    }

    #[test]
    fn test_restore_roundtrip_is_idempotent() {
        let manager = test_manager();
        manager.login(LoginData { user: test_user() }).unwrap();

        // Two fresh managers over the same store simulate two reloads
        let first = SessionManager::new(
            manager.api.clone(),
            manager.store.clone(),
            TEST_SESSION_KEY.to_string(),
            Settings::bundled().unwrap(),
        );
        assert!(first.restore().unwrap());

        let second = SessionManager::new(
            manager.api.clone(),
            manager.store.clone(),
            TEST_SESSION_KEY.to_string(),
            Settings::bundled().unwrap(),
        );
        assert!(second.restore().unwrap());

        let a = first.session();
        let b = second.session();
        assert_eq!(a.authenticated, b.authenticated);
        assert_eq!(a.user, b.user);
        assert_eq!(a.session_start, b.session_start);
        assert_eq!(a.user.as_ref().map(|u| u.user_id.as_str()), Some("op01"));
    }

    #[test]
    fn test_restore_ignores_foreign_session_key() {
        let manager = test_manager();
        manager.store.set("sessionkey", "someone-else").unwrap();
        manager.store.set("sessionToken", "tok").unwrap();

        assert!(!manager.restore().unwrap());
        assert!(!manager.is_authenticated());
    }

    #[test]
    fn test_restore_with_malformed_user_stays_authenticated() {
        let manager = test_manager();
        manager.store.set("sessionkey", TEST_SESSION_KEY).unwrap();
        manager.store.set("sessionToken", "tok").unwrap();
        manager.store.set("user", "{not valid json").unwrap();

        assert!(matches!(manager.restore(), Err(SessionError::Json(_))));

        // The base session survives; only the user part was abandoned
        let session = manager.session();
        assert!(session.authenticated);
        assert!(session.user.is_none());
        assert!(session.session_start.is_none());

        // initialize() takes the same path without failing
        let again = SessionManager::new(
            manager.api.clone(),
            manager.store.clone(),
            TEST_SESSION_KEY.to_string(),
            Settings::bundled().unwrap(),
        );
        again.initialize();
        assert!(again.is_authenticated());
    }

    #[test]
    fn test_restore_session_start_comes_from_logon_time() {
        let manager = test_manager();
        manager.login(LoginData { user: test_user() }).unwrap();

        let reloaded = SessionManager::new(
            manager.api.clone(),
            manager.store.clone(),
            TEST_SESSION_KEY.to_string(),
            Settings::bundled().unwrap(),
        );
        assert!(reloaded.restore().unwrap());

        let expected = parse_logon_time("2025-03-01 09:30:00").unwrap() + Duration::hours(9);
        assert_eq!(reloaded.session().session_start, Some(expected));
    }

    #[test]
    fn test_set_and_unset_token() {
        let manager = test_manager();
        manager.login(LoginData { user: test_user() }).unwrap();

        let mut elevated = test_user();
        elevated.token = "tok-elevated".to_string();
        manager.set_token(elevated).unwrap();

        assert!(manager.is_authorized());
        assert_eq!(manager.session().phase(), SessionPhase::Authorized);
        assert_eq!(manager.api.token().as_deref(), Some("tok-elevated"));

        manager.unset_token().unwrap();
        assert!(!manager.is_authorized());
        assert_eq!(manager.api.token(), None);
        assert_eq!(manager.user_info(), None);
    }

    #[test]
    fn test_session_duration() {
        let manager = test_manager();
        assert_eq!(manager.session_duration(), "00:00");

        // A start in the past ticks normally
        manager.state.write().session_start = Some(Utc::now() - Duration::seconds(3661));
        let duration = manager.session_duration();
        assert!(
            duration == "01:01:01" || duration == "01:01:02",
            "unexpected duration {duration}"
        );

        // A start more than a day back keeps counting hours
        manager.state.write().session_start = Some(Utc::now() - Duration::hours(26));
        assert!(manager.session_duration().starts_with("26:00"));

        // The future-dated start produced by the login skew clamps to zero
        manager.state.write().session_start = Some(Utc::now() + Duration::hours(9));
        assert_eq!(manager.session_duration(), "00:00:00");
    }

    #[test]
    fn test_parse_logon_time_formats() {
        assert!(parse_logon_time("2025-03-01 09:30:00").is_some());
        assert!(parse_logon_time("2025-03-01T09:30:00+09:00").is_some());
        assert_eq!(parse_logon_time("not a time"), None);
    }
}
