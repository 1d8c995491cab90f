//! Main console state container

use envmon_api::ApiClient;
use envmon_session::{LoginData, Session, SessionManager, Settings, User};
use envmon_storage::SessionStore;

use crate::config::Config;
use crate::Result;

/// Central state container for the operator console.
///
/// All session state flows through here; views are pure renderers. One
/// `Console` exists per tab, and clones share the same underlying state.
pub struct Console {
    /// Configuration
    config: Config,
    /// Tab-scoped persistence
    store: SessionStore,
    /// Backend API client
    api: ApiClient,
    /// Session manager
    session_manager: SessionManager,
}

impl Console {
    /// Builds the console's collaborators from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let api = ApiClient::new(&config.base_url)?;
        let store = SessionStore::open_in_memory()?;
        let settings = Settings::bundled()?;
        let session_manager = SessionManager::new(
            api.clone(),
            store.clone(),
            config.session_key.clone(),
            settings,
        );

        Ok(Self {
            config,
            store,
            api,
            session_manager,
        })
    }

    /// Restores any persisted session.
    pub fn initialize(&self) {
        self.session_manager.initialize();
        tracing::info!("Console initialized");
    }

    // === Session operations ===

    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }

    pub fn session(&self) -> Session {
        self.session_manager.session()
    }

    pub async fn login_by_user_id(&self, user_id: &str) -> Result<()> {
        Ok(self.session_manager.login_by_user_id(user_id).await?)
    }

    pub fn login(&self, data: LoginData) -> Result<()> {
        Ok(self.session_manager.login(data)?)
    }

    pub async fn logout(&self) {
        self.session_manager.logout().await
    }

    pub fn set_token(&self, user: User) -> Result<()> {
        Ok(self.session_manager.set_token(user)?)
    }

    pub fn unset_token(&self) -> Result<()> {
        Ok(self.session_manager.unset_token()?)
    }

    pub fn has_permission(&self, allowed_types: &[i64]) -> Result<bool> {
        Ok(self.session_manager.has_permission(allowed_types)?)
    }

    pub fn is_admin(&self) -> bool {
        self.session_manager.is_admin()
    }

    pub fn session_duration(&self) -> String {
        self.session_manager.session_duration()
    }

    pub fn settings(&self) -> Settings {
        self.session_manager.settings()
    }

    // === Collaborators ===

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}

impl Clone for Console {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: self.store.clone(),
            api: self.api.clone(),
            session_manager: self.session_manager.clone(),
        }
    }
}
