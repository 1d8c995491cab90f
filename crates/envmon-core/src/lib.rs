//! ENVMON Core
//!
//! Central coordination layer for the operator console. The `Console` is
//! the composition root: it owns configuration and wires the store, the
//! API client, and the session manager together. Views hold a `Console`
//! and go through it for every session mutation.

mod config;
mod console;
mod error;

pub use config::Config;
pub use console::Console;
pub use error::CoreError;

// Re-export core components
pub use envmon_api::{ApiClient, ApiError};
pub use envmon_session::{
    parse_status_code, LoginData, ProblemCode, ProblemEntry, Session, SessionError,
    SessionManager, SessionPhase, Settings, User,
};
pub use envmon_storage::{SessionStore, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
