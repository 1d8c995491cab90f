//! ENVMON Session Management
//!
//! The authenticated-state core for one console tab:
//! - login/logout against the backend, with tab-scoped persistence so a
//!   reload restores the session
//! - a secondary authorization token layer on top of the base session
//! - role gates and user-record accessors for the views
//! - station status-code and problem-code decoding

mod error;
mod manager;
mod session;
mod settings;
mod status;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{LoginData, Session, SessionPhase, User};
pub use settings::{ProblemCode, ProblemEntry, Settings};
pub use status::parse_status_code;

pub type Result<T> = std::result::Result<T, SessionError>;
