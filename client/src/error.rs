//! Unified error handling for the client.
//!
//! Every write action and session operation returns [`Outcome`]. The
//! `Display` text of [`SyncError`] is the message the UI shows as-is.

use crate::remote::RemoteError;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The operation needs a logged-in user.
    #[error("User not logged in")]
    Session,

    #[error("{0}")]
    Remote(#[from] RemoteError),

    #[error("Local store error: {0}")]
    LocalStore(#[from] sqlx::Error),

    #[error("Local store migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Engine(#[from] shopsync_engine::Error),

    #[error("Login failed")]
    LoginFailed,

    #[error("Register failed")]
    RegisterFailed,
}

impl SyncError {
    pub fn user_not_found() -> Self {
        SyncError::NotFound("User not found".to_string())
    }

    /// Whether the failure came from the remote side.
    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Remote(_))
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Success or a user-facing failure for a single UI action.
pub type Outcome = Result<()>;
