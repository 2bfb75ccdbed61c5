//! Shopsync client - local-first sync for a shopping app.
//!
//! Keeps a SQLite mirror of the catalog and of the signed-in user's
//! favorites, cart and orders. Remote snapshots are merged in by debounced
//! reconciliation jobs, user actions are written locally first and then
//! mirrored remotely, and the session controller ties both to login and
//! logout. The merge rules themselves live in `shopsync-engine`.

pub mod config;
pub mod db;
pub mod error;
pub mod mutations;
pub mod reconcile;
pub mod remote;
pub mod repository;
pub mod session;

pub use config::{Config, SyncSettings};
pub use db::LocalStore;
pub use error::{Outcome, SyncError};
pub use repository::ShopRepository;
pub use session::{Backends, SessionController, SessionHandle};
