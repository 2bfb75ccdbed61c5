//! External collaborators: the remote document store, the identity provider
//! and the product catalog.
//!
//! Each is a trait so the session controller and mutation pipeline can run
//! against the in-process implementations here or a real backend.

mod catalog;
mod identity;
mod memory;

pub use catalog::{CatalogApi, HttpCatalog, StaticCatalog};
pub use identity::{IdentityProvider, MemoryIdentity};
pub use memory::MemoryRemote;

use async_trait::async_trait;
use serde_json::Value;
use shopsync_engine::{Collection, DocumentPath, Snapshot};
use tokio::sync::mpsc;

/// Remote call failures. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Remote store unavailable")]
    Unavailable,

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Failed(String),

    #[error("Catalog request failed: {0}")]
    Catalog(String),
}

/// A single document write.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Set { path: DocumentPath, value: Value },
    Delete { path: DocumentPath },
}

impl Write {
    pub fn path(&self) -> &DocumentPath {
        match self {
            Write::Set { path, .. } | Write::Delete { path } => path,
        }
    }
}

/// One delivery on a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    Snapshot(Snapshot),
    Error(String),
}

/// Opaque handle identifying a live subscription.
pub type SubscriptionToken = String;

/// A live subscription to one user's collection.
///
/// The first event is the collection's current contents. The stream ends
/// when the subscription is released.
#[derive(Debug)]
pub struct Subscription {
    pub token: SubscriptionToken,
    pub events: mpsc::UnboundedReceiver<SnapshotEvent>,
}

/// Consistent reads inside a remote transaction.
pub trait TransactionReader {
    fn get(&self, path: &DocumentPath) -> Option<Value>;
}

/// Transaction body: reads through the reader, returns the writes to commit.
pub type TransactionFn = Box<dyn FnOnce(&dyn TransactionReader) -> Vec<Write> + Send>;

/// Remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Start pushing snapshots of `users/{user_id}/{collection}`.
    /// With a blank `user_id` nothing is registered and the returned
    /// stream is already closed.
    async fn subscribe(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Subscription, RemoteError>;

    /// Release a subscription. Unknown tokens are ignored.
    async fn unsubscribe(&self, token: &str);

    async fn read_once(&self, path: &DocumentPath) -> Result<Option<Value>, RemoteError>;

    async fn read_collection(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Snapshot, RemoteError>;

    async fn write_document(&self, path: &DocumentPath, value: Value) -> Result<(), RemoteError>;

    async fn delete_document(&self, path: &DocumentPath) -> Result<(), RemoteError>;

    /// Run `body` against a consistent view and commit its writes atomically.
    async fn run_transaction(&self, body: TransactionFn) -> Result<(), RemoteError>;

    /// Commit `writes` atomically.
    async fn run_batch(&self, writes: Vec<Write>) -> Result<(), RemoteError>;
}
