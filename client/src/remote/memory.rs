//! In-process remote document store.
//!
//! Holds documents in an ordered map behind one async lock, so transactions
//! and batches are trivially atomic. Subscribers are tracked in a registry
//! keyed by token and receive a full snapshot of their collection after
//! every commit that touches it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use shopsync_engine::{Collection, Document, DocumentPath, Snapshot, UserId};
use tokio::sync::{mpsc, Mutex};

use super::{
    RemoteError, RemoteStore, SnapshotEvent, Subscription, SubscriptionToken, TransactionFn,
    TransactionReader, Write,
};

type Documents = BTreeMap<DocumentPath, Value>;

#[derive(Debug)]
struct Subscriber {
    user_id: UserId,
    collection: Collection,
    sender: mpsc::UnboundedSender<SnapshotEvent>,
}

/// Remote store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    documents: Mutex<Documents>,
    subscribers: DashMap<SubscriptionToken, Subscriber>,
    offline: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// While offline every call except `unsubscribe` fails with
    /// [`RemoteError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver an error event to every subscriber of `user_id`'s `collection`.
    pub fn push_error(&self, user_id: &str, collection: Collection, message: &str) -> usize {
        let mut sent = 0;
        for entry in self.subscribers.iter() {
            let sub = entry.value();
            if sub.user_id == user_id
                && sub.collection == collection
                && sub.sender.send(SnapshotEvent::Error(message.to_string())).is_ok()
            {
                sent += 1;
            }
        }
        sent
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable)
        } else {
            Ok(())
        }
    }

    /// Apply `writes` and notify subscribers of every touched collection.
    /// Runs under the documents lock so deliveries follow commit order.
    fn commit(&self, documents: &mut Documents, writes: Vec<Write>) {
        let mut touched: BTreeSet<(UserId, Collection)> = BTreeSet::new();
        for write in writes {
            if let Some(collection) = write.path().collection() {
                touched.insert((write.path().user_id().to_string(), collection));
            }
            match write {
                Write::Set { path, value } => {
                    documents.insert(path, value);
                }
                Write::Delete { path } => {
                    documents.remove(&path);
                }
            }
        }

        for (user_id, collection) in touched {
            self.broadcast(documents, &user_id, collection);
        }
    }

    fn broadcast(&self, documents: &Documents, user_id: &str, collection: Collection) {
        let mut snapshot: Option<Snapshot> = None;
        let mut sent_count = 0;
        for entry in self.subscribers.iter() {
            let sub = entry.value();
            if sub.user_id != user_id || sub.collection != collection {
                continue;
            }
            let body =
                snapshot.get_or_insert_with(|| collection_snapshot(documents, user_id, collection));
            if sub.sender.send(SnapshotEvent::Snapshot(body.clone())).is_ok() {
                sent_count += 1;
            }
        }

        tracing::trace!(
            user_id = %user_id,
            collection = %collection,
            recipients = sent_count,
            "Broadcast snapshot"
        );
    }
}

fn collection_snapshot(documents: &Documents, user_id: &str, collection: Collection) -> Snapshot {
    let docs = documents
        .iter()
        .filter(|(path, _)| path.user_id() == user_id && path.collection() == Some(collection))
        .map(|(path, value)| Document::new(path.document_id(), value.clone()))
        .collect();
    Snapshot::new(collection, docs)
}

struct LockedReader<'a>(&'a Documents);

impl TransactionReader for LockedReader<'_> {
    fn get(&self, path: &DocumentPath) -> Option<Value> {
        self.0.get(path).cloned()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn subscribe(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Subscription, RemoteError> {
        self.check_online()?;

        let (sender, events) = mpsc::unbounded_channel();
        if user_id.trim().is_empty() {
            tracing::debug!(collection = %collection, "Ignoring subscription without a user id");
            return Ok(Subscription {
                token: SubscriptionToken::new(),
                events,
            });
        }

        let documents = self.documents.lock().await;
        let _ = sender.send(SnapshotEvent::Snapshot(collection_snapshot(
            &documents, user_id, collection,
        )));

        let token = uuid::Uuid::new_v4().to_string();
        self.subscribers.insert(
            token.clone(),
            Subscriber {
                user_id: user_id.to_string(),
                collection,
                sender,
            },
        );
        drop(documents);

        tracing::info!(token = %token, user_id = %user_id, collection = %collection, "Subscription registered");
        Ok(Subscription { token, events })
    }

    async fn unsubscribe(&self, token: &str) {
        if let Some((_, sub)) = self.subscribers.remove(token) {
            tracing::info!(
                token = %token,
                user_id = %sub.user_id,
                collection = %sub.collection,
                "Subscription released"
            );
        }
    }

    async fn read_once(&self, path: &DocumentPath) -> Result<Option<Value>, RemoteError> {
        self.check_online()?;
        Ok(self.documents.lock().await.get(path).cloned())
    }

    async fn read_collection(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Snapshot, RemoteError> {
        self.check_online()?;
        let documents = self.documents.lock().await;
        Ok(collection_snapshot(&documents, user_id, collection))
    }

    async fn write_document(&self, path: &DocumentPath, value: Value) -> Result<(), RemoteError> {
        self.run_batch(vec![Write::Set {
            path: path.clone(),
            value,
        }])
        .await
    }

    async fn delete_document(&self, path: &DocumentPath) -> Result<(), RemoteError> {
        self.run_batch(vec![Write::Delete { path: path.clone() }])
            .await
    }

    async fn run_transaction(&self, body: TransactionFn) -> Result<(), RemoteError> {
        self.check_online()?;
        let mut documents = self.documents.lock().await;
        let writes = body(&LockedReader(&documents));
        self.commit(&mut documents, writes);
        Ok(())
    }

    async fn run_batch(&self, writes: Vec<Write>) -> Result<(), RemoteError> {
        self.check_online()?;
        let mut documents = self.documents.lock().await;
        self.commit(&mut documents, writes);
        Ok(())
    }
}
