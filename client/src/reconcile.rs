//! Reconciliation jobs.
//!
//! One job per mirrored collection. A coordinator task drains the
//! subscription; each snapshot cancels the merge still waiting out its quiet
//! period and schedules a replacement, so of a burst of snapshots only the
//! last one reaches the local store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use shopsync_engine::{reconcile, Collection, MergePlan, Snapshot};
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

use crate::db::{LocalStore, Table};
use crate::remote::{SnapshotEvent, Subscription, SubscriptionToken};

/// Local tables a collection's merge writes to.
fn tables(collection: Collection) -> &'static [Table] {
    match collection {
        Collection::Favorites => &[Table::Products],
        Collection::Cart => &[Table::Cart],
        Collection::Orders => &[Table::Orders],
    }
}

/// Write a merge plan to the local store.
pub async fn apply_plan(store: &LocalStore, plan: &MergePlan) -> Result<(), sqlx::Error> {
    match plan {
        MergePlan::Favorites(plan) => store.sync_favorites(plan).await,
        MergePlan::Cart(plan) => store.sync_cart(plan).await,
        MergePlan::Orders(plan) => store.sync_orders(plan).await,
    }
}

/// Plan and apply one snapshot. Undecodable documents are logged and left
/// out of the merge.
pub async fn apply_snapshot(store: &LocalStore, snapshot: &Snapshot) -> Result<(), sqlx::Error> {
    let planned = reconcile::plan(snapshot);
    for rejected in &planned.rejected {
        tracing::warn!(
            collection = %snapshot.collection,
            error = %rejected,
            "Skipping remote document"
        );
    }
    apply_plan(store, &planned.plan).await
}

type PendingSlot = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Abort handle of the most recently scheduled merge. Never held across an
/// await, so `Drop` can always take it.
type LatestMerge = Arc<StdMutex<Option<AbortHandle>>>;

/// A running reconciliation job for one collection.
///
/// Dropping the job aborts its tasks without waiting for them; use
/// [`ReconcileJob::cancel`] to be sure nothing writes afterwards.
pub struct ReconcileJob {
    collection: Collection,
    token: SubscriptionToken,
    store: LocalStore,
    coordinator: Option<JoinHandle<()>>,
    pending: PendingSlot,
    latest: LatestMerge,
    applied: Arc<AtomicU64>,
}

impl ReconcileJob {
    /// Start draining `subscription` into `store`.
    pub fn start(
        store: LocalStore,
        subscription: Subscription,
        collection: Collection,
        quiet_period: Duration,
    ) -> Self {
        let Subscription { token, mut events } = subscription;
        let pending: PendingSlot = Arc::new(Mutex::new(None));
        let latest: LatestMerge = Arc::new(StdMutex::new(None));
        let applied = Arc::new(AtomicU64::new(0));

        let coordinator = {
            let store = store.clone();
            let pending = pending.clone();
            let latest = latest.clone();
            let applied = applied.clone();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    match event {
                        SnapshotEvent::Snapshot(snapshot) => {
                            let mut slot = pending.lock().await;
                            if let Some(previous) = slot.as_mut() {
                                if !previous.is_finished() {
                                    tracing::debug!(
                                        collection = %collection,
                                        "Replacing pending reconciliation"
                                    );
                                }
                                previous.abort();
                                if previous.await.is_err() {
                                    store.touch(tables(collection));
                                }
                            }
                            let merge = tokio::spawn(merge_after(
                                store.clone(),
                                snapshot,
                                quiet_period,
                                applied.clone(),
                            ));
                            set_latest(&latest, merge.abort_handle());
                            *slot = Some(merge);
                        }
                        SnapshotEvent::Error(message) => {
                            tracing::warn!(
                                collection = %collection,
                                error = %message,
                                "Remote listener error"
                            );
                        }
                    }
                }
                tracing::debug!(collection = %collection, "Snapshot stream closed");
            })
        };

        tracing::info!(collection = %collection, token = %token, "Reconciliation started");

        Self {
            collection,
            token,
            store,
            coordinator: Some(coordinator),
            pending,
            latest,
            applied,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Token of the subscription this job drains.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Number of snapshots merged so far.
    pub fn applied_count(&self) -> u64 {
        self.applied.load(Ordering::SeqCst)
    }

    /// Stop the coordinator and cancel any pending merge. Returns once
    /// neither can write to the store anymore.
    pub async fn cancel(&mut self) {
        if let Some(coordinator) = self.coordinator.take() {
            coordinator.abort();
            let _ = coordinator.await;
        }

        if let Some(job) = self.pending.lock().await.take() {
            job.abort();
            if job.await.is_err() {
                self.store.touch(tables(self.collection));
            }
        }
        take_latest(&self.latest);

        tracing::info!(collection = %self.collection, "Reconciliation stopped");
    }
}

impl Drop for ReconcileJob {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.take() {
            coordinator.abort();
        }
        if let Ok(mut slot) = self.pending.try_lock() {
            if let Some(job) = slot.take() {
                job.abort();
            }
        }
        if let Some(merge) = take_latest(&self.latest) {
            merge.abort();
        }
    }
}

fn set_latest(latest: &LatestMerge, handle: AbortHandle) {
    *latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
}

fn take_latest(latest: &LatestMerge) -> Option<AbortHandle> {
    latest
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
}

async fn merge_after(
    store: LocalStore,
    snapshot: Snapshot,
    quiet_period: Duration,
    applied: Arc<AtomicU64>,
) {
    if !quiet_period.is_zero() {
        tokio::time::sleep(quiet_period).await;
    }

    let collection = snapshot.collection;
    match apply_snapshot(&store, &snapshot).await {
        Ok(()) => {
            applied.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(
                collection = %collection,
                documents = snapshot.len(),
                "Snapshot reconciled"
            );
        }
        Err(e) => {
            tracing::warn!(collection = %collection, error = %e, "Reconciliation failed");
        }
    }
}
