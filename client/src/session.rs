//! Session lifecycle controller.
//!
//! Owns the reconciliation jobs and their subscriptions. Login and
//! registration seed the local store and start observing the user's
//! favorites, cart and orders; logout tears all of that down and wipes the
//! store.

use std::collections::HashSet;
use std::sync::Arc;

use shopsync_engine::{
    document, ActiveSession, Collection, DocumentPath, FavoriteDoc, Product, ProductId,
    SessionState, Transition, UserId, UserProfile,
};
use tokio::sync::{watch, Mutex};

use crate::config::{SyncSettings, DEFAULT_CATALOG_LIMIT};
use crate::db::LocalStore;
use crate::error::{Outcome, Result, SyncError};
use crate::reconcile::ReconcileJob;
use crate::remote::{CatalogApi, IdentityProvider, RemoteStore};

/// Read-only view of the session state, handed to anything that needs to
/// know who is logged in.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn current(&self) -> Option<ActiveSession> {
        self.state.borrow().active().cloned()
    }

    /// The active session, or [`SyncError::Session`].
    pub fn require(&self) -> Result<ActiveSession> {
        self.current().ok_or(SyncError::Session)
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.borrow().is_logged_in()
    }

    /// Wait for the next state change. Returns `false` once the controller
    /// is gone.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }
}

/// Remote services the controller talks to.
#[derive(Clone)]
pub struct Backends {
    pub remote: Arc<dyn RemoteStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub catalog: Arc<dyn CatalogApi>,
}

pub struct SessionController {
    store: LocalStore,
    backends: Backends,
    settings: SyncSettings,
    catalog_limit: u32,
    state: watch::Sender<SessionState>,
    /// Running jobs. The lock also serialises login, registration and logout.
    jobs: Mutex<Vec<ReconcileJob>>,
}

impl SessionController {
    pub fn new(store: LocalStore, backends: Backends) -> Self {
        let (state, _) = watch::channel(SessionState::LoggedOut);
        Self {
            store,
            backends,
            settings: SyncSettings::default(),
            catalog_limit: DEFAULT_CATALOG_LIMIT,
            state,
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_catalog_limit(mut self, limit: u32) -> Self {
        self.catalog_limit = limit;
        self
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            state: self.state.subscribe(),
        }
    }

    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        self.backends.remote.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Whether the identity provider has a signed-in user.
    pub fn has_user(&self) -> bool {
        self.backends.identity.current_user_id().is_some()
    }

    /// Collections currently being observed.
    pub async fn observed_collections(&self) -> Vec<Collection> {
        self.jobs.lock().await.iter().map(|job| job.collection()).collect()
    }

    /// Resume a session persisted by an earlier run. Returns whether a
    /// session was found.
    pub async fn restore(&self) -> Result<bool> {
        let mut jobs = self.jobs.lock().await;
        let Some(user_id) = self.store.load_session().await? else {
            return Ok(false);
        };

        stop_observing(self.backends.remote.as_ref(), &mut jobs).await;
        let session = self.enter(&user_id)?;
        self.start_observing(&mut jobs, &session).await;
        Ok(true)
    }

    pub async fn login(&self, email: &str, password: &str) -> Outcome {
        let mut jobs = self.jobs.lock().await;
        let user_id = self
            .backends
            .identity
            .sign_in(email, password)
            .await?
            .ok_or(SyncError::LoginFailed)?;

        stop_observing(self.backends.remote.as_ref(), &mut jobs).await;
        if let Err(e) = self.seed_for_login(&user_id).await {
            self.abandon(&user_id, &e).await;
            return Err(e);
        }

        let session = self.enter(&user_id)?;
        self.start_observing(&mut jobs, &session).await;
        Ok(())
    }

    pub async fn register(&self, email: &str, password: &str, username: &str) -> Outcome {
        let mut jobs = self.jobs.lock().await;
        let user_id = self
            .backends
            .identity
            .create_account(email, password)
            .await?
            .ok_or(SyncError::RegisterFailed)?;

        stop_observing(self.backends.remote.as_ref(), &mut jobs).await;
        if let Err(e) = self.seed_for_registration(&user_id, email, username).await {
            self.abandon(&user_id, &e).await;
            return Err(e);
        }

        let session = self.enter(&user_id)?;
        self.start_observing(&mut jobs, &session).await;
        Ok(())
    }

    /// Stop every job, release every subscription, sign out, forget the
    /// session and wipe the local store, in that order.
    ///
    /// A failed sign-out does not stop the local teardown; it is reported
    /// once everything else is done.
    pub async fn logout(&self) -> Outcome {
        let mut jobs = self.jobs.lock().await;
        stop_observing(self.backends.remote.as_ref(), &mut jobs).await;

        let signed_out = self.backends.identity.sign_out().await;
        let cleared = self.store.clear_session().await;
        let mut transition = Transition::Unchanged;
        self.state.send_modify(|state| transition = state.log_out());
        if let Transition::Ended(session) = transition {
            tracing::info!(user_id = %session.user_id(), "Logged out");
        }
        let wiped = self.store.clear_all().await;

        signed_out?;
        cleared?;
        wiped?;
        Ok(())
    }

    /// The logged-in user's profile document.
    pub async fn user_profile(&self) -> Result<UserProfile> {
        let session = self
            .state
            .borrow()
            .active()
            .cloned()
            .ok_or_else(SyncError::user_not_found)?;
        let path = DocumentPath::user(session.user_id());
        let value = self
            .backends
            .remote
            .read_once(&path)
            .await?
            .ok_or_else(SyncError::user_not_found)?;
        Ok(document::from_value(&path.to_string(), &value)?)
    }

    /// Fetch the catalog again and update product fields in place. Favorite
    /// flags and existing orders are left alone.
    pub async fn refresh_catalog(&self) -> Outcome {
        let remote = self.backends.catalog.fetch_catalog(self.catalog_limit).await?;
        let products: Vec<Product> = remote
            .into_iter()
            .map(|p| Product::from_remote(p, false))
            .collect();
        self.store.upsert_catalog(&products).await?;
        tracing::info!(count = products.len(), "Catalog refreshed");
        Ok(())
    }

    async fn seed_for_login(&self, user_id: &str) -> Result<()> {
        self.forget_other_user(user_id).await?;
        self.store.save_session(user_id).await?;

        let favorites = self
            .backends
            .remote
            .read_collection(user_id, Collection::Favorites)
            .await?
            .decode::<FavoriteDoc>();
        for rejected in &favorites.rejected {
            tracing::warn!(user_id = %user_id, error = %rejected, "Skipping favorite document");
        }
        let favorite_ids: HashSet<ProductId> = favorites.items.iter().map(|f| f.id).collect();

        self.seed_catalog(&favorite_ids).await
    }

    async fn seed_for_registration(&self, user_id: &str, email: &str, username: &str) -> Result<()> {
        self.forget_other_user(user_id).await?;
        self.store.save_session(user_id).await?;

        let profile = UserProfile {
            uid: user_id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
        };
        self.backends
            .remote
            .write_document(&DocumentPath::user(user_id), document::to_value(&profile)?)
            .await?;

        self.seed_catalog(&HashSet::new()).await
    }

    /// Wipe data mirrored for a different, still logged-in user.
    async fn forget_other_user(&self, user_id: &str) -> Result<()> {
        let previous = self
            .state
            .borrow()
            .active()
            .map(|session| session.user_id().to_string());
        if let Some(previous) = previous.filter(|previous| previous != user_id) {
            tracing::debug!(previous = %previous, user_id = %user_id, "Dropping previous user's data");
            self.store.clear_all().await?;
        }
        Ok(())
    }

    async fn seed_catalog(&self, favorite_ids: &HashSet<ProductId>) -> Result<()> {
        let remote = self.backends.catalog.fetch_catalog(self.catalog_limit).await?;
        let products: Vec<Product> = remote
            .into_iter()
            .map(|p| {
                let is_favorite = favorite_ids.contains(&p.id);
                Product::from_remote(p, is_favorite)
            })
            .collect();
        self.store.insert_products(&products).await?;
        Ok(())
    }

    /// Undo a half-finished login or registration. Ends LoggedOut with the
    /// local store wiped, as after `logout`.
    async fn abandon(&self, user_id: &str, cause: &SyncError) {
        tracing::warn!(user_id = %user_id, error = %cause, "Session setup failed");
        if let Err(e) = self.backends.identity.sign_out().await {
            tracing::warn!(user_id = %user_id, error = %e, "Sign-out after failed setup failed");
        }
        if let Err(e) = self.store.clear_session().await {
            tracing::warn!(user_id = %user_id, error = %e, "Could not clear session pointer");
        }
        self.state.send_modify(|state| {
            state.log_out();
        });
        if let Err(e) = self.store.clear_all().await {
            tracing::warn!(user_id = %user_id, error = %e, "Could not wipe local store");
        }
    }

    fn enter(&self, user_id: &str) -> Result<ActiveSession> {
        let mut next = self.state.borrow().clone();
        let transition = next.log_in(user_id)?;
        let session = next.active().cloned().ok_or(SyncError::Session)?;
        self.state.send_replace(next);

        match transition {
            Transition::Replaced { previous, .. } => tracing::info!(
                previous = %previous.user_id(),
                user_id = %user_id,
                "Switched user"
            ),
            _ => tracing::info!(user_id = %user_id, "Logged in"),
        }
        Ok(session)
    }

    async fn start_observing(&self, jobs: &mut Vec<ReconcileJob>, session: &ActiveSession) {
        let user_id: UserId = session.user_id().to_string();
        for collection in Collection::ALL {
            match self.backends.remote.subscribe(&user_id, collection).await {
                Ok(subscription) => jobs.push(ReconcileJob::start(
                    self.store.clone(),
                    subscription,
                    collection,
                    self.settings.quiet_period(collection),
                )),
                Err(e) => tracing::warn!(
                    user_id = %user_id,
                    collection = %collection,
                    error = %e,
                    "Could not subscribe"
                ),
            }
        }
    }
}

/// Cancel every job first, then release their subscriptions.
async fn stop_observing(remote: &dyn RemoteStore, jobs: &mut Vec<ReconcileJob>) {
    for job in jobs.iter_mut() {
        job.cancel().await;
    }
    for job in jobs.drain(..) {
        remote.unsubscribe(job.token()).await;
    }
}
