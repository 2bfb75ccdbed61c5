//! Identity provider.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use shopsync_engine::UserId;
use tokio::sync::watch;

use super::RemoteError;

/// External identity provider. `Ok(None)` from `sign_in` or
/// `create_account` means the provider answered without a user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<UserId>, RemoteError>;

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserId>, RemoteError>;

    async fn sign_out(&self) -> Result<(), RemoteError>;

    fn current_user_id(&self) -> Option<UserId>;
}

#[derive(Debug)]
struct Account {
    user_id: UserId,
    password: String,
}

/// Accounts kept in memory.
#[derive(Debug)]
pub struct MemoryIdentity {
    accounts: DashMap<String, Account>,
    current: watch::Sender<Option<UserId>>,
    offline: AtomicBool,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self {
            accounts: DashMap::new(),
            current: watch::channel(None).0,
            offline: AtomicBool::new(false),
        }
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Option<UserId>, RemoteError> {
        self.check_online()?;

        let user_id = match self.accounts.get(email) {
            Some(account) if account.password == password => account.user_id.clone(),
            _ => {
                return Err(RemoteError::Failed(
                    "The email or password is incorrect".to_string(),
                ))
            }
        };

        self.current.send_replace(Some(user_id.clone()));
        tracing::debug!(user_id = %user_id, "Signed in");
        Ok(Some(user_id))
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserId>, RemoteError> {
        self.check_online()?;
        if email.trim().is_empty() || password.is_empty() {
            return Err(RemoteError::Failed(
                "Email and password are required".to_string(),
            ));
        }

        let user_id = match self.accounts.entry(email.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(RemoteError::Failed(
                    "The email address is already in use".to_string(),
                ))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let user_id = uuid::Uuid::new_v4().simple().to_string();
                slot.insert(Account {
                    user_id: user_id.clone(),
                    password: password.to_string(),
                });
                user_id
            }
        };

        self.current.send_replace(Some(user_id.clone()));
        tracing::debug!(user_id = %user_id, "Account created");
        Ok(Some(user_id))
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        self.check_online()?;
        self.current.send_replace(None);
        Ok(())
    }

    fn current_user_id(&self) -> Option<UserId> {
        self.current.borrow().clone()
    }
}
