//! Shared fixtures for client integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rust_decimal::Decimal;
use shopsync_client::db::LiveQuery;
use shopsync_client::remote::{MemoryIdentity, MemoryRemote, StaticCatalog};
use shopsync_client::{Backends, LocalStore, SessionController, ShopRepository, SyncSettings};
use shopsync_engine::{Product, ProductId, RemoteProduct};

pub const EMAIL: &str = "shopper@example.com";
pub const PASSWORD: &str = "hunter22";

pub struct Harness {
    pub repo: ShopRepository,
    pub remote: Arc<MemoryRemote>,
    pub identity: Arc<MemoryIdentity>,
    pub catalog: Arc<StaticCatalog>,
}

impl Harness {
    pub fn store(&self) -> &LocalStore {
        self.repo.store()
    }

    /// Id of the logged-in user.
    pub fn user_id(&self) -> String {
        self.repo
            .session()
            .current()
            .map(|s| s.user_id().to_string())
            .expect("logged in")
    }

    pub async fn product(&self, id: ProductId) -> Product {
        self.store().get_product(id).await.unwrap().expect("product stored")
    }
}

/// Catalog of ten products; product 7 costs 9.99.
pub fn catalog_products() -> Vec<RemoteProduct> {
    (1..=10)
        .map(|id| RemoteProduct {
            id,
            title: match id {
                1 => "Laptop Stand".to_string(),
                2 => "Gaming LAPTOP".to_string(),
                _ => format!("Product {}", id),
            },
            description: if id == 3 {
                "Fits on your lap".to_string()
            } else {
                "Something useful".to_string()
            },
            category: "misc".to_string(),
            price: if id == 7 {
                Decimal::new(999, 2)
            } else {
                Decimal::new(id * 100, 2)
            },
            rating: Decimal::new(45, 1),
            images: vec![format!("https://img.example.com/{}.png", id)],
            thumbnail: format!("https://img.example.com/{}-t.png", id),
        })
        .collect()
}

pub fn local_products() -> Vec<Product> {
    catalog_products()
        .into_iter()
        .map(|p| Product::from_remote(p, false))
        .collect()
}

pub async fn harness(quiet_period: Duration) -> Harness {
    let store = LocalStore::in_memory().await.unwrap();
    let remote = MemoryRemote::new_shared();
    let identity = Arc::new(MemoryIdentity::new());
    let catalog = Arc::new(StaticCatalog::new(catalog_products()));

    let backends = Backends {
        remote: remote.clone(),
        identity: identity.clone(),
        catalog: catalog.clone(),
    };
    let controller = SessionController::new(store.clone(), backends)
        .with_settings(SyncSettings::with_quiet_period(quiet_period));

    Harness {
        repo: ShopRepository::from_controller(store, controller),
        remote,
        identity,
        catalog,
    }
}

/// Poll a live query until `done` holds for an emitted value.
pub async fn wait_until<T, F>(query: &mut LiveQuery<T>, mut done: F) -> T
where
    F: FnMut(&T) -> bool,
{
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            let value = query.next().await.expect("live query ended").unwrap();
            if done(&value) {
                return value;
            }
        }
    })
    .await
    .expect("condition not reached in time")
}
