//! The surface the UI layer talks to: live read models plus write actions
//! that each report an [`Outcome`].

use shopsync_engine::{
    CartLine, CheckoutLine, OrderView, Product, ProductId, SessionState, UserProfile,
};

use crate::config::Config;
use crate::db::{LiveQuery, LocalStore};
use crate::error::{Outcome, Result};
use crate::mutations::MutationPipeline;
use crate::session::{Backends, SessionController, SessionHandle};

pub struct ShopRepository {
    store: LocalStore,
    session: SessionController,
    mutations: MutationPipeline,
}

impl ShopRepository {
    pub fn new(store: LocalStore, backends: Backends) -> Self {
        Self::from_controller(store.clone(), SessionController::new(store, backends))
    }

    /// Build with timing and catalog size taken from `config`.
    pub fn with_config(store: LocalStore, backends: Backends, config: &Config) -> Self {
        let controller = SessionController::new(store.clone(), backends)
            .with_settings(config.sync)
            .with_catalog_limit(config.catalog_limit);
        Self::from_controller(store, controller)
    }

    pub fn from_controller(store: LocalStore, controller: SessionController) -> Self {
        let mutations = MutationPipeline::new(
            store.clone(),
            controller.remote(),
            controller.handle(),
        );
        Self {
            store,
            session: controller,
            mutations,
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn controller(&self) -> &SessionController {
        &self.session
    }

    pub fn session(&self) -> SessionHandle {
        self.session.handle()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    // Session

    pub async fn login(&self, email: &str, password: &str) -> Outcome {
        self.session.login(email, password).await
    }

    pub async fn register(&self, email: &str, password: &str, username: &str) -> Outcome {
        self.session.register(email, password, username).await
    }

    pub async fn logout(&self) -> Outcome {
        self.session.logout().await
    }

    pub async fn restore(&self) -> Result<bool> {
        self.session.restore().await
    }

    pub fn has_user(&self) -> bool {
        self.session.has_user()
    }

    pub async fn user_profile(&self) -> Result<UserProfile> {
        self.session.user_profile().await
    }

    pub async fn refresh_catalog(&self) -> Outcome {
        self.session.refresh_catalog().await
    }

    // Reads

    pub fn observe_products(&self, query: &str) -> LiveQuery<Vec<Product>> {
        self.store.observe_products(query)
    }

    pub fn observe_favorite_products(&self) -> LiveQuery<Vec<Product>> {
        self.store.observe_favorite_products()
    }

    pub fn observe_product(&self, id: ProductId) -> LiveQuery<Option<Product>> {
        self.store.observe_product(id)
    }

    pub fn observe_cart(&self) -> LiveQuery<Vec<CartLine>> {
        self.store.observe_cart()
    }

    pub fn observe_cart_count(&self) -> LiveQuery<i64> {
        self.store.observe_cart_count()
    }

    pub fn observe_orders(&self) -> LiveQuery<Vec<OrderView>> {
        self.store.observe_orders()
    }

    // Writes

    pub async fn toggle_favorite(&self, product_id: ProductId) -> Outcome {
        self.mutations.toggle_favorite(product_id).await
    }

    pub async fn add_to_cart(&self, product_id: ProductId) -> Outcome {
        self.mutations.add_to_cart(product_id).await
    }

    pub async fn delete_cart_item(&self, product_id: ProductId) -> Outcome {
        self.mutations.delete_cart_item(product_id).await
    }

    pub async fn update_cart_quantity(&self, product_id: ProductId, quantity: u32) -> Outcome {
        self.mutations.update_cart_quantity(product_id, quantity).await
    }

    pub async fn create_order(&self, lines: &[CheckoutLine]) -> Outcome {
        self.mutations.create_order(lines).await
    }
}
