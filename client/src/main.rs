//! Shopsync demo - runs a scripted session against the in-process remote
//! store and the configured catalog API.

use std::sync::Arc;

use futures::StreamExt;
use rust_decimal::Decimal;
use shopsync_client::remote::{HttpCatalog, MemoryIdentity, MemoryRemote};
use shopsync_client::{Backends, Config, LocalStore, ShopRepository};
use shopsync_engine::CheckoutLine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopsync_client=debug,shopsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(database_url = %config.database_url, "Opening local store");
    let store = LocalStore::open(&config.database_url).await?;

    let backends = Backends {
        remote: MemoryRemote::new_shared(),
        identity: Arc::new(MemoryIdentity::new()),
        catalog: Arc::new(HttpCatalog::new(config.catalog_base_url.clone())),
    };
    let repo = ShopRepository::with_config(store, backends, &config);

    if repo.restore().await? {
        tracing::info!("Resumed previous session");
        repo.logout().await?;
    }

    repo.register("demo@example.com", "demo-password", "demo").await?;
    let profile = repo.user_profile().await?;
    tracing::info!(username = %profile.username, email = %profile.email, "Registered");

    let mut products = repo.observe_products("");
    let catalog = products.next().await.transpose()?.unwrap_or_default();
    tracing::info!(count = catalog.len(), "Catalog loaded");

    let picks: Vec<_> = catalog.iter().take(2).cloned().collect();
    for product in &picks {
        repo.toggle_favorite(product.id).await?;
        repo.add_to_cart(product.id).await?;
    }
    if let Some(first) = picks.first() {
        repo.update_cart_quantity(first.id, 3).await?;
    }

    let mut cart = repo.observe_cart();
    let lines = cart.next().await.transpose()?.unwrap_or_default();
    for line in &lines {
        tracing::info!(
            product_id = line.product_id,
            quantity = line.quantity,
            title = %line.title,
            "Cart line"
        );
    }

    let checkout: Vec<CheckoutLine> = lines
        .iter()
        .map(|line| {
            let total = line.price * Decimal::from(line.quantity);
            CheckoutLine::new(line.product_id, line.quantity, total)
        })
        .collect();
    if !checkout.is_empty() {
        repo.create_order(&checkout).await?;
    }

    let mut orders = repo.observe_orders();
    for order in orders.next().await.transpose()?.unwrap_or_default() {
        tracing::info!(
            order_id = %order.id,
            status = %order.status,
            lines = order.items.len(),
            "Order"
        );
    }

    let mut favorites = repo.observe_favorite_products();
    let favorites = favorites.next().await.transpose()?.unwrap_or_default();
    tracing::info!(count = favorites.len(), "Favorites");

    repo.logout().await?;
    tracing::info!("Logged out");

    Ok(())
}
