//! Integration tests for snapshot reconciliation.
//!
//! These run against an in-memory SQLite database and the in-process remote
//! store.

mod common;

use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;
use shopsync_client::reconcile::{apply_snapshot, ReconcileJob};
use shopsync_client::remote::{MemoryRemote, RemoteStore};
use shopsync_client::LocalStore;
use shopsync_engine::{CartItem, Collection, Document, DocumentPath, ProductId, Snapshot};

use common::{harness, local_products, wait_until, EMAIL, PASSWORD};

async fn seeded_store() -> LocalStore {
    let store = LocalStore::in_memory().await.unwrap();
    store.insert_products(&local_products()).await.unwrap();
    store
}

fn cart_snapshot(lines: &[(ProductId, u32)]) -> Snapshot {
    Snapshot::new(
        Collection::Cart,
        lines
            .iter()
            .map(|(id, qty)| Document::new(id.to_string(), json!({"productId": id, "quantity": qty})))
            .collect(),
    )
}

fn favorites_snapshot(ids: &[ProductId]) -> Snapshot {
    Snapshot::new(
        Collection::Favorites,
        ids.iter()
            .map(|id| Document::new(id.to_string(), json!({"id": id})))
            .collect(),
    )
}

fn order_doc(id: &str, time: i64, lines: &[(ProductId, u32, f64)]) -> Document {
    Document::new(
        id,
        json!({
            "id": id,
            "orderTime": time,
            "orderStatus": "processing",
            "orderItems": lines.iter().enumerate().map(|(n, (product_id, quantity, total))| json!({
                "id": format!("{}-item-{}", id, n),
                "quantity": quantity,
                "productId": product_id,
                "orderId": id,
                "totalPrice": total,
            })).collect::<Vec<_>>(),
        }),
    )
}

fn cart(pairs: &[(ProductId, u32)]) -> Vec<CartItem> {
    pairs
        .iter()
        .map(|&(product_id, quantity)| CartItem {
            product_id,
            quantity,
        })
        .collect()
}

async fn favorite_ids(store: &LocalStore) -> Vec<ProductId> {
    let mut ids = Vec::new();
    for product in local_products() {
        if store.get_product(product.id).await.unwrap().unwrap().is_favorite {
            ids.push(product.id);
        }
    }
    ids
}

#[cfg(test)]
mod merge_tests {
    use super::*;

    #[tokio::test]
    async fn test_cart_mirrors_snapshot_exactly() {
        let store = seeded_store().await;
        for id in [1, 2, 3] {
            store.insert_cart_item(id).await.unwrap();
        }

        apply_snapshot(&store, &cart_snapshot(&[(2, 4), (5, 1)]))
            .await
            .unwrap();

        assert_eq!(store.cart_items().await.unwrap(), cart(&[(2, 4), (5, 1)]));
    }

    #[tokio::test]
    async fn test_reconciliation_is_idempotent() {
        let store = seeded_store().await;
        let snapshots = [
            favorites_snapshot(&[2, 4]),
            cart_snapshot(&[(1, 2), (9, 1)]),
            Snapshot::new(
                Collection::Orders,
                vec![order_doc("o-1", 100, &[(1, 2, 2.0), (9, 1, 0.09)])],
            ),
        ];

        for snapshot in &snapshots {
            apply_snapshot(&store, snapshot).await.unwrap();
        }
        let once = (
            favorite_ids(&store).await,
            store.cart_items().await.unwrap(),
            store.orders().await.unwrap(),
            store.order_items("o-1").await.unwrap(),
        );

        for snapshot in &snapshots {
            apply_snapshot(&store, snapshot).await.unwrap();
        }
        let twice = (
            favorite_ids(&store).await,
            store.cart_items().await.unwrap(),
            store.orders().await.unwrap(),
            store.order_items("o-1").await.unwrap(),
        );

        assert_eq!(once, twice);
        assert_eq!(once.0, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_favorites_replace_local_flags() {
        let store = seeded_store().await;
        store.toggle_favorite(1).await.unwrap();
        store.toggle_favorite(3).await.unwrap();

        apply_snapshot(&store, &favorites_snapshot(&[3, 8])).await.unwrap();
        assert_eq!(favorite_ids(&store).await, vec![3, 8]);

        apply_snapshot(&store, &favorites_snapshot(&[])).await.unwrap();
        assert!(favorite_ids(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_orders_are_never_deleted_by_reconciliation() {
        let store = seeded_store().await;
        apply_snapshot(
            &store,
            &Snapshot::new(Collection::Orders, vec![order_doc("o-1", 100, &[(1, 1, 1.0)])]),
        )
        .await
        .unwrap();
        apply_snapshot(&store, &Snapshot::empty(Collection::Orders))
            .await
            .unwrap();

        let orders = store.orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "o-1");
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let store = seeded_store().await;
        let snapshot = Snapshot::new(
            Collection::Cart,
            vec![
                Document::new("1", json!({"productId": 1, "quantity": 2})),
                Document::new("2", json!({"productId": 2, "quantity": 0})),
                Document::new("3", json!({"quantity": 1})),
            ],
        );

        apply_snapshot(&store, &snapshot).await.unwrap();
        assert_eq!(store.cart_items().await.unwrap(), cart(&[(1, 2)]));
    }

    #[tokio::test]
    async fn test_order_lines_keep_captured_prices() {
        let store = seeded_store().await;
        apply_snapshot(
            &store,
            &Snapshot::new(Collection::Orders, vec![order_doc("o-9", 5, &[(7, 2, 19.98)])]),
        )
        .await
        .unwrap();

        let items = store.order_items("o-9").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].total_price, dec!(19.98));
        assert_eq!(items[0].order_id, "o-9");
    }
}

#[cfg(test)]
mod debounce_tests {
    use super::*;

    #[tokio::test]
    async fn test_only_last_snapshot_of_a_burst_is_applied() {
        let store = seeded_store().await;
        let remote = MemoryRemote::new();
        let subscription = remote.subscribe("u1", Collection::Cart).await.unwrap();
        let mut job = ReconcileJob::start(
            store.clone(),
            subscription,
            Collection::Cart,
            Duration::from_millis(150),
        );

        // Initial snapshot plus three writes, all well inside the quiet period.
        let path_1 = DocumentPath::cart("u1", 1);
        remote
            .write_document(&path_1, json!({"productId": 1, "quantity": 1}))
            .await
            .unwrap();
        remote
            .write_document(&path_1, json!({"productId": 1, "quantity": 2}))
            .await
            .unwrap();
        remote
            .write_document(
                &DocumentPath::cart("u1", 2),
                json!({"productId": 2, "quantity": 5}),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.cart_items().await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(job.applied_count(), 1);
        assert_eq!(store.cart_items().await.unwrap(), cart(&[(1, 2), (2, 5)]));

        job.cancel().await;
    }

    #[tokio::test]
    async fn test_snapshots_spaced_beyond_quiet_period_all_apply() {
        let store = seeded_store().await;
        let remote = MemoryRemote::new();
        let subscription = remote.subscribe("u1", Collection::Favorites).await.unwrap();
        let mut job = ReconcileJob::start(
            store.clone(),
            subscription,
            Collection::Favorites,
            Duration::from_millis(20),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        remote
            .write_document(&DocumentPath::favorite("u1", 4), json!({"id": 4}))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(job.applied_count(), 2);
        assert_eq!(favorite_ids(&store).await, vec![4]);
        job.cancel().await;
    }
}

#[cfg(test)]
mod end_to_end_tests {
    use super::*;

    #[tokio::test]
    async fn test_remote_cart_changes_reach_live_queries() {
        let h = harness(Duration::from_millis(10)).await;
        h.repo.register(EMAIL, PASSWORD, "shopper").await.unwrap();
        let user_id = h.user_id();

        let mut count = h.repo.observe_cart_count();
        wait_until(&mut count, |n| *n == 0).await;

        h.remote
            .write_document(
                &DocumentPath::cart(user_id.as_str(), 4),
                json!({"productId": 4, "quantity": 3}),
            )
            .await
            .unwrap();
        wait_until(&mut count, |n| *n == 1).await;

        let mut lines = h.repo.observe_cart();
        let lines = wait_until(&mut lines, |l| !l.is_empty()).await;
        assert_eq!(lines[0].product_id, 4);
        assert_eq!(lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_remote_favorites_reach_live_queries() {
        let h = harness(Duration::from_millis(10)).await;
        h.repo.register(EMAIL, PASSWORD, "shopper").await.unwrap();
        let user_id = h.user_id();

        let mut favorites = h.repo.observe_favorite_products();
        for id in [2, 6] {
            h.remote
                .write_document(&DocumentPath::favorite(user_id.as_str(), id), json!({"id": id}))
                .await
                .unwrap();
        }

        let favorites = wait_until(&mut favorites, |f| f.len() == 2).await;
        assert_eq!(favorites.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 6]);
    }

    #[tokio::test]
    async fn test_remote_orders_reach_live_queries_newest_first() {
        let h = harness(Duration::from_millis(10)).await;
        h.repo.register(EMAIL, PASSWORD, "shopper").await.unwrap();
        let user_id = h.user_id();

        for (id, time) in [("older", 1_000), ("newer", 2_000)] {
            let doc = order_doc(id, time, &[(5, 1, 0.05)]);
            h.remote
                .write_document(&DocumentPath::order(user_id.as_str(), id), doc.data)
                .await
                .unwrap();
        }

        let mut orders = h.repo.observe_orders();
        let orders = wait_until(&mut orders, |o| o.len() == 2).await;
        assert_eq!(orders[0].id, "newer");
        assert_eq!(orders[1].id, "older");
        assert_eq!(orders[0].items[0].title, "Product 5");
    }

    #[tokio::test]
    async fn test_search_filter_threshold() {
        let h = harness(Duration::from_millis(10)).await;
        h.repo.register(EMAIL, PASSWORD, "shopper").await.unwrap();

        let mut lap = h.repo.observe_products("lap");
        let lap = wait_until(&mut lap, |_| true).await;
        assert_eq!(lap.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let mut short = h.repo.observe_products("a");
        let short = wait_until(&mut short, |_| true).await;
        assert_eq!(short.len(), 10);
    }
}
