//! Property tests for merge plans and read models.
//!
//! These cover the guarantees the client relies on when it applies a
//! remote snapshot: idempotence, exact mirroring and isolation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use shopsync_engine::{
    group_order_lines, reconcile, CartPlan, Collection, Document, FavoritesPlan, MergePlan,
    OrderLine, Product, ProductId, SearchFilter, Snapshot,
};
use std::collections::{BTreeMap, BTreeSet};

fn cart_snapshot(lines: &BTreeMap<ProductId, u32>) -> Snapshot {
    Snapshot::new(
        Collection::Cart,
        lines
            .iter()
            .map(|(id, qty)| Document::new(id.to_string(), json!({"productId": id, "quantity": qty})))
            .collect(),
    )
}

fn cart_plan(snapshot: &Snapshot) -> CartPlan {
    match reconcile::plan(snapshot).plan {
        MergePlan::Cart(plan) => plan,
        other => panic!("expected cart plan, got {:?}", other),
    }
}

fn product(id: ProductId, title: &str, description: &str) -> Product {
    Product {
        id,
        title: title.into(),
        description: description.into(),
        category: "misc".into(),
        price: Decimal::new(id, 2),
        rating: Decimal::ONE,
        images: vec![],
        thumbnail: String::new(),
        is_favorite: false,
    }
}

fn cart_lines() -> impl Strategy<Value = BTreeMap<ProductId, u32>> {
    prop::collection::btree_map(1i64..50, 1u32..20, 0..15)
}

proptest! {
    #[test]
    fn cart_mirrors_snapshot_exactly(
        local in prop::collection::btree_map(1i64..50, 1u32..20, 0..15),
        remote in cart_lines(),
    ) {
        let mut cart = local;
        cart_plan(&cart_snapshot(&remote)).apply_to(&mut cart);
        prop_assert_eq!(cart, remote);
    }

    #[test]
    fn cart_merge_is_idempotent(
        local in cart_lines(),
        remote in cart_lines(),
    ) {
        let plan = cart_plan(&cart_snapshot(&remote));
        let mut once = local.clone();
        plan.apply_to(&mut once);
        let mut twice = local;
        plan.apply_to(&mut twice);
        plan.apply_to(&mut twice);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn favorites_flag_exactly_the_snapshot(
        products in prop::collection::btree_set(1i64..100, 0..30),
        favorites in prop::collection::btree_set(1i64..100, 0..30),
    ) {
        let mut flags: BTreeMap<ProductId, bool> = products.iter().map(|id| (*id, true)).collect();
        let plan = FavoritesPlan::from_ids(favorites.iter().copied());
        plan.apply_to(&mut flags);

        let flagged: BTreeSet<ProductId> =
            flags.iter().filter(|(_, f)| **f).map(|(id, _)| *id).collect();
        let expected: BTreeSet<ProductId> = products.intersection(&favorites).copied().collect();
        prop_assert_eq!(flagged, expected);
        prop_assert_eq!(flags.len(), products.len());
    }

    #[test]
    fn short_queries_never_filter(query in ".{0,2}", title in ".*") {
        let filter = SearchFilter::parse(&query);
        prop_assert_eq!(&filter, &SearchFilter::All);
        prop_assert!(filter.matches(&product(1, &title, "")));
    }

    #[test]
    fn search_is_case_insensitive(needle in "[a-z]{3,6}", prefix in "[a-z ]{0,5}") {
        let upper = needle.to_uppercase();
        let title = format!("{}{}", prefix, upper);
        prop_assert!(SearchFilter::parse(&needle).matches(&product(1, &title, "")));
        let body = format!("{}{}", prefix, needle);
        prop_assert!(SearchFilter::parse(&upper).matches(&product(1, "", &body)));
    }

    #[test]
    fn grouping_keeps_every_line(order_count in 1usize..6, per_order in 1usize..5) {
        let mut rows = Vec::new();
        for o in 0..order_count {
            for p in 0..per_order {
                rows.push(OrderLine {
                    order_id: format!("o-{}", o),
                    order_time: 10_000 - o as i64,
                    order_status: "processing".into(),
                    product_id: p as ProductId,
                    quantity: 1,
                    title: String::new(),
                    description: String::new(),
                    thumbnail: String::new(),
                    total_price: Decimal::ONE,
                });
            }
        }

        let orders = group_order_lines(rows);
        prop_assert_eq!(orders.len(), order_count);
        prop_assert!(orders.iter().all(|o| o.items.len() == per_order));
        prop_assert!(orders.windows(2).all(|w| w[0].order_time >= w[1].order_time));
    }
}

#[test]
fn unknown_fields_in_documents_are_ignored() {
    let snapshot = Snapshot::new(
        Collection::Favorites,
        vec![Document::new("8", json!({"id": 8, "addedAt": 12345}))],
    );
    let planned = reconcile::plan(&snapshot);
    assert!(planned.rejected.is_empty());
    match planned.plan {
        MergePlan::Favorites(plan) => assert!(plan.is_favorite(8)),
        other => panic!("expected favorites plan, got {:?}", other),
    }
}

#[test]
fn empty_cart_snapshot_clears_everything() {
    let mut cart = BTreeMap::from([(1, 2), (2, 1)]);
    cart_plan(&Snapshot::empty(Collection::Cart)).apply_to(&mut cart);
    assert!(cart.is_empty());
}
