//! Merge plans that turn a remote snapshot into local writes.
//!
//! Every plan is a full replacement of the collection's local mirror, never
//! a delta, so applying the same plan twice leaves the same state as applying
//! it once.
//!
//! # Rules
//!
//! - Favorites: exactly the products named in the snapshot are flagged,
//!   every other product is unflagged.
//! - Cart: every snapshot line is upserted and every local line whose
//!   product is absent from the snapshot is deleted.
//! - Orders: headers and lines are upserted; local orders are never deleted.

use crate::{
    document::{CartDoc, FavoriteDoc, OrderDoc},
    CartItem, Collection, Error, Order, OrderId, OrderItem, OrderItemId, ProductId, Snapshot,
};
use std::collections::{BTreeMap, BTreeSet};

/// Favorites full-replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesPlan {
    favorite_ids: BTreeSet<ProductId>,
}

impl FavoritesPlan {
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self {
            favorite_ids: ids.into_iter().collect(),
        }
    }

    /// Products that end up flagged.
    pub fn favorite_ids(&self) -> &BTreeSet<ProductId> {
        &self.favorite_ids
    }

    pub fn is_favorite(&self, product_id: ProductId) -> bool {
        self.favorite_ids.contains(&product_id)
    }

    /// Apply to an in-memory `product id -> favorite` map.
    pub fn apply_to(&self, flags: &mut BTreeMap<ProductId, bool>) {
        for (id, flag) in flags.iter_mut() {
            *flag = self.favorite_ids.contains(id);
        }
    }
}

/// Cart upsert-then-prune.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartPlan {
    lines: BTreeMap<ProductId, u32>,
}

impl CartPlan {
    /// Later lines for the same product replace earlier ones.
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        Self {
            lines: items
                .into_iter()
                .map(|item| (item.product_id, item.quantity))
                .collect(),
        }
    }

    /// Rows to insert or replace, ordered by product id.
    pub fn upserts(&self) -> impl Iterator<Item = CartItem> + '_ {
        self.lines.iter().map(|(&product_id, &quantity)| CartItem {
            product_id,
            quantity,
        })
    }

    /// Product ids that survive the prune step.
    pub fn keep_ids(&self) -> Vec<ProductId> {
        self.lines.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Apply to an in-memory `product id -> quantity` map.
    pub fn apply_to(&self, cart: &mut BTreeMap<ProductId, u32>) {
        cart.extend(self.lines.iter().map(|(k, v)| (*k, *v)));
        cart.retain(|id, _| self.lines.contains_key(id));
    }
}

/// Orders upsert. Never deletes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersPlan {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
}

impl OrdersPlan {
    pub fn from_docs(docs: impl IntoIterator<Item = OrderDoc>) -> Self {
        let mut plan = OrdersPlan::default();
        for doc in docs {
            let (order, items) = doc.into_rows();
            plan.orders.push(order);
            plan.items.extend(items);
        }
        plan
    }

    /// Apply to in-memory order and order-item maps.
    pub fn apply_to(
        &self,
        orders: &mut BTreeMap<OrderId, Order>,
        items: &mut BTreeMap<OrderItemId, OrderItem>,
    ) {
        for order in &self.orders {
            orders.insert(order.id.clone(), order.clone());
        }
        for item in &self.items {
            items.insert(item.id.clone(), item.clone());
        }
    }
}

/// A merge plan for one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum MergePlan {
    Favorites(FavoritesPlan),
    Cart(CartPlan),
    Orders(OrdersPlan),
}

impl MergePlan {
    pub fn collection(&self) -> Collection {
        match self {
            MergePlan::Favorites(_) => Collection::Favorites,
            MergePlan::Cart(_) => Collection::Cart,
            MergePlan::Orders(_) => Collection::Orders,
        }
    }
}

/// A plan plus the documents that were left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMerge {
    pub plan: MergePlan,
    pub rejected: Vec<Error>,
}

/// Build the merge plan for a snapshot.
///
/// Documents that fail to decode, and cart lines with a zero quantity, are
/// reported in [`PlannedMerge::rejected`] and treated as absent.
pub fn plan(snapshot: &Snapshot) -> PlannedMerge {
    match snapshot.collection {
        Collection::Favorites => {
            let decoded = snapshot.decode::<FavoriteDoc>();
            PlannedMerge {
                plan: MergePlan::Favorites(FavoritesPlan::from_ids(
                    decoded.items.into_iter().map(|doc| doc.id),
                )),
                rejected: decoded.rejected,
            }
        }
        Collection::Cart => {
            let decoded = snapshot.decode::<CartDoc>();
            let mut rejected = decoded.rejected;
            let mut items = Vec::with_capacity(decoded.items.len());
            for doc in decoded.items {
                if doc.quantity == 0 {
                    rejected.push(Error::InvalidQuantity {
                        product_id: doc.product_id,
                        quantity: doc.quantity,
                    });
                } else {
                    items.push(CartItem::from(doc));
                }
            }
            PlannedMerge {
                plan: MergePlan::Cart(CartPlan::from_items(items)),
                rejected,
            }
        }
        Collection::Orders => {
            let decoded = snapshot.decode::<OrderDoc>();
            PlannedMerge {
                plan: MergePlan::Orders(OrdersPlan::from_docs(decoded.items)),
                rejected: decoded.rejected,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn cart_snapshot(lines: &[(ProductId, i64)]) -> Snapshot {
        Snapshot::new(
            Collection::Cart,
            lines
                .iter()
                .map(|(id, qty)| {
                    Document::new(id.to_string(), json!({"productId": id, "quantity": qty}))
                })
                .collect(),
        )
    }

    #[test]
    fn favorites_full_replace() {
        let snapshot = Snapshot::new(
            Collection::Favorites,
            vec![Document::new("2", json!({"id": 2}))],
        );
        let planned = plan(&snapshot);
        let MergePlan::Favorites(favorites) = planned.plan else {
            panic!("expected favorites plan");
        };

        let mut flags = BTreeMap::from([(1, true), (2, false), (3, true)]);
        favorites.apply_to(&mut flags);
        assert_eq!(flags, BTreeMap::from([(1, false), (2, true), (3, false)]));
    }

    #[test]
    fn cart_upsert_then_prune() {
        let planned = plan(&cart_snapshot(&[(3, 2), (9, 1)]));
        let MergePlan::Cart(cart_plan) = planned.plan else {
            panic!("expected cart plan");
        };

        let mut cart = BTreeMap::from([(3, 1), (7, 4)]);
        cart_plan.apply_to(&mut cart);
        assert_eq!(cart, BTreeMap::from([(3, 2), (9, 1)]));
        assert_eq!(cart_plan.keep_ids(), vec![3, 9]);
    }

    #[test]
    fn cart_zero_quantity_is_rejected() {
        let planned = plan(&cart_snapshot(&[(3, 0), (4, 1)]));
        assert_eq!(planned.rejected.len(), 1);
        let MergePlan::Cart(cart_plan) = planned.plan else {
            panic!("expected cart plan");
        };
        assert_eq!(cart_plan.keep_ids(), vec![4]);
    }

    #[test]
    fn cart_duplicate_product_last_wins() {
        let plan = CartPlan::from_items([
            CartItem {
                product_id: 1,
                quantity: 1,
            },
            CartItem {
                product_id: 1,
                quantity: 5,
            },
        ]);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.upserts().next().map(|i| i.quantity), Some(5));
    }

    #[test]
    fn orders_never_delete() {
        let snapshot = Snapshot::new(
            Collection::Orders,
            vec![Document::new(
                "o-2",
                json!({
                    "id": "o-2",
                    "orderTime": 2000,
                    "orderStatus": "processing",
                    "orderItems": [{"id": "i-2", "quantity": 1, "productId": 4, "orderId": "o-2", "totalPrice": 4.5}]
                }),
            )],
        );
        let MergePlan::Orders(orders_plan) = plan(&snapshot).plan else {
            panic!("expected orders plan");
        };

        let mut orders = BTreeMap::from([(
            "o-1".to_string(),
            Order {
                id: "o-1".into(),
                order_time: 1000,
                status: "processing".into(),
            },
        )]);
        let mut items = BTreeMap::new();
        orders_plan.apply_to(&mut orders, &mut items);

        assert_eq!(orders.len(), 2);
        assert_eq!(items["i-2"].total_price, dec!(4.5));
    }

    #[test]
    fn plan_reports_collection() {
        for collection in Collection::ALL {
            assert_eq!(plan(&Snapshot::empty(collection)).plan.collection(), collection);
        }
    }
}
