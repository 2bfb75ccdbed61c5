//! User-initiated writes.
//!
//! Every mutation commits to the local store first, so readers see it right
//! away, and only then mirrors it to the remote store. A remote failure
//! never rolls the local write back.

use std::sync::Arc;

use chrono::Utc;
use shopsync_engine::{
    document, CartDoc, CheckoutLine, DocumentPath, Error as EngineError, FavoriteDoc, NewOrder,
    ProductId,
};

use crate::db::LocalStore;
use crate::error::{Outcome, Result};
use crate::remote::{RemoteStore, TransactionReader, Write};
use crate::session::SessionHandle;

#[derive(Clone)]
pub struct MutationPipeline {
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    session: SessionHandle,
}

impl MutationPipeline {
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteStore>, session: SessionHandle) -> Self {
        Self {
            store,
            remote,
            session,
        }
    }

    /// Flip the local favorite flag, then create or delete the remote
    /// favorite document in one remote transaction.
    ///
    /// The local flip happens even without a session; the caller then gets
    /// [`SyncError::Session`](crate::error::SyncError::Session).
    pub async fn toggle_favorite(&self, product_id: ProductId) -> Outcome {
        let flag = self.store.toggle_favorite(product_id).await?;
        tracing::debug!(product_id, favorite = ?flag, "Favorite toggled locally");

        let session = self.session.require()?;
        let path = DocumentPath::favorite(session.user_id(), product_id);
        let value = document::to_value(&FavoriteDoc { id: product_id })?;

        self.remote
            .run_transaction(Box::new(move |tx: &dyn TransactionReader| {
                if tx.get(&path).is_some() {
                    vec![Write::Delete { path }]
                } else {
                    vec![Write::Set { path, value }]
                }
            }))
            .await?;
        Ok(())
    }

    /// Put one unit of the product in the cart unless it is already there,
    /// locally and remotely.
    pub async fn add_to_cart(&self, product_id: ProductId) -> Outcome {
        let inserted = self.store.insert_cart_item(product_id).await?;
        tracing::debug!(product_id, inserted, "Cart line added locally");

        let session = self.session.require()?;
        let path = DocumentPath::cart(session.user_id(), product_id);
        let value = document::to_value(&CartDoc {
            product_id,
            quantity: 1,
        })?;

        self.remote
            .run_transaction(Box::new(move |tx: &dyn TransactionReader| {
                if tx.get(&path).is_some() {
                    Vec::new()
                } else {
                    vec![Write::Set { path, value }]
                }
            }))
            .await?;
        Ok(())
    }

    pub async fn delete_cart_item(&self, product_id: ProductId) -> Outcome {
        self.store.delete_cart_item(product_id).await?;

        let session = self.session.require()?;
        self.remote
            .delete_document(&DocumentPath::cart(session.user_id(), product_id))
            .await?;
        Ok(())
    }

    /// Set the quantity locally, then overwrite the remote cart document
    /// without checking whether it exists.
    pub async fn update_cart_quantity(&self, product_id: ProductId, quantity: u32) -> Outcome {
        if quantity == 0 {
            return Err(EngineError::InvalidQuantity {
                product_id,
                quantity,
            }
            .into());
        }
        self.store.update_cart_quantity(product_id, quantity).await?;

        let session = self.session.require()?;
        let value = document::to_value(&CartDoc {
            product_id,
            quantity,
        })?;
        self.remote
            .write_document(&DocumentPath::cart(session.user_id(), product_id), value)
            .await?;
        Ok(())
    }

    /// Create an order from checkout lines.
    ///
    /// Locally the order, its lines and the removal of the ordered products
    /// from the cart commit together. Remotely the order document and the
    /// cart deletions go out as one batch. Without a session the local order
    /// is kept and the batch is skipped.
    pub async fn create_order(&self, lines: &[CheckoutLine]) -> Outcome {
        let new_order = NewOrder::assemble(lines, Utc::now().timestamp_millis(), || {
            uuid::Uuid::new_v4().to_string()
        })?;
        self.store.create_order(&new_order).await?;
        tracing::info!(order_id = %new_order.order.id, lines = lines.len(), "Order created");

        let session = self.session.require()?;
        let writes = order_writes(session.user_id(), &new_order)?;
        self.remote.run_batch(writes).await?;
        Ok(())
    }
}

fn order_writes(user_id: &str, new_order: &NewOrder) -> Result<Vec<Write>> {
    let mut writes = vec![Write::Set {
        path: DocumentPath::order(user_id, new_order.order.id.clone()),
        value: document::to_value(&new_order.to_document())?,
    }];
    writes.extend(
        new_order
            .cart_product_ids()
            .into_iter()
            .map(|product_id| Write::Delete {
                path: DocumentPath::cart(user_id, product_id),
            }),
    );
    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_batch_sets_order_and_deletes_cart_docs() {
        let mut n = 0;
        let new_order = NewOrder::assemble(
            &[
                CheckoutLine::new(3, 1, dec!(9.99)),
                CheckoutLine::new(7, 2, dec!(19.98)),
            ],
            42,
            || {
                n += 1;
                format!("id-{}", n)
            },
        )
        .unwrap();

        let writes = order_writes("u1", &new_order).unwrap();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0].path().to_string(), "users/u1/orders/id-1");
        assert!(matches!(&writes[0], Write::Set { .. }));
        assert_eq!(
            writes[1],
            Write::Delete {
                path: DocumentPath::cart("u1", 3)
            }
        );
        assert_eq!(writes[2].path().to_string(), "users/u1/cart/7");
    }
}
