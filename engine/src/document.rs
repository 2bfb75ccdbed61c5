//! Remote document shapes and addressing.
//!
//! The remote store keeps one profile document per user at `users/{uid}` and
//! three per-user collections below it, addressed as
//! `users/{uid}/{collection}/{documentId}`.

use crate::{
    error::Result, CartItem, Error, Order, OrderId, OrderItem, OrderItemId, ProductId, Timestamp,
    UserId,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root collection holding one document per user.
pub const USERS_ROOT: &str = "users";

/// The per-user collections the client mirrors locally.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Favorites,
    Cart,
    Orders,
}

impl Collection {
    /// All mirrored collections, in the order observation starts them.
    pub const ALL: [Collection; 3] = [Collection::Orders, Collection::Favorites, Collection::Cart];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::Cart => "cart",
            Collection::Orders => "orders",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "favorites" => Ok(Collection::Favorites),
            "cart" => Ok(Collection::Cart),
            "orders" => Ok(Collection::Orders),
            other => Err(Error::UnknownCollection(other.to_string())),
        }
    }
}

/// Address of a remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentPath {
    /// `users/{uid}`
    User(UserId),
    /// `users/{uid}/{collection}/{id}`
    Document {
        user_id: UserId,
        collection: Collection,
        id: String,
    },
}

impl DocumentPath {
    pub fn user(user_id: impl Into<UserId>) -> Self {
        DocumentPath::User(user_id.into())
    }

    pub fn document(user_id: impl Into<UserId>, collection: Collection, id: impl Into<String>) -> Self {
        DocumentPath::Document {
            user_id: user_id.into(),
            collection,
            id: id.into(),
        }
    }

    /// Favorite documents are keyed by product id.
    pub fn favorite(user_id: impl Into<UserId>, product_id: ProductId) -> Self {
        Self::document(user_id, Collection::Favorites, product_id.to_string())
    }

    /// Cart documents are keyed by product id.
    pub fn cart(user_id: impl Into<UserId>, product_id: ProductId) -> Self {
        Self::document(user_id, Collection::Cart, product_id.to_string())
    }

    pub fn order(user_id: impl Into<UserId>, order_id: impl Into<OrderId>) -> Self {
        Self::document(user_id, Collection::Orders, order_id.into())
    }

    pub fn user_id(&self) -> &str {
        match self {
            DocumentPath::User(user_id) => user_id,
            DocumentPath::Document { user_id, .. } => user_id,
        }
    }

    /// The collection this document lives in, `None` for profile documents.
    pub fn collection(&self) -> Option<Collection> {
        match self {
            DocumentPath::User(_) => None,
            DocumentPath::Document { collection, .. } => Some(*collection),
        }
    }

    pub fn document_id(&self) -> &str {
        match self {
            DocumentPath::User(user_id) => user_id,
            DocumentPath::Document { id, .. } => id,
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentPath::User(user_id) => write!(f, "{}/{}", USERS_ROOT, user_id),
            DocumentPath::Document {
                user_id,
                collection,
                id,
            } => write!(f, "{}/{}/{}/{}", USERS_ROOT, user_id, collection, id),
        }
    }
}

impl FromStr for DocumentPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) || parts.first() != Some(&USERS_ROOT) {
            return Err(Error::InvalidPath(s.to_string()));
        }

        match parts.as_slice() {
            [_, user_id] => Ok(DocumentPath::user(*user_id)),
            [_, user_id, collection, id] => Ok(DocumentPath::document(
                *user_id,
                collection.parse::<Collection>()?,
                *id,
            )),
            _ => Err(Error::InvalidPath(s.to_string())),
        }
    }
}

/// `users/{uid}/favorites/{productId}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteDoc {
    pub id: ProductId,
}

/// `users/{uid}/cart/{productId}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDoc {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl From<CartDoc> for CartItem {
    fn from(doc: CartDoc) -> Self {
        CartItem {
            product_id: doc.product_id,
            quantity: doc.quantity,
        }
    }
}

/// `users/{uid}/orders/{orderId}`, with its lines embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDoc {
    pub id: OrderId,
    pub order_time: Timestamp,
    pub order_status: String,
    #[serde(default)]
    pub order_items: Vec<OrderItemDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDoc {
    pub id: OrderItemId,
    pub quantity: u32,
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub total_price: Decimal,
}

impl OrderDoc {
    /// Split into local rows. Lines are attached to the order document that
    /// embeds them.
    pub fn into_rows(self) -> (Order, Vec<OrderItem>) {
        let order = Order {
            id: self.id,
            order_time: self.order_time,
            status: self.order_status,
        };
        let items = self
            .order_items
            .into_iter()
            .map(|item| OrderItem {
                id: item.id,
                quantity: item.quantity,
                product_id: item.product_id,
                order_id: order.id.clone(),
                total_price: item.total_price,
            })
            .collect();
        (order, items)
    }

    /// Build the remote document for a locally created order.
    pub fn from_rows(order: &Order, items: &[OrderItem]) -> Self {
        Self {
            id: order.id.clone(),
            order_time: order.order_time,
            order_status: order.status.clone(),
            order_items: items
                .iter()
                .map(|item| OrderItemDoc {
                    id: item.id.clone(),
                    quantity: item.quantity,
                    product_id: item.product_id,
                    order_id: item.order_id.clone(),
                    total_price: item.total_price,
                })
                .collect(),
        }
    }
}

/// Serialize a document body.
pub fn to_value<T: Serialize>(doc: &T) -> Result<serde_json::Value> {
    serde_json::to_value(doc).map_err(|e| Error::Serialization(e.to_string()))
}

/// Deserialize a document body, naming the document on failure.
pub fn from_value<T: DeserializeOwned>(id: &str, value: &serde_json::Value) -> Result<T> {
    T::deserialize(value).map_err(|e| Error::InvalidDocument {
        id: id.to_string(),
        reason: e.to_string(),
    })
}
