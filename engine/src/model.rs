//! Local data model.
//!
//! These are the rows the local store holds and the read models it serves.
//! `Product::is_favorite` exists only locally; the catalog never carries it.

use crate::{OrderId, OrderItemId, ProductId, Timestamp, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status every freshly created order starts in.
pub const ORDER_STATUS_PROCESSING: &str = "processing";

/// A catalog product as held in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stable external identifier from the catalog
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub rating: Decimal,
    pub images: Vec<String>,
    pub thumbnail: String,
    /// Local-only favorite flag
    pub is_favorite: bool,
}

impl Product {
    /// Build a local product from a catalog entry.
    pub fn from_remote(remote: RemoteProduct, is_favorite: bool) -> Self {
        Self {
            id: remote.id,
            title: remote.title,
            description: remote.description,
            category: remote.category,
            price: remote.price,
            rating: remote.rating,
            images: remote.images,
            thumbnail: remote.thumbnail,
            is_favorite,
        }
    }
}

/// A product record as returned by the catalog API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProduct {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub rating: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    pub thumbnail: String,
}

/// Body of a catalog listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub products: Vec<RemoteProduct>,
}

/// A cart row. At most one per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A cart row joined with the product fields the cart screen displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub rating: Decimal,
}

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Creation time (milliseconds since epoch)
    pub order_time: Timestamp,
    pub status: String,
}

/// One line of an order. `total_price` is captured at checkout and never
/// re-derived from the current product price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub quantity: u32,
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub total_price: Decimal,
}

/// A line the user is checking out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub items_total_price: Decimal,
}

impl CheckoutLine {
    pub fn new(product_id: ProductId, quantity: u32, items_total_price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            items_total_price,
        }
    }
}

/// One row of the order read query: order header, order line and product
/// display fields flattened together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub order_id: OrderId,
    pub order_time: Timestamp,
    pub order_status: String,
    pub product_id: ProductId,
    pub quantity: u32,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub total_price: Decimal,
}

/// An order with its lines, as shown on the orders screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub order_time: Timestamp,
    pub status: String,
    pub items: Vec<OrderItemView>,
}

/// A single line of an [`OrderView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub total_price: Decimal,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
}

/// The profile document stored for each registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: UserId,
    pub username: String,
    pub email: String,
}
