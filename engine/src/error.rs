//! Error types for the Shopsync engine.

use crate::ProductId;
use thiserror::Error;

/// All possible errors from the Shopsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Addressing errors
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("invalid document path: {0}")]
    InvalidPath(String),

    // Document errors
    #[error("invalid document '{id}': {reason}")]
    InvalidDocument { id: String, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    // Checkout errors
    #[error("order has no items")]
    EmptyOrder,

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    // Session errors
    #[error("invalid session: {0}")]
    InvalidSession(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
