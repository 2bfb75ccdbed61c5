//! # Shopsync Engine
//!
//! Deterministic rules for a local-first shopping client.
//!
//! This crate holds the parts of client-side sync that need no IO: the local
//! data model, the shape and addressing of remote documents, how a remote
//! snapshot is merged into the local mirror, how a checkout becomes an order,
//! and the session state machine. The `shopsync-client` crate wires these to
//! SQLite and to the remote services.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, or platform
//! - **Full replacement**: Every snapshot supersedes the last, so merges are idempotent
//! - **Testable**: Pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Snapshots
//!
//! The remote store pushes the complete contents of a per-user collection
//! ([`Collection::Favorites`], [`Collection::Cart`], [`Collection::Orders`])
//! whenever it changes. A [`Snapshot`] is one such delivery.
//!
//! ### Merge plans
//!
//! [`reconcile::plan`] turns a snapshot into a [`MergePlan`]:
//! - [`FavoritesPlan`] - flag exactly the listed products, unflag the rest
//! - [`CartPlan`] - upsert every line, delete lines absent from the snapshot
//! - [`OrdersPlan`] - upsert headers and lines, never delete
//!
//! ### Orders
//!
//! [`NewOrder::assemble`] builds an order from checkout lines, capturing each
//! line's total price. [`group_order_lines`] builds the orders read model.
//!
//! ## Quick Start
//!
//! ```rust
//! use shopsync_engine::{reconcile, Collection, Document, MergePlan, Snapshot};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! let snapshot = Snapshot::new(
//!     Collection::Cart,
//!     vec![Document::new("3", json!({"productId": 3, "quantity": 2}))],
//! );
//!
//! let planned = reconcile::plan(&snapshot);
//! assert!(planned.rejected.is_empty());
//!
//! let MergePlan::Cart(cart) = planned.plan else { unreachable!() };
//! let mut local = BTreeMap::from([(3, 1), (9, 1)]);
//! cart.apply_to(&mut local);
//! assert_eq!(local, BTreeMap::from([(3, 2)]));
//! ```

pub mod document;
pub mod error;
pub mod model;
pub mod order;
pub mod reconcile;
pub mod search;
pub mod session;
pub mod snapshot;

// Re-export main types at crate root
pub use document::{
    CartDoc, Collection, DocumentPath, FavoriteDoc, OrderDoc, OrderItemDoc, USERS_ROOT,
};
pub use error::Error;
pub use model::{
    CartItem, CartLine, CatalogResponse, CheckoutLine, Order, OrderItem, OrderItemView,
    OrderLine, OrderView, Product, RemoteProduct, UserProfile, ORDER_STATUS_PROCESSING,
};
pub use order::{group_order_lines, NewOrder};
pub use reconcile::{CartPlan, FavoritesPlan, MergePlan, OrdersPlan, PlannedMerge};
pub use search::{SearchFilter, MIN_SEARCH_LEN};
pub use session::{ActiveSession, SessionState, Transition};
pub use snapshot::{Decoded, Document, Snapshot};

/// Type aliases for clarity
pub type ProductId = i64;
pub type UserId = String;
pub type OrderId = String;
pub type OrderItemId = String;
/// Milliseconds since the Unix epoch
pub type Timestamp = i64;
