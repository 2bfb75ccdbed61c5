//! Remote collection snapshots.
//!
//! A snapshot is the complete set of documents of one collection at some
//! point in time. It supersedes every snapshot delivered before it, so the
//! client never needs deltas.

use crate::{document::from_value, Collection, Error};
use serde::de::DeserializeOwned;

/// A single remote document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Last path segment of the document
    pub id: String,
    /// Document body
    pub data: serde_json::Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Full contents of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: Collection,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(collection: Collection, documents: Vec<Document>) -> Self {
        Self {
            collection,
            documents,
        }
    }

    /// An empty snapshot of a collection.
    pub fn empty(collection: Collection) -> Self {
        Self::new(collection, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Decode every document as `T`.
    ///
    /// Documents that do not decode are collected in [`Decoded::rejected`]
    /// instead of failing the whole snapshot.
    pub fn decode<T: DeserializeOwned>(&self) -> Decoded<T> {
        let mut decoded = Decoded::default();
        for doc in &self.documents {
            match from_value::<T>(&doc.id, &doc.data) {
                Ok(item) => decoded.items.push(item),
                Err(err) => decoded.rejected.push(err),
            }
        }
        decoded
    }
}

/// Result of decoding a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub rejected: Vec<Error>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            rejected: Vec::new(),
        }
    }
}
