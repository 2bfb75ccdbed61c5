//! Product catalog API.

use async_trait::async_trait;
use shopsync_engine::{CatalogResponse, RemoteProduct};
use tokio::sync::RwLock;

use super::RemoteError;

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_catalog(&self, limit: u32) -> Result<Vec<RemoteProduct>, RemoteError>;
}

/// Catalog served over HTTP as `GET {base}products?limit=N`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn products_url(&self, limit: u32) -> String {
        format!("{}products?limit={}", self.base_url, limit)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn fetch_catalog(&self, limit: u32) -> Result<Vec<RemoteProduct>, RemoteError> {
        let url = self.products_url(limit);
        tracing::debug!(url = %url, "Fetching catalog");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Catalog(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Catalog(format!("HTTP {}", status)));
        }

        let body: CatalogResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::Catalog(e.to_string()))?;
        Ok(body.products)
    }
}

/// A fixed catalog that can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    products: RwLock<Vec<RemoteProduct>>,
}

impl StaticCatalog {
    pub fn new(products: Vec<RemoteProduct>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    pub async fn replace(&self, products: Vec<RemoteProduct>) {
        *self.products.write().await = products;
    }
}

#[async_trait]
impl CatalogApi for StaticCatalog {
    async fn fetch_catalog(&self, limit: u32) -> Result<Vec<RemoteProduct>, RemoteError> {
        let products = self.products.read().await;
        Ok(products.iter().take(limit as usize).cloned().collect())
    }
}
