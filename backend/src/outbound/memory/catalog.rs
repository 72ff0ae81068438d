//! In-memory `CatalogService`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::ProductId;
use crate::domain::ports::{CatalogService, CatalogServiceError};

/// Price list keyed by product id. Prices may change between joins.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    prices: Mutex<HashMap<ProductId, Decimal>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the unit price of `product_id`.
    pub fn set_price(&self, product_id: ProductId, unit_price: Decimal) {
        self.prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id, unit_price);
    }

    /// Remove `product_id` from the catalog.
    pub fn remove(&self, product_id: &ProductId) {
        self.prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(product_id);
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn price_of(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Decimal>, CatalogServiceError> {
        Ok(self
            .prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(product_id)
            .copied())
    }
}
