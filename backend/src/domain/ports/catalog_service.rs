//! Port for product price lookups.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::ProductId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalog adapters.
    pub enum CatalogServiceError {
        /// Catalog could not be reached.
        Unavailable { message: String } =>
            "catalog service unavailable: {message}",
    }
}

/// Read-only product catalog.
///
/// Prices are read at join time, so two joins on the same pool may observe
/// different prices if the catalog changes in between.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Current unit price of `product_id`, or `None` when it is unknown.
    async fn price_of(&self, product_id: &ProductId)
    -> Result<Option<Decimal>, CatalogServiceError>;
}

/// Fixture catalog quoting one price for every product.
#[derive(Debug, Clone, Copy)]
pub struct FixedPriceCatalog(pub Decimal);

#[async_trait]
impl CatalogService for FixedPriceCatalog {
    async fn price_of(
        &self,
        _product_id: &ProductId,
    ) -> Result<Option<Decimal>, CatalogServiceError> {
        Ok(Some(self.0))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixed_price_catalog_quotes_every_product() {
        let catalog = FixedPriceCatalog(Decimal::new(999, 2));

        let price = catalog
            .price_of(&ProductId::random())
            .await
            .expect("fixture lookup succeeds");

        assert_eq!(price, Some(Decimal::new(999, 2)));
    }

    #[rstest]
    fn unavailable_error_formats_message() {
        let err = CatalogServiceError::unavailable("dns failure");
        assert!(err.to_string().contains("dns failure"));
    }
}
