//! Catalog queries against `product_master`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use bazaar_core::{Price, ProductNo};

use super::cache::{CacheKey, CacheValue};
use super::rest::{Query, Rest};
use super::types::{Product, ProductInput, tables};
use super::BackendError;

/// Attempts at allocating a product number before giving up.
const MAX_ALLOCATION_ATTEMPTS: usize = 3;

/// Price band offered by the listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceBand {
    #[serde(rename = "under-50")]
    Under50,
    #[serde(rename = "50-100")]
    From50To100,
    #[serde(rename = "100-200")]
    From100To200,
    #[serde(rename = "over-200")]
    Over200,
}

impl PriceBand {
    pub const ALL: [Self; 4] = [
        Self::Under50,
        Self::From50To100,
        Self::From100To200,
        Self::Over200,
    ];

    /// Query-string value.
    #[must_use]
    pub const fn as_param(&self) -> &'static str {
        match self {
            Self::Under50 => "under-50",
            Self::From50To100 => "50-100",
            Self::From100To200 => "100-200",
            Self::Over200 => "over-200",
        }
    }

    /// Button label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Under50 => "Under $50",
            Self::From50To100 => "$50 - $100",
            Self::From100To200 => "$100 - $200",
            Self::Over200 => "Over $200",
        }
    }

    /// Inclusive lower and exclusive upper bound in whole dollars.
    #[must_use]
    pub const fn bounds(&self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Under50 => (None, Some(50)),
            Self::From50To100 => (Some(50), Some(100)),
            Self::From100To200 => (Some(100), Some(200)),
            Self::Over200 => (Some(200), None),
        }
    }

    /// Whether `price` falls in this band.
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        let (low, high) = self.bounds();
        let amount = price.amount();
        low.is_none_or(|l| amount >= Decimal::from(l)) && high.is_none_or(|h| amount < Decimal::from(h))
    }
}

impl fmt::Display for PriceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for PriceBand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|band| band.as_param() == s.trim())
            .ok_or(())
    }
}

/// Listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductFilter {
    pub product_type: Option<String>,
    pub price: Option<PriceBand>,
}

impl ProductFilter {
    fn to_query(&self) -> Query {
        let mut query = Query::table(tables::PRODUCT_MASTER).select("*");
        if let Some(product_type) = &self.product_type {
            query = query.eq("product_type", product_type);
        }
        if let Some(band) = self.price {
            let (low, high) = band.bounds();
            if let Some(low) = low {
                query = query.gte("product_price", low);
            }
            if let Some(high) = high {
                query = query.lt("product_price", high);
            }
        }
        query.order("product_no", true)
    }
}

/// Repository for catalog operations.
pub struct ProductRepository<'a> {
    rest: Rest<'a>,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(rest: Rest<'a>) -> Self {
        Self { rest }
    }

    /// List products matching `filter`, ordered by product number.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        let cache_key = CacheKey::Products(filter.clone());
        let cache = self.rest.client().cache();

        if let Some(CacheValue::Products(products)) = cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self.rest.fetch(&filter.to_query()).await?;
        cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// The first `limit` products by product number (home page).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self))]
    pub async fn featured(&self, limit: usize) -> Result<Vec<Product>, BackendError> {
        let cache_key = CacheKey::Featured(limit);
        let cache = self.rest.client().cache();

        if let Some(CacheValue::Products(products)) = cache.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let query = Query::table(tables::PRODUCT_MASTER)
            .select("*")
            .order("product_no", true)
            .limit(limit);
        let products: Vec<Product> = self.rest.fetch(&query).await?;
        cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Get a product by number.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self), fields(product_no = %product_no))]
    pub async fn get(&self, product_no: ProductNo) -> Result<Option<Product>, BackendError> {
        let cache_key = CacheKey::Product(product_no);
        let cache = self.rest.client().cache();

        if let Some(CacheValue::Product(product)) = cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let query = Query::table(tables::PRODUCT_MASTER)
            .select("*")
            .eq("product_no", product_no);
        let product: Option<Product> = self.rest.fetch_optional(query).await?;
        if let Some(product) = &product {
            cache
                .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }
        Ok(product)
    }

    /// Distinct product types, sorted, without blanks.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self))]
    pub async fn types(&self) -> Result<Vec<String>, BackendError> {
        #[derive(Deserialize)]
        struct TypeRow {
            #[serde(default)]
            product_type: Option<String>,
        }

        let cache = self.rest.client().cache();
        if let Some(CacheValue::ProductTypes(types)) = cache.get(&CacheKey::ProductTypes).await {
            return Ok(types);
        }

        let rows: Vec<TypeRow> = self
            .rest
            .fetch(&Query::table(tables::PRODUCT_MASTER).select("product_type"))
            .await?;
        let types: Vec<String> = rows
            .into_iter()
            .filter_map(|row| row.product_type)
            .filter(|t| !t.trim().is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        cache
            .insert(CacheKey::ProductTypes, CacheValue::ProductTypes(types.clone()))
            .await;
        Ok(types)
    }

    /// Number of products in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn count(&self) -> Result<u64, BackendError> {
        self.rest
            .count(&Query::table(tables::PRODUCT_MASTER).select("product_no"))
            .await
    }

    /// The number the next new product will get (highest + 1, or 1).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn next_product_no(&self) -> Result<ProductNo, BackendError> {
        #[derive(Deserialize)]
        struct NoRow {
            product_no: ProductNo,
        }

        let query = Query::table(tables::PRODUCT_MASTER)
            .select("product_no")
            .order("product_no", false);
        let max: Option<NoRow> = self.rest.fetch_optional(query).await?;
        Ok(max.map_or(ProductNo::new(1), |row| row.product_no.next()))
    }

    /// Create a product with the next free number.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if a number could not be allocated
    /// after a few attempts.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: ProductInput) -> Result<Product, BackendError> {
        let mut last_error = None;
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let product = input.clone().into_product(self.next_product_no().await?);
            match self.rest.insert(tables::PRODUCT_MASTER, &product).await {
                Ok(()) => {
                    self.rest.client().invalidate_catalog().await;
                    tracing::info!(product_no = %product.product_no, "Product created");
                    return Ok(product);
                }
                Err(e) if e.is_conflict() => {
                    tracing::warn!(attempt, product_no = %product.product_no, "Product number taken, retrying");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| BackendError::Conflict("product_no".to_string())))
    }

    /// Overwrite a product's columns. Returns whether the product existed.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, input), fields(product_no = %product_no))]
    pub async fn update(
        &self,
        product_no: ProductNo,
        input: &ProductInput,
    ) -> Result<bool, BackendError> {
        let query = Query::table(tables::PRODUCT_MASTER).eq("product_no", product_no);
        let changed = self.rest.update(&query, input).await?;
        self.rest.client().invalidate_catalog().await;
        Ok(changed > 0)
    }

    /// Delete a product. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self), fields(product_no = %product_no))]
    pub async fn delete(&self, product_no: ProductNo) -> Result<bool, BackendError> {
        let query = Query::table(tables::PRODUCT_MASTER).eq("product_no", product_no);
        let removed = self.rest.delete(&query).await?;
        self.rest.client().invalidate_catalog().await;
        Ok(removed > 0)
    }

    /// Replace the whole catalog with `products`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if either the delete or the insert fails. A
    /// failed insert leaves the catalog empty.
    #[instrument(skip(self, products), fields(count = products.len()))]
    pub async fn replace_catalog(&self, products: &[Product]) -> Result<usize, BackendError> {
        // PostgREST refuses an unfiltered DELETE; this filter matches every real row.
        let all = Query::table(tables::PRODUCT_MASTER).neq("product_no", 0);
        let removed = self.rest.delete(&all).await?;
        // The old rows are gone whether or not the insert succeeds.
        self.rest.client().invalidate_catalog().await;
        self.rest.insert(tables::PRODUCT_MASTER, products).await?;
        self.rest.client().invalidate_catalog().await;
        tracing::info!(removed, inserted = products.len(), "Catalog replaced");
        Ok(products.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_band_round_trip() {
        for band in PriceBand::ALL {
            assert_eq!(band.as_param().parse::<PriceBand>(), Ok(band));
        }
        assert!("cheap".parse::<PriceBand>().is_err());
    }

    #[test]
    fn test_price_band_contains() {
        assert!(PriceBand::Under50.contains(Price::from_cents(4_999)));
        assert!(!PriceBand::Under50.contains(Price::from_cents(5_000)));
        assert!(PriceBand::From50To100.contains(Price::from_cents(5_000)));
        assert!(PriceBand::From100To200.contains(Price::from_cents(19_999)));
        assert!(PriceBand::Over200.contains(Price::from_cents(20_000)));
    }

    #[test]
    fn test_filter_query() {
        let filter = ProductFilter {
            product_type: Some("Electronics".to_string()),
            price: Some(PriceBand::From100To200),
        };
        let params = filter.to_query();
        let rendered: Vec<(&str, &str)> = params
            .params()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("select", "*"),
                ("product_type", "eq.Electronics"),
                ("product_price", "gte.100"),
                ("product_price", "lt.200"),
                ("order", "product_no.asc"),
            ]
        );
    }
}
