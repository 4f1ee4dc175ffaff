//! Cache types for catalog reads.

use bazaar_core::ProductNo;

use super::products::ProductFilter;
use super::types::Product;

/// Cache key for catalog queries.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductNo),
    Products(ProductFilter),
    Featured(usize),
    ProductTypes,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    ProductTypes(Vec<String>),
}
