//! Cache types for catalog responses.

use super::types::{Branch, Category, Juice, MenuQuery};

/// Cache key for catalog listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Branches,
    Categories,
    Menu(MenuQuery),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Branches(Vec<Branch>),
    Categories(Vec<Category>),
    Menu(Vec<Juice>),
}
