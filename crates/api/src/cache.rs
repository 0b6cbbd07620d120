//! Cache types for catalog responses.
//!
//! Only anonymous, locale-scoped catalog reads are cached. Keys carry the
//! locale because the API localises names and descriptions.

use sapa_core::{Locale, Page};

use crate::types::{Attribute, Category, Product, Settings};

/// Cached value types.
#[derive(Debug, Clone)]
pub(crate) enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    Category(Box<Category>),
    Categories(Vec<Category>),
    Attributes(Vec<Attribute>),
    Settings(Box<Settings>),
}

/// Key prefixes, one group per resource. Mutations invalidate a group.
pub(crate) mod prefix {
    pub const PRODUCTS: &[&str] = &["products:", "product:"];
    pub const CATEGORIES: &[&str] = &["categories:", "category:"];
    pub const ATTRIBUTES: &[&str] = &["attributes:"];
    pub const SETTINGS: &[&str] = &["settings:"];
}

pub(crate) fn products_key(locale: Locale, pairs: &[(&'static str, String)]) -> String {
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("products:{locale}?{query}")
}

pub(crate) fn product_key(locale: Locale, slug: &str) -> String {
    format!("product:{locale}/{slug}")
}

pub(crate) fn categories_key(locale: Locale) -> String {
    format!("categories:{locale}")
}

pub(crate) fn category_key(locale: Locale, slug: &str) -> String {
    format!("category:{locale}/{slug}")
}

pub(crate) fn attributes_key(locale: Locale) -> String {
    format!("attributes:{locale}")
}

pub(crate) fn settings_key(locale: Locale) -> String {
    format!("settings:{locale}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_locale_scoped() {
        assert_eq!(product_key(Locale::Vi, "ao-thun"), "product:vi/ao-thun");
        assert_ne!(categories_key(Locale::Vi), categories_key(Locale::En));
    }

    #[test]
    fn test_products_key_encodes_values() {
        let key = products_key(
            Locale::En,
            &[("page", "1".to_string()), ("category", "áo khoác".to_string())],
        );
        assert_eq!(key, "products:en?page=1&category=%C3%A1o%20kho%C3%A1c");
    }

    #[test]
    fn test_prefix_groups_match_keys() {
        let key = product_key(Locale::Vi, "x");
        assert!(prefix::PRODUCTS.iter().any(|p| key.starts_with(p)));
        assert!(!prefix::CATEGORIES.iter().any(|p| key.starts_with(p)));
    }
}
