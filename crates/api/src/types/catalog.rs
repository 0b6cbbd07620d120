//! Products, categories and attributes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sapa_core::{AttributeId, CategoryId, CurrencyCode, Money, PageRequest, ProductId, VariantId};
use serde::{Deserialize, Serialize};

/// Product or category image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Lightweight category reference embedded in products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
}

/// One selected option of a variant, e.g. `Size = M`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOption {
    pub name: String,
    pub value: String,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: VariantId,
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub options: Vec<VariantOption>,
}

impl ProductVariant {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// An attribute with the values a product offers, e.g. `Color: red, blue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub name: String,
    pub values: Vec<String>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    #[serde(default)]
    pub attributes: Vec<ProductAttribute>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

impl Product {
    #[must_use]
    pub const fn price_money(&self) -> Money {
        Money::new(self.price, self.currency)
    }

    #[must_use]
    pub fn compare_at_money(&self) -> Option<Money> {
        self.compare_at_price
            .filter(|p| *p > self.price)
            .map(|p| Money::new(p, self.currency))
    }

    #[must_use]
    pub fn featured_image(&self) -> Option<&Image> {
        self.images.first()
    }

    /// In stock if the product or any variant has stock.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock > 0 || self.variants.iter().any(ProductVariant::in_stock)
    }

    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == id)
    }
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Popular,
    Rating,
}

impl ProductSort {
    pub const ALL: [Self; 5] = [
        Self::Newest,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::Popular,
        Self::Rating,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Popular => "popular",
            Self::Rating => "rating",
        }
    }

    /// Parse a query-string value, ignoring unknown input.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// Filters for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: PageRequest,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<ProductSort>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Include inactive products (admin only).
    pub include_inactive: bool,
}

impl ProductQuery {
    /// Query-string pairs in a stable order, also used as the cache key.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.page.to_string()),
            ("limit", self.page.limit.to_string()),
        ];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("category", category.to_string()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_str().to_string()));
        }
        if let Some(min) = self.min_price {
            pairs.push(("minPrice", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("maxPrice", max.to_string()));
        }
        if self.include_inactive {
            pairs.push(("includeInactive", "true".to_string()));
        }
        pairs
    }

    /// Search results are not cached.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.search
            .as_deref()
            .is_none_or(|s| s.trim().is_empty())
            && !self.include_inactive
    }
}

/// Body for creating or updating a product.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i64,
    pub category_id: Option<CategoryId>,
    pub images: Vec<String>,
    pub attributes: Vec<ProductAttribute>,
    pub is_active: bool,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub product_count: Option<u32>,
}

/// Body for creating or updating a category.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<CategoryId>,
}

/// A product attribute definition, e.g. `Size` with `S, M, L`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Body for creating or updating an attribute.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttributeInput {
    pub name: String,
    pub values: Vec<String>,
}

impl AttributeInput {
    /// Build from a comma-separated value list, dropping blanks and duplicates.
    #[must_use]
    pub fn from_csv(name: &str, values: &str) -> Self {
        let mut out: Vec<String> = Vec::new();
        for value in values.split(',').map(str::trim).filter(|v| !v.is_empty()) {
            if !out.iter().any(|v| v.eq_ignore_ascii_case(value)) {
                out.push(value.to_string());
            }
        }
        Self {
            name: name.trim().to_string(),
            values: out,
        }
    }
}
