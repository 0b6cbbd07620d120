//! Products, categories and attributes, with response caching.

use sapa_core::{AttributeId, CategoryId, Page, ProductId};
use serde::de::IgnoredAny;
use tracing::{debug, instrument};

use crate::auth::AuthSession;
use crate::cache::{self, CacheValue};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{
    Attribute, AttributeInput, Category, CategoryInput, Product, ProductInput, ProductQuery,
};

impl ApiClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// List products. Non-search queries are cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(locale = %self.locale()))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ApiError> {
        let pairs = query.to_pairs();
        let cache_key = cache::products_key(self.locale(), &pairs);

        if query.is_cacheable()
            && let Some(CacheValue::Products(page)) = self.cache_get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let page: Page<Product> = self.get("/products", &pairs, None).await?;

        if query.is_cacheable() {
            self.cache_put(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no product has this slug.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, ApiError> {
        let cache_key = cache::product_key(self.locale(), slug);

        if let Some(CacheValue::Product(product)) = self.cache_get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{}", urlencoding::encode(slug));
        let product: Product = self.get(&path, &[], None).await?;

        self.cache_put(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a product by id, bypassing the cache (admin edit forms).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self, auth), fields(product_id = %id))]
    pub async fn get_product_by_id(
        &self,
        id: &ProductId,
        auth: &AuthSession,
    ) -> Result<Product, ApiError> {
        self.get(&format!("/products/id/{id}"), &[], Some(auth)).await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` or `ApiError::Conflict` on bad input.
    #[instrument(skip(self, input, auth), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: &ProductInput,
        auth: &AuthSession,
    ) -> Result<Product, ApiError> {
        let product = self.post("/products", input, Some(auth)).await?;
        self.invalidate_products().await;
        Ok(product)
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` or `ApiError::Validation`.
    #[instrument(skip(self, input, auth), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        input: &ProductInput,
        auth: &AuthSession,
    ) -> Result<Product, ApiError> {
        let product = self
            .patch(&format!("/products/{id}"), input, Some(auth))
            .await?;
        self.invalidate_products().await;
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` or `ApiError::Conflict` if it has orders.
    #[instrument(skip(self, auth), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId, auth: &AuthSession) -> Result<(), ApiError> {
        let _: IgnoredAny = self.delete(&format!("/products/{id}"), Some(auth)).await?;
        self.invalidate_products().await;
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// List all categories (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let cache_key = cache::categories_key(self.locale());

        if let Some(CacheValue::Categories(categories)) = self.cache_get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self.get("/categories", &[], None).await?;
        self.cache_put(cache_key, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    /// Get a category by slug (cached).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no category has this slug.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_category(&self, slug: &str) -> Result<Category, ApiError> {
        let cache_key = cache::category_key(self.locale(), slug);

        if let Some(CacheValue::Category(category)) = self.cache_get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(*category);
        }

        let path = format!("/categories/{}", urlencoding::encode(slug));
        let category: Category = self.get(&path, &[], None).await?;
        self.cache_put(cache_key, CacheValue::Category(Box::new(category.clone())))
            .await;
        Ok(category)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` or `ApiError::Conflict` on bad input.
    #[instrument(skip(self, input, auth), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: &CategoryInput,
        auth: &AuthSession,
    ) -> Result<Category, ApiError> {
        let category = self.post("/categories", input, Some(auth)).await?;
        self.invalidate_categories().await;
        Ok(category)
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` or `ApiError::Validation`.
    #[instrument(skip(self, input, auth), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: &CategoryId,
        input: &CategoryInput,
        auth: &AuthSession,
    ) -> Result<Category, ApiError> {
        let category = self
            .patch(&format!("/categories/{id}"), input, Some(auth))
            .await?;
        self.invalidate_categories().await;
        // Products embed their category name.
        self.invalidate_products().await;
        Ok(category)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if products still use it.
    #[instrument(skip(self, auth), fields(category_id = %id))]
    pub async fn delete_category(
        &self,
        id: &CategoryId,
        auth: &AuthSession,
    ) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .delete(&format!("/categories/{id}"), Some(auth))
            .await?;
        self.invalidate_categories().await;
        self.invalidate_products().await;
        Ok(())
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// List attribute definitions (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_attributes(&self) -> Result<Vec<Attribute>, ApiError> {
        let cache_key = cache::attributes_key(self.locale());

        if let Some(CacheValue::Attributes(attributes)) = self.cache_get(&cache_key).await {
            debug!("Cache hit for attributes");
            return Ok(attributes);
        }

        let attributes: Vec<Attribute> = self.get("/attributes", &[], None).await?;
        self.cache_put(cache_key, CacheValue::Attributes(attributes.clone()))
            .await;
        Ok(attributes)
    }

    /// Create an attribute.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the name is taken.
    #[instrument(skip(self, input, auth), fields(name = %input.name))]
    pub async fn create_attribute(
        &self,
        input: &AttributeInput,
        auth: &AuthSession,
    ) -> Result<Attribute, ApiError> {
        let attribute = self.post("/attributes", input, Some(auth)).await?;
        self.invalidate_attributes().await;
        Ok(attribute)
    }

    /// Update an attribute.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` or `ApiError::Validation`.
    #[instrument(skip(self, input, auth), fields(attribute_id = %id))]
    pub async fn update_attribute(
        &self,
        id: &AttributeId,
        input: &AttributeInput,
        auth: &AuthSession,
    ) -> Result<Attribute, ApiError> {
        let attribute = self
            .patch(&format!("/attributes/{id}"), input, Some(auth))
            .await?;
        self.invalidate_attributes().await;
        Ok(attribute)
    }

    /// Delete an attribute.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if products still use it.
    #[instrument(skip(self, auth), fields(attribute_id = %id))]
    pub async fn delete_attribute(
        &self,
        id: &AttributeId,
        auth: &AuthSession,
    ) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .delete(&format!("/attributes/{id}"), Some(auth))
            .await?;
        self.invalidate_attributes().await;
        Ok(())
    }
}
