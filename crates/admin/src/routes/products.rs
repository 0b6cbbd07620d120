//! Product management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::ApiError;
use sapa_api::types::{Category, Product, ProductAttribute, ProductInput, ProductQuery};
use sapa_core::{CategoryId, Locale, PageRequest, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::components::DataTableConfig;
use crate::components::data_table::products_table_config;
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms;
use crate::middleware::RequireAdminAuth;
use crate::models::{FlashKind, push_flash};
use crate::page::{AdminPage, Pagination, flash_result, non_empty, with_query};
use crate::state::AppState;

const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub page: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

/// Product create/edit form.
///
/// Images are one URL per line; attributes are `Name: value, value` lines.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub compare_at_price: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub images: String,
    #[serde(default)]
    pub attributes: String,
    pub is_active: Option<String>,
}

impl ProductForm {
    /// Prefill from an existing product.
    #[must_use]
    pub fn from_product(product: &Product, locale: Locale) -> Self {
        Self {
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: forms::amount_value(product.price, locale),
            compare_at_price: product
                .compare_at_price
                .map(|p| forms::amount_value(p, locale))
                .unwrap_or_default(),
            stock: product.stock.to_string(),
            category_id: product
                .category
                .as_ref()
                .map(|c| c.id.to_string())
                .unwrap_or_default(),
            images: product
                .images
                .iter()
                .map(|i| i.url.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            attributes: product
                .attributes
                .iter()
                .map(|a| format!("{}: {}", a.name, a.values.join(", ")))
                .collect::<Vec<_>>()
                .join("\n"),
            is_active: product.is_active.then(|| "on".to_string()),
        }
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        forms::checked(self.is_active.as_ref())
    }

    /// Validate and build the API body.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn to_input(&self, locale: Locale) -> std::result::Result<ProductInput, String> {
        let name = forms::required("Name", &self.name)?;
        let price = forms::amount("Price", &self.price, locale)?;
        let compare_at_price = forms::optional_amount("Compare-at price", &self.compare_at_price, locale)?;
        if compare_at_price.is_some_and(|c| c <= price) {
            return Err("Compare-at price must be higher than the price.".to_string());
        }
        let stock = forms::optional_number::<i64>("Stock", &self.stock)?.unwrap_or(0);
        if stock < 0 {
            return Err("Stock cannot be negative.".to_string());
        }
        let images = forms::lines(&self.images);
        if let Some(bad) = images
            .iter()
            .find(|url| !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')))
        {
            return Err(format!("Image is not a URL: {bad}"));
        }

        Ok(ProductInput {
            name: name.to_string(),
            slug: non_empty(Some(&self.slug)),
            description: non_empty(Some(&self.description)),
            price,
            compare_at_price,
            stock,
            category_id: non_empty(Some(&self.category_id)).map(CategoryId::new),
            images,
            attributes: parse_attributes(&self.attributes)?,
            is_active: self.active(),
        })
    }
}

/// Parse `Name: a, b` lines.
fn parse_attributes(text: &str) -> std::result::Result<Vec<ProductAttribute>, String> {
    forms::lines(text)
        .iter()
        .map(|line| {
            let (name, values) = line
                .split_once(':')
                .ok_or_else(|| format!("Attribute line needs a colon: {line}"))?;
            let input = sapa_api::types::AttributeInput::from_csv(name, values);
            if input.name.is_empty() || input.values.is_empty() {
                return Err(format!("Attribute line needs a name and values: {line}"));
            }
            Ok(ProductAttribute {
                name: input.name,
                values: input.values,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub price: String,
    pub compare_at: Option<String>,
    pub stock: i64,
    pub in_stock: bool,
    pub category: Option<String>,
    pub is_active: bool,
    pub edit_href: String,
    pub store_href: String,
}

impl ProductRowView {
    #[must_use]
    pub fn new(product: &Product, locale: Locale, storefront_url: &str) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            image: product.featured_image().map(|i| i.url.clone()),
            price: product.price_money().format(locale),
            compare_at: product.compare_at_money().map(|m| m.format(locale)),
            stock: product.stock,
            in_stock: product.in_stock(),
            category: product.category.as_ref().map(|c| c.name.clone()),
            is_active: product.is_active,
            edit_href: format!("/products/{}/edit", product.id),
            store_href: format!("{storefront_url}/{}/products/{}", locale.code(), product.slug),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: AdminPage,
    pub table: DataTableConfig,
    pub products: Vec<ProductRowView>,
    pub pagination: Option<Pagination>,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: AdminPage,
    pub title: String,
    pub action: String,
    pub form: ProductForm,
    pub categories: Vec<Category>,
    pub error: Option<String>,
    /// Set on edit; shows the delete button.
    pub delete_action: Option<String>,
}

/// All products including inactive ones.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { .. }: RequireAdminAuth,
    page: AdminPage,
    Query(query): Query<ProductsQuery>,
) -> Result<Response> {
    let search = non_empty(query.search.as_deref());
    let category = non_empty(query.category.as_deref());
    let api = state.api();
    let products = api
        .list_products(&ProductQuery {
            page: PageRequest::new(query.page, Some(PAGE_SIZE)),
            search: search.clone(),
            category: category.clone(),
            include_inactive: true,
            ..ProductQuery::default()
        })
        .await?;
    let categories = api.list_categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories for filter");
        Vec::new()
    });

    let base = with_query(
        "/products",
        &[("category", category.as_deref()), ("search", search.as_deref())],
    );
    let locale = state.locale();
    let storefront_url = &state.config().storefront_url;

    Ok(ProductsIndexTemplate {
        page,
        table: products_table_config(&categories, category.as_deref(), search.as_deref()),
        products: products
            .items
            .iter()
            .map(|p| ProductRowView::new(p, locale, storefront_url))
            .collect(),
        pagination: Pagination::new(&products, &base),
    }
    .into_response())
}

async fn form_page(
    state: &AppState,
    page: AdminPage,
    form: ProductForm,
    product_id: Option<&str>,
    error: Option<String>,
) -> Response {
    let categories = state.api().list_categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories for product form");
        Vec::new()
    });
    let (title, action, delete_action) = match product_id {
        Some(id) => (
            format!("Edit {}", form.name),
            format!("/products/{id}"),
            Some(format!("/products/{id}/delete")),
        ),
        None => ("New product".to_string(), "/products".to_string(), None),
    };
    ProductFormTemplate {
        page,
        title,
        action,
        form,
        categories,
        error,
        delete_action,
    }
    .into_response()
}

/// Empty product form.
#[instrument(skip(state, page))]
pub async fn new(
    State(state): State<AppState>,
    RequireAdminAuth { .. }: RequireAdminAuth,
    page: AdminPage,
) -> Response {
    let form = ProductForm {
        is_active: Some("on".to_string()),
        ..ProductForm::default()
    };
    form_page(&state, page, form, None, None).await
}

/// Create a product.
#[instrument(skip(state, auth, session, page, form), fields(name = %form.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    page: AdminPage,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.to_input(state.locale()) {
        Ok(input) => input,
        Err(message) => return Ok(form_page(&state, page, form, None, Some(message)).await),
    };
    match state.api().create_product(&input, &auth).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product created");
            push_flash(&session, FlashKind::Success, format!("Created {}.", product.name)).await?;
            Ok(Redirect::to(&format!("/products/{}/edit", product.id)).into_response())
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => Ok(form_page(&state, page, form, None, Some(e.user_message())).await),
    }
}

/// Edit form for one product.
#[instrument(skip(state, auth, page))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    page: AdminPage,
    Path(id): Path<String>,
) -> Result<Response> {
    let product = state
        .api()
        .get_product_by_id(&ProductId::new(id.as_str()), &auth)
        .await?;
    Ok(form_page(&state, page, ProductForm::from_product(&product, state.locale()), Some(&id), None).await)
}

/// Save changes to a product.
#[instrument(skip(state, auth, session, page, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    page: AdminPage,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.to_input(state.locale()) {
        Ok(input) => input,
        Err(message) => return Ok(form_page(&state, page, form, Some(&id), Some(message)).await),
    };
    match state
        .api()
        .update_product(&ProductId::new(id.as_str()), &input, &auth)
        .await
    {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product updated");
            push_flash(&session, FlashKind::Success, format!("Saved {}.", product.name)).await?;
            Ok(Redirect::to(&format!("/products/{id}/edit")).into_response())
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => Ok(form_page(&state, page, form, Some(&id), Some(e.user_message())).await),
    }
}

/// Delete a product.
#[instrument(skip(state, auth, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let result = state
        .api()
        .delete_product(&ProductId::new(id.as_str()), &auth)
        .await;
    if flash_result(&session, result, "Product deleted.").await?.is_some() {
        tracing::info!(product_id = %id, "Product deleted");
        return Ok(Redirect::to("/products"));
    }
    Ok(Redirect::to(&format!("/products/{id}/edit")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn form() -> ProductForm {
        ProductForm {
            name: " Áo thun ".to_string(),
            price: "150.000".to_string(),
            stock: "12".to_string(),
            category_id: "c1".to_string(),
            images: "https://cdn.sapa.vn/ao.jpg\n".to_string(),
            attributes: "Màu: Đỏ, Xanh, Xanh\nSize: M".to_string(),
            is_active: Some("on".to_string()),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_form_builds_input() {
        let input = form().to_input(Locale::Vi).unwrap();
        assert_eq!(input.name, "Áo thun");
        assert_eq!(input.price, Decimal::new(150_000, 0));
        assert_eq!(input.stock, 12);
        assert_eq!(input.slug, None);
        assert_eq!(input.category_id, Some(CategoryId::new("c1")));
        assert_eq!(input.attributes.len(), 2);
        assert_eq!(input.attributes[0].values, vec!["Đỏ", "Xanh"]);
        assert!(input.is_active);
    }

    #[test]
    fn test_form_rejects_bad_values() {
        let mut f = form();
        f.compare_at_price = "100000".to_string();
        assert!(f.to_input(Locale::Vi).unwrap_err().contains("Compare-at"));

        let mut f = form();
        f.images = "not a url".to_string();
        assert!(f.to_input(Locale::Vi).unwrap_err().starts_with("Image"));

        let mut f = form();
        f.attributes = "Màu Đỏ".to_string();
        assert!(f.to_input(Locale::Vi).unwrap_err().contains("colon"));

        let mut f = form();
        f.stock = "-3".to_string();
        assert!(f.to_input(Locale::Vi).is_err());
    }

    #[test]
    fn test_price_uses_console_locale() {
        let mut f = form();
        f.price = "19.99".to_string();
        assert!(f.to_input(Locale::Vi).is_err());
        assert_eq!(f.to_input(Locale::En).unwrap().price, Decimal::new(1999, 2));

        f.price = "150.000".to_string();
        f.compare_at_price = "1,5".to_string();
        assert!(f.to_input(Locale::En).is_err());
    }

    #[test]
    fn test_unchecked_box_deactivates() {
        let mut f = form();
        f.is_active = None;
        assert!(!f.to_input(Locale::Vi).unwrap().is_active);
    }
}
