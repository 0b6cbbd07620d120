//! Category management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use sapa_api::ApiError;
use sapa_api::types::{Category, CategoryInput};
use sapa_core::CategoryId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::forms;
use crate::middleware::RequireAdminAuth;
use crate::models::{FlashKind, push_flash};
use crate::page::{AdminPage, flash_result, non_empty};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub parent_id: String,
}

impl CategoryForm {
    #[must_use]
    pub fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone().unwrap_or_default(),
            image: category.image.clone().unwrap_or_default(),
            parent_id: category
                .parent_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }

    /// Validate and build the API body. `own_id` is set when editing.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first bad field.
    pub fn to_input(&self, own_id: Option<&str>) -> std::result::Result<CategoryInput, String> {
        let name = forms::required("Name", &self.name)?;
        let parent_id = non_empty(Some(&self.parent_id));
        if parent_id.is_some() && parent_id.as_deref() == own_id {
            return Err("A category cannot be its own parent.".to_string());
        }
        Ok(CategoryInput {
            name: name.to_string(),
            slug: non_empty(Some(&self.slug)),
            description: non_empty(Some(&self.description)),
            image: non_empty(Some(&self.image)),
            parent_id: parent_id.map(CategoryId::new),
        })
    }
}

/// A category row, children indented under their parent.
#[derive(Debug, Clone)]
pub struct CategoryRowView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub depth: usize,
    pub product_count: u32,
    pub edit_href: String,
}

/// Order categories parent-first, depth-first.
///
/// Categories whose parent is missing are treated as roots.
#[must_use]
pub fn tree_rows(categories: &[Category]) -> Vec<CategoryRowView> {
    fn visit(
        categories: &[Category],
        parent: Option<&CategoryId>,
        depth: usize,
        out: &mut Vec<CategoryRowView>,
    ) {
        for category in categories.iter().filter(|c| {
            let effective_parent = c
                .parent_id
                .as_ref()
                .filter(|p| categories.iter().any(|other| &other.id == *p));
            effective_parent == parent
        }) {
            // Guard against cycles in API data.
            if out.iter().any(|row| row.id == category.id.as_str()) {
                continue;
            }
            out.push(CategoryRowView {
                id: category.id.to_string(),
                name: category.name.clone(),
                slug: category.slug.clone(),
                depth,
                product_count: category.product_count.unwrap_or(0),
                edit_href: format!("/categories/{}/edit", category.id),
            });
            visit(categories, Some(&category.id), depth + 1, out);
        }
    }

    let mut out = Vec::with_capacity(categories.len());
    visit(categories, None, 0, &mut out);
    out
}

#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub page: AdminPage,
    pub categories: Vec<CategoryRowView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "categories/form.html")]
pub struct CategoryFormTemplate {
    pub page: AdminPage,
    pub title: String,
    pub action: String,
    pub form: CategoryForm,
    /// Possible parents, excluding the category being edited.
    pub parents: Vec<Category>,
    pub error: Option<String>,
    pub delete_action: Option<String>,
}

/// Category tree.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { .. }: RequireAdminAuth,
    page: AdminPage,
) -> Result<CategoriesIndexTemplate> {
    let categories = state.api().list_categories().await?;
    Ok(CategoriesIndexTemplate {
        page,
        categories: tree_rows(&categories),
    })
}

async fn form_page(
    state: &AppState,
    page: AdminPage,
    form: CategoryForm,
    category_id: Option<&str>,
    error: Option<String>,
) -> Response {
    let parents = state
        .api()
        .list_categories()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load parent categories");
            Vec::new()
        })
        .into_iter()
        .filter(|c| Some(c.id.as_str()) != category_id)
        .collect();
    let (title, action, delete_action) = match category_id {
        Some(id) => (
            format!("Edit {}", form.name),
            format!("/categories/{id}"),
            Some(format!("/categories/{id}/delete")),
        ),
        None => ("New category".to_string(), "/categories".to_string(), None),
    };
    CategoryFormTemplate {
        page,
        title,
        action,
        form,
        parents,
        error,
        delete_action,
    }
    .into_response()
}

#[instrument(skip(state, page))]
pub async fn new(
    State(state): State<AppState>,
    RequireAdminAuth { .. }: RequireAdminAuth,
    page: AdminPage,
) -> Response {
    form_page(&state, page, CategoryForm::default(), None, None).await
}

#[instrument(skip(state, auth, session, page, form), fields(name = %form.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    page: AdminPage,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let input = match form.to_input(None) {
        Ok(input) => input,
        Err(message) => return Ok(form_page(&state, page, form, None, Some(message)).await),
    };
    match state.api().create_category(&input, &auth).await {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category created");
            push_flash(&session, FlashKind::Success, format!("Created {}.", category.name)).await?;
            Ok(Redirect::to("/categories").into_response())
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => Ok(form_page(&state, page, form, None, Some(e.user_message())).await),
    }
}

/// Edit form. Categories are looked up in the cached list since the API
/// only fetches single categories by slug.
#[instrument(skip(state, page))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdminAuth { .. }: RequireAdminAuth,
    page: AdminPage,
    Path(id): Path<String>,
) -> Result<Response> {
    let category = state
        .api()
        .list_categories()
        .await?
        .into_iter()
        .find(|c| c.id.as_str() == id)
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;
    Ok(form_page(&state, page, CategoryForm::from_category(&category), Some(&id), None).await)
}

#[instrument(skip(state, auth, session, page, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    page: AdminPage,
    Path(id): Path<String>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let input = match form.to_input(Some(&id)) {
        Ok(input) => input,
        Err(message) => return Ok(form_page(&state, page, form, Some(&id), Some(message)).await),
    };
    match state
        .api()
        .update_category(&CategoryId::new(id.as_str()), &input, &auth)
        .await
    {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category updated");
            push_flash(&session, FlashKind::Success, format!("Saved {}.", category.name)).await?;
            Ok(Redirect::to("/categories").into_response())
        }
        Err(ApiError::Unauthorized) => Err(AppError::Api(ApiError::Unauthorized)),
        Err(e) => Ok(form_page(&state, page, form, Some(&id), Some(e.user_message())).await),
    }
}

/// Delete a category. The API refuses while products use it.
#[instrument(skip(state, auth, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let result = state
        .api()
        .delete_category(&CategoryId::new(id.as_str()), &auth)
        .await;
    if flash_result(&session, result, "Category deleted.").await?.is_some() {
        tracing::info!(category_id = %id, "Category deleted");
        return Ok(Redirect::to("/categories"));
    }
    Ok(Redirect::to(&format!("/categories/{id}/edit")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn category(id: &str, parent: Option<&str>) -> Category {
        Category {
            id: CategoryId::new(id),
            slug: id.to_string(),
            name: id.to_uppercase(),
            description: None,
            image: None,
            parent_id: parent.map(CategoryId::new),
            product_count: Some(2),
        }
    }

    #[test]
    fn test_tree_rows_nest_children() {
        let categories = vec![
            category("ao-thun", Some("thoi-trang")),
            category("thoi-trang", None),
            category("giay", None),
            category("mo-coi", Some("da-xoa")),
        ];
        let rows = tree_rows(&categories);
        let order: Vec<(&str, usize)> = rows.iter().map(|r| (r.id.as_str(), r.depth)).collect();
        assert_eq!(
            order,
            vec![("thoi-trang", 0), ("ao-thun", 1), ("giay", 0), ("mo-coi", 0)]
        );
    }

    #[test]
    fn test_tree_rows_survive_cycles() {
        let categories = vec![category("a", Some("b")), category("b", Some("a"))];
        assert!(tree_rows(&categories).is_empty());
    }

    #[test]
    fn test_form_rejects_self_parent() {
        let form = CategoryForm {
            name: "Giày".to_string(),
            parent_id: "c1".to_string(),
            ..CategoryForm::default()
        };
        assert!(form.to_input(Some("c1")).is_err());
        let input = form.to_input(Some("c2")).unwrap();
        assert_eq!(input.parent_id, Some(CategoryId::new("c1")));
        assert_eq!(input.slug, None);
    }
}
