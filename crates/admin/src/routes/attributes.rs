//! Attribute definitions (size, color, ...) used by product forms.
//!
//! The list page doubles as the create form; each row edits inline.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use sapa_api::types::{Attribute, AttributeInput};
use sapa_core::AttributeId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::{FlashKind, push_flash};
use crate::page::{AdminPage, flash_result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AttributeForm {
    #[serde(default)]
    pub name: String,
    /// Comma-separated values.
    #[serde(default)]
    pub values: String,
}

impl AttributeForm {
    /// # Errors
    ///
    /// Returns a message when the name or values are missing.
    pub fn to_input(&self) -> std::result::Result<AttributeInput, String> {
        let input = AttributeInput::from_csv(&self.name, &self.values);
        if input.name.is_empty() {
            return Err("Attribute name is required.".to_string());
        }
        if input.values.is_empty() {
            return Err("Give at least one value, separated by commas.".to_string());
        }
        Ok(input)
    }
}

#[derive(Debug, Clone)]
pub struct AttributeRowView {
    pub id: String,
    pub name: String,
    pub values: String,
    pub value_count: usize,
}

impl From<&Attribute> for AttributeRowView {
    fn from(attribute: &Attribute) -> Self {
        Self {
            id: attribute.id.to_string(),
            name: attribute.name.clone(),
            values: attribute.values.join(", "),
            value_count: attribute.values.len(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "attributes/index.html")]
pub struct AttributesTemplate {
    pub page: AdminPage,
    pub attributes: Vec<AttributeRowView>,
}

#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth { .. }: RequireAdminAuth,
    page: AdminPage,
) -> Result<AttributesTemplate> {
    let attributes = state.api().list_attributes().await?;
    Ok(AttributesTemplate {
        page,
        attributes: attributes.iter().map(AttributeRowView::from).collect(),
    })
}

#[instrument(skip(state, auth, session, form), fields(name = %form.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Form(form): Form<AttributeForm>,
) -> Result<Redirect> {
    match form.to_input() {
        Ok(input) => {
            let result = state.api().create_attribute(&input, &auth).await;
            if let Some(attribute) = flash_result(&session, result, "Attribute created.").await? {
                tracing::info!(attribute_id = %attribute.id, "Attribute created");
            }
        }
        Err(message) => push_flash(&session, FlashKind::Error, message).await?,
    }
    Ok(Redirect::to("/attributes"))
}

#[instrument(skip(state, auth, session, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<AttributeForm>,
) -> Result<Redirect> {
    match form.to_input() {
        Ok(input) => {
            let result = state
                .api()
                .update_attribute(&AttributeId::new(id.as_str()), &input, &auth)
                .await;
            flash_result(&session, result, "Attribute saved.").await?;
        }
        Err(message) => push_flash(&session, FlashKind::Error, message).await?,
    }
    Ok(Redirect::to("/attributes"))
}

#[instrument(skip(state, auth, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth { auth, .. }: RequireAdminAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let result = state
        .api()
        .delete_attribute(&AttributeId::new(id.as_str()), &auth)
        .await;
    flash_result(&session, result, "Attribute deleted.").await?;
    Ok(Redirect::to("/attributes"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_requires_values() {
        let form = AttributeForm {
            name: "Size".to_string(),
            values: " , ".to_string(),
        };
        assert!(form.to_input().is_err());

        let form = AttributeForm {
            name: " Size ".to_string(),
            values: "S, M, m, L".to_string(),
        };
        let input = form.to_input().unwrap();
        assert_eq!(input.name, "Size");
        assert_eq!(input.values, vec!["S", "M", "L"]);
    }

    #[test]
    fn test_row_view_joins_values() {
        let row = AttributeRowView::from(&Attribute {
            id: AttributeId::new("a1"),
            name: "Màu".to_string(),
            values: vec!["Đỏ".to_string(), "Xanh".to_string()],
        });
        assert_eq!(row.values, "Đỏ, Xanh");
        assert_eq!(row.value_count, 2);
    }
}
