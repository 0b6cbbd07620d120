//! Filter bar for the console's list pages.
//!
//! Each listing builds a [`DataTableConfig`] from its current query so the
//! shared `partials/filters.html` can render the controls with the active
//! values filled in.

use sapa_api::types::Category;
use sapa_core::{OrderStatus, UserRole};

use crate::views::status_text;

/// Filter control kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Free-text input.
    Text,
    /// Single-select dropdown with an "All" entry.
    Select,
}

/// Option for select filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl FilterOption {
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            selected: false,
        }
    }
}

/// One filter control.
#[derive(Debug, Clone)]
pub struct TableFilter {
    /// Query parameter name.
    pub key: String,
    pub label: String,
    pub filter_type: FilterType,
    pub placeholder: Option<String>,
    pub options: Vec<FilterOption>,
    /// Current value; empty when unset.
    pub value: String,
}

impl TableFilter {
    /// Create a text filter.
    #[must_use]
    pub fn text(key: &str, label: &str, placeholder: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            filter_type: FilterType::Text,
            placeholder: Some(placeholder.to_string()),
            options: vec![],
            value: String::new(),
        }
    }

    /// Create a select filter.
    #[must_use]
    pub fn select(key: &str, label: &str, options: Vec<FilterOption>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            filter_type: FilterType::Select,
            placeholder: None,
            options,
            value: String::new(),
        }
    }

    /// Fill in the active value, marking the matching option selected.
    #[must_use]
    pub fn with_value(mut self, value: Option<&str>) -> Self {
        let value = value.map(str::trim).unwrap_or_default();
        for option in &mut self.options {
            option.selected = !value.is_empty() && option.value == value;
        }
        self.value = value.to_string();
        self
    }

    #[must_use]
    pub fn is_select(&self) -> bool {
        self.filter_type == FilterType::Select
    }
}

/// Configuration for a filtered listing.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    /// Form action; filters submit as a GET to this path.
    pub action: String,
    pub filters: Vec<TableFilter>,
    /// Text shown when nothing matches.
    pub empty_title: String,
}

impl DataTableConfig {
    #[must_use]
    pub fn new(action: &str) -> Self {
        Self {
            action: action.to_string(),
            filters: vec![],
            empty_title: "No items found".to_string(),
        }
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: TableFilter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn empty_state(mut self, title: &str) -> Self {
        self.empty_title = title.to_string();
        self
    }

    /// `true` when any filter has a value, to offer a reset link.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.filters.iter().any(|f| !f.value.is_empty())
    }
}

/// Orders listing: status and free-text search.
#[must_use]
pub fn orders_table_config(status: Option<OrderStatus>, search: Option<&str>) -> DataTableConfig {
    let options = OrderStatus::ALL
        .iter()
        .map(|s| FilterOption::new(s.as_str(), status_text(*s)))
        .collect();
    DataTableConfig::new("/orders")
        .filter(
            TableFilter::select("status", "Status", options)
                .with_value(status.map(OrderStatus::as_str)),
        )
        .filter(
            TableFilter::text("search", "Search", "Order number, customer name or email")
                .with_value(search),
        )
        .empty_state("No orders found")
}

/// Users listing: role and free-text search.
#[must_use]
pub fn users_table_config(role: Option<UserRole>, search: Option<&str>) -> DataTableConfig {
    let role_value = role.map(|r| r.to_string());
    DataTableConfig::new("/users")
        .filter(
            TableFilter::select(
                "role",
                "Role",
                vec![
                    FilterOption::new("CUSTOMER", "Customer"),
                    FilterOption::new("ADMIN", "Admin"),
                ],
            )
            .with_value(role_value.as_deref()),
        )
        .filter(TableFilter::text("search", "Search", "Name or email").with_value(search))
        .empty_state("No users found")
}

/// Products listing: category and free-text search.
#[must_use]
pub fn products_table_config(
    categories: &[Category],
    category: Option<&str>,
    search: Option<&str>,
) -> DataTableConfig {
    let options = categories
        .iter()
        .map(|c| FilterOption::new(&c.slug, &c.name))
        .collect();
    DataTableConfig::new("/products")
        .filter(TableFilter::select("category", "Category", options).with_value(category))
        .filter(TableFilter::text("search", "Search", "Product name").with_value(search))
        .empty_state("No products found")
}

/// Reviews listing: visibility.
#[must_use]
pub fn reviews_table_config(visible: Option<bool>) -> DataTableConfig {
    let value = visible.map(|v| if v { "true" } else { "false" });
    DataTableConfig::new("/reviews")
        .filter(
            TableFilter::select(
                "visible",
                "Visibility",
                vec![
                    FilterOption::new("true", "Visible"),
                    FilterOption::new("false", "Hidden"),
                ],
            )
            .with_value(value),
        )
        .empty_state("No reviews found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_config_marks_active_status() {
        let config = orders_table_config(Some(OrderStatus::Shipped), None);
        let status = &config.filters[0];
        assert!(status.is_select());
        let selected: Vec<_> = status.options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "SHIPPED");
        assert!(config.is_filtered());
    }

    #[test]
    fn test_unfiltered_config() {
        let config = users_table_config(None, Some("   "));
        assert!(!config.is_filtered());
        assert!(config.filters[0].options.iter().all(|o| !o.selected));
    }

    #[test]
    fn test_review_visibility_value() {
        let config = reviews_table_config(Some(false));
        assert_eq!(config.filters[0].value, "false");
    }
}
