//! Custom Askama template filters.
//!
//! Values that need the request locale (money, dates, status labels) are
//! formatted into the view structs instead, so these stay argument-free.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Build-time fingerprint of `main.css`.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

/// Build-time fingerprint of `cart.js`.
#[askama::filter_fn]
pub fn js_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("JS_HASH"))
}

/// Filled and empty stars for a 1-5 rating.
///
/// Usage in templates: `{{ review.rating|stars }}`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[askama::filter_fn]
pub fn stars(rating: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let filled = rating
        .to_string()
        .parse::<f64>()
        .map_or(0, |r| r.round().clamp(0.0, 5.0) as usize);
    Ok(format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled)))
}
