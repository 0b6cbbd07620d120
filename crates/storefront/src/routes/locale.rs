//! Language switcher.

use axum::{
    Form,
    http::{HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use sapa_core::Locale;
use serde::Deserialize;
use tracing::instrument;

use crate::i18n::localized_path;
use crate::middleware::RequestLocale;
use crate::middleware::locale::locale_cookie;
use crate::page::safe_next;

#[derive(Debug, Deserialize)]
pub struct LocaleForm {
    pub locale: String,
    /// Locale-less path of the page the switcher was on.
    pub next: Option<String>,
}

/// Pin the chosen language and reload the same page in it.
///
/// An unknown locale code leaves the language unchanged.
#[instrument(skip(current))]
pub async fn switch(current: RequestLocale, Form(form): Form<LocaleForm>) -> Response {
    let next = safe_next(form.next.as_deref()).unwrap_or("/");
    let Ok(locale) = form.locale.parse::<Locale>() else {
        tracing::debug!(code = %form.locale, "Ignoring unknown locale");
        return Redirect::to(&current.url(next)).into_response();
    };

    let mut response = Redirect::to(&localized_path(locale, next)).into_response();
    if let Ok(cookie) = HeaderValue::from_str(&locale_cookie(locale)) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}
