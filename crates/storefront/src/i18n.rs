//! Translation catalogues.
//!
//! `locales/vi.json` and `locales/en.json` are flat `key -> text` maps
//! embedded at compile time and parsed once on first use. Missing keys
//! render as the key itself so a gap is visible on the page rather than
//! failing the request.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;

use sapa_core::Locale;

type Catalogue = HashMap<String, String>;

static VI: LazyLock<Catalogue> =
    LazyLock::new(|| load(Locale::Vi, include_str!("../locales/vi.json")));
static EN: LazyLock<Catalogue> =
    LazyLock::new(|| load(Locale::En, include_str!("../locales/en.json")));

fn load(locale: Locale, source: &str) -> Catalogue {
    serde_json::from_str(source).unwrap_or_else(|e| {
        tracing::error!(locale = locale.code(), error = %e, "Invalid translation catalogue");
        Catalogue::new()
    })
}

/// Lookup handle for one locale. Cheap to copy into every view.
#[derive(Clone, Copy)]
pub struct I18n {
    locale: Locale,
    messages: &'static Catalogue,
}

impl I18n {
    #[must_use]
    pub fn for_locale(locale: Locale) -> Self {
        let messages: &'static Catalogue = match locale {
            Locale::Vi => &*VI,
            Locale::En => &*EN,
        };
        Self { locale, messages }
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    /// Translate `key`, or return the key unchanged.
    #[must_use]
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    /// Translate `key` only if the catalogue has it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static str> {
        self.messages.get(key).map(String::as_str)
    }

    /// Translate `key` and substitute `{name}` placeholders.
    #[must_use]
    pub fn format(&self, key: &str, args: &[(&str, &dyn Display)]) -> String {
        args.iter()
            .fold(self.t(key).to_string(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), &value.to_string())
            })
    }

    /// Prefix an app path with this locale: `/cart` becomes `/vi/cart`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        localized_path(self.locale, path)
    }
}

impl std::fmt::Debug for I18n {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I18n")
            .field("locale", &self.locale)
            .field("keys", &self.messages.len())
            .finish()
    }
}

/// Prefix `path` with `/{locale}`; the root maps to `/{locale}`.
#[must_use]
pub fn localized_path(locale: Locale, path: &str) -> String {
    match path {
        "" | "/" => format!("/{}", locale.code()),
        p if p.starts_with('?') => format!("/{}{p}", locale.code()),
        p if p.starts_with('/') => format!("/{}{p}", locale.code()),
        p => format!("/{}/{p}", locale.code()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use sapa_core::{OrderStatus, PaymentMethod, PaymentStatus};

    use super::*;

    #[test]
    fn test_catalogues_parse_and_share_keys() {
        let vi: BTreeSet<_> = VI.keys().collect();
        let en: BTreeSet<_> = EN.keys().collect();
        assert!(!vi.is_empty());
        let only_vi: Vec<_> = vi.difference(&en).collect();
        let only_en: Vec<_> = en.difference(&vi).collect();
        assert!(only_vi.is_empty(), "missing in en.json: {only_vi:?}");
        assert!(only_en.is_empty(), "missing in vi.json: {only_en:?}");
    }

    #[test]
    fn test_status_labels_are_translated() {
        let i18n = I18n::for_locale(Locale::Vi);
        for status in OrderStatus::ALL {
            assert!(i18n.get(status.label_key()).is_some(), "{status}");
        }
        for method in PaymentMethod::ALL {
            assert!(i18n.get(method.label_key()).is_some(), "{}", method.as_str());
        }
        assert!(i18n.get(PaymentStatus::Paid.label_key()).is_some());
    }

    #[test]
    fn test_missing_key_falls_back_to_key() {
        let i18n = I18n::for_locale(Locale::En);
        assert_eq!(i18n.t("no.such.key"), "no.such.key");
        assert_eq!(i18n.t("nav.home"), "Home");
        assert_eq!(I18n::for_locale(Locale::Vi).t("nav.home"), "Trang chủ");
    }

    #[test]
    fn test_format_substitutes_placeholders() {
        let i18n = I18n::for_locale(Locale::En);
        assert_eq!(
            i18n.format("pagination.page_of", &[("page", &2), ("total", &5)]),
            "Page 2 of 5"
        );
    }

    #[test]
    fn test_localized_path() {
        assert_eq!(localized_path(Locale::Vi, "/"), "/vi");
        assert_eq!(localized_path(Locale::En, "/cart"), "/en/cart");
        assert_eq!(localized_path(Locale::En, "orders"), "/en/orders");
        assert_eq!(localized_path(Locale::Vi, "?page=2"), "/vi?page=2");
    }
}
