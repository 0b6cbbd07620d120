//! Breadcrumb trails derived from the request path.

use sapa_core::Locale;

use crate::i18n::{I18n, localized_path};

/// One step of the trail. The current page has no link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub href: Option<String>,
}

/// Build the trail for `path`.
///
/// `path` may carry the locale prefix (`/vi/products/ao-thun`) or not
/// (`/products/ao-thun`); the query string is ignored. Each segment is
/// labelled from `labels` first (for slugs whose display name is known,
/// like a product name), then from the `breadcrumb.<segment>` translation,
/// then by humanising the segment.
#[must_use]
pub fn breadcrumbs(locale: Locale, path: &str, labels: &[(&str, &str)]) -> Vec<Crumb> {
    let i18n = I18n::for_locale(locale);
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments
        .first()
        .is_some_and(|first| Locale::all().iter().any(|l| l.code() == *first))
    {
        segments.remove(0);
    }

    let mut crumbs = Vec::with_capacity(segments.len() + 1);
    crumbs.push(Crumb {
        label: i18n.t("breadcrumb.home").to_string(),
        href: Some(localized_path(locale, "/")),
    });

    let mut prefix = String::new();
    for segment in segments {
        prefix.push('/');
        prefix.push_str(segment);

        let label = labels
            .iter()
            .find(|(key, _)| *key == segment)
            .map(|(_, label)| (*label).to_string())
            .or_else(|| {
                i18n.get(&format!("breadcrumb.{segment}"))
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| humanize(segment));

        crumbs.push(Crumb {
            label,
            href: Some(localized_path(locale, &prefix)),
        });
    }

    if let Some(last) = crumbs.last_mut() {
        last.href = None;
    }
    crumbs
}

/// `ao-thun_nam` becomes `Ao thun nam`.
fn humanize(segment: &str) -> String {
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned());
    let spaced = decoded.replace(['-', '_'], " ");
    let mut chars = spaced.trim().chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(crumbs: &[Crumb]) -> Vec<&str> {
        crumbs.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn test_product_path_in_vietnamese() {
        let crumbs = breadcrumbs(Locale::Vi, "/vi/products/ao-thun", &[]);
        assert_eq!(labels(&crumbs), ["Trang chủ", "Sản phẩm", "Ao thun"]);
        assert_eq!(crumbs[0].href.as_deref(), Some("/vi"));
        assert_eq!(crumbs[1].href.as_deref(), Some("/vi/products"));
        assert_eq!(crumbs[2].href, None);
    }

    #[test]
    fn test_labels_override_slugs() {
        let crumbs = breadcrumbs(
            Locale::En,
            "/products/ao-thun?page=2",
            &[("ao-thun", "Linen T-shirt")],
        );
        assert_eq!(labels(&crumbs), ["Home", "Products", "Linen T-shirt"]);
    }

    #[test]
    fn test_root_is_a_single_unlinked_crumb() {
        let crumbs = breadcrumbs(Locale::En, "/en", &[]);
        assert_eq!(crumbs.len(), 1);
        assert_eq!(crumbs[0].href, None);
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("ao-thun_nam"), "Ao thun nam");
        assert_eq!(humanize("%C3%A1o-d%C3%A0i"), "Áo dài");
        assert_eq!(humanize(""), "");
    }
}
