//! Supported UI locales and `Accept-Language` negotiation.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A UI language the shop is translated into.
///
/// Vietnamese is the primary market, so it is the default when nothing
/// else can be negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Vi,
    En,
}

impl Locale {
    /// Every supported locale, in display order.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Vi, Self::En]
    }

    /// The two-letter code used in URLs, cookies and `Accept-Language`.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Vi => "vi",
            Self::En => "en",
        }
    }

    /// The language's own name, for the language switcher.
    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::Vi => "Tiếng Việt",
            Self::En => "English",
        }
    }

    /// Thousands and decimal separators, in that order.
    #[must_use]
    pub const fn number_separators(self) -> (char, char) {
        match self {
            Self::Vi => ('.', ','),
            Self::En => (',', '.'),
        }
    }

    /// Match a language tag (`vi`, `vi-VN`, `EN_us`) to a supported locale.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?;
        match primary.to_ascii_lowercase().as_str() {
            "vi" => Some(Self::Vi),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    /// Pick the best supported locale from an `Accept-Language` header.
    ///
    /// Entries are ranked by their `q` weight (default 1.0); among equal
    /// weights the earlier entry wins. Entries with `q=0`, wildcards and
    /// unsupported languages are skipped. Returns `None` when nothing
    /// matches so the caller can apply its own default.
    #[must_use]
    pub fn from_accept_language(header: &str) -> Option<Self> {
        let mut best: Option<(Self, f32)> = None;

        for entry in header.split(',') {
            let mut params = entry.split(';');
            let Some(tag) = params.next() else {
                continue;
            };
            let Some(locale) = Self::from_tag(tag) else {
                continue;
            };

            let weight = params
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);

            if weight <= 0.0 {
                continue;
            }

            if best.is_none_or(|(_, w)| weight > w) {
                best = Some((locale, weight));
            }
        }

        best.map(|(locale, _)| locale)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vi" => Ok(Self::Vi),
            "en" => Ok(Self::En),
            _ => Err(format!("unsupported locale: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_only_exact_codes() {
        assert_eq!("vi".parse::<Locale>().unwrap(), Locale::Vi);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
        assert!("EN".parse::<Locale>().is_err());
    }

    #[test]
    fn test_from_tag_handles_regions() {
        assert_eq!(Locale::from_tag("vi-VN"), Some(Locale::Vi));
        assert_eq!(Locale::from_tag("EN_us"), Some(Locale::En));
        assert_eq!(Locale::from_tag("de"), None);
    }

    #[test]
    fn test_accept_language_prefers_weight() {
        let header = "fr-FR,fr;q=0.9,en;q=0.8,vi;q=0.7";
        assert_eq!(Locale::from_accept_language(header), Some(Locale::En));

        let header = "en;q=0.5, vi-VN";
        assert_eq!(Locale::from_accept_language(header), Some(Locale::Vi));
    }

    #[test]
    fn test_accept_language_first_wins_on_tie() {
        assert_eq!(
            Locale::from_accept_language("en-US,vi-VN"),
            Some(Locale::En)
        );
    }

    #[test]
    fn test_accept_language_skips_zero_and_unsupported() {
        assert_eq!(Locale::from_accept_language("vi;q=0, en;q=0.1"), Some(Locale::En));
        assert_eq!(Locale::from_accept_language("*, de, ja"), None);
        assert_eq!(Locale::from_accept_language(""), None);
    }

    #[test]
    fn test_number_separators_differ() {
        assert_eq!(Locale::Vi.number_separators(), ('.', ','));
        assert_eq!(Locale::En.number_separators(), (',', '.'));
    }

    #[test]
    fn test_default_is_vietnamese() {
        assert_eq!(Locale::default(), Locale::Vi);
    }
}
