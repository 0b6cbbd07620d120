//! Strength checks for operator-supplied signing secrets.
//!
//! Both web binaries refuse to start with a session secret that is short,
//! looks like a copy-pasted placeholder, or is too repetitive to be random.

use std::collections::HashMap;

use thiserror::Error;

/// Shortest accepted session secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Below this a secret is treated as hand-typed rather than generated.
pub const MIN_BITS_PER_CHAR: f64 = 3.3;

/// Fragments that show up in `.env.example` style values (matched lowercase).
const PLACEHOLDER_FRAGMENTS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Why a secret was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeakSecret {
    #[error("must be at least {MIN_SECRET_LEN} characters (got {0})")]
    TooShort(usize),
    #[error("appears to be a placeholder (contains '{0}')")]
    Placeholder(&'static str),
    #[error(
        "entropy too low ({0:.2} bits/char, need >= {MIN_BITS_PER_CHAR:.1}); use a randomly generated value"
    )]
    LowEntropy(f64),
}

/// Shannon entropy of `s` in bits per character.
#[must_use]
pub fn bits_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .into_values()
        .map(|n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Check that `value` is fit for signing session cookies.
///
/// # Errors
///
/// Returns the first [`WeakSecret`] reason found. Placeholders are checked
/// before length.
pub fn check_secret(value: &str) -> Result<(), WeakSecret> {
    let lower = value.to_lowercase();
    if let Some(fragment) = PLACEHOLDER_FRAGMENTS
        .iter()
        .copied()
        .find(|fragment| lower.contains(fragment))
    {
        return Err(WeakSecret::Placeholder(fragment));
    }

    if value.len() < MIN_SECRET_LEN {
        return Err(WeakSecret::TooShort(value.len()));
    }

    let bits = bits_per_char(value);
    if bits < MIN_BITS_PER_CHAR {
        return Err(WeakSecret::LowEntropy(bits));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_char() {
        assert!(bits_per_char("").abs() < f64::EPSILON);
        assert!((bits_per_char("ab") - 1.0).abs() < 0.01);
        assert!(bits_per_char("aB3$xY9!mK2@nL5#") > MIN_BITS_PER_CHAR);
    }

    #[test]
    fn test_placeholder_rejected() {
        assert_eq!(
            check_secret("your-session-key-here-0123456789abcdef"),
            Err(WeakSecret::Placeholder("your-"))
        );
        assert_eq!(
            check_secret("CHANGEME"),
            Err(WeakSecret::Placeholder("changeme"))
        );
    }

    #[test]
    fn test_short_rejected() {
        assert_eq!(check_secret("aB3$xY9!"), Err(WeakSecret::TooShort(8)));
    }

    #[test]
    fn test_repetitive_rejected() {
        let result = check_secret(&"ab".repeat(20));
        assert!(matches!(result, Err(WeakSecret::LowEntropy(_))));
    }

    #[test]
    fn test_random_accepted() {
        assert_eq!(check_secret("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"), Ok(()));
    }

    #[test]
    fn test_message_mentions_minimum() {
        let message = WeakSecret::TooShort(5).to_string();
        assert!(message.contains("32"));
    }
}
