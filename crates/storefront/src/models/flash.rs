//! One-shot messages shown on the next rendered page.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier used by `partials/flash.html`.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash--success",
            Self::Error => "flash--error",
            Self::Info => "flash--info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        self.kind.css_class()
    }
}

/// Queue a flash for the next page render.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn push_flash(
    session: &Session,
    kind: FlashKind,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<Flash> = session
        .get(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    pending.push(Flash::new(kind, message));
    session.insert(session_keys::FLASH, pending).await
}

/// Drain every pending flash.
///
/// Store errors are logged and yield no messages; a missing flash never
/// fails a page.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(session_keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    }
}
