//! One-shot messages shown on the next rendered page.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    /// CSS modifier used by `partials/flash.html`.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "alert--success",
            FlashKind::Error => "alert--error",
        }
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
    pending.push(Flash {
        kind,
        message: message.into(),
    });
    session.insert(session_keys::FLASH, pending).await
}

/// Drain every pending flash. Store errors yield no messages.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(session_keys::FLASH)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read flash messages");
            None
        })
        .unwrap_or_default()
}
