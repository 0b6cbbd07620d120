//! Session-held types for the admin panel.
//!
//! Everything an operator edits lives behind the REST API. The session
//! keeps the signed-in admin, their API tokens and pending flash messages.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind, push_flash, take_flashes};
pub use session::{CurrentAdmin, session_keys};
