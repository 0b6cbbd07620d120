//! Session-held types for the storefront.
//!
//! Domain data lives behind the REST API; only the logged-in identity,
//! its tokens and pending flash messages are kept in the session.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind, push_flash, take_flashes};
pub use session::{CurrentCustomer, StoredTokens, session_keys};
