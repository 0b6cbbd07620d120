//! Core types for Sapa Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod locale;
pub mod money;
pub mod pagination;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use locale::Locale;
pub use money::{CurrencyCode, Money};
pub use pagination::{Page, PageRequest};
pub use status::*;
