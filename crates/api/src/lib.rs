//! REST client for the Sapa Shop commerce API.
//!
//! # Architecture
//!
//! - The API is the source of truth for catalog, carts, orders and accounts.
//!   No local copies are kept beyond a short-lived response cache.
//! - One shared [`ApiClient`] per binary, cloned into every handler.
//! - Catalog reads (products, categories, attributes, settings) are cached
//!   via `moka` and invalidated by the matching mutations.
//! - Authenticated calls take an [`AuthSession`]. A `401` triggers one
//!   refresh through `POST /auth/refresh` and one replay.
//!
//! # Example
//!
//! ```rust,ignore
//! use sapa_api::{ApiClient, ApiConfig, AuthSession, types::LoginRequest};
//!
//! let client = ApiClient::new(&ApiConfig::new("https://api.sapa.vn/api")?)?;
//! let login = client.login(&LoginRequest { email, password }).await?;
//! let auth = AuthSession::new(login.tokens);
//! let cart = client.get_cart(&auth).await?;
//! if auth.refreshed() {
//!     // persist auth.tokens()
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
mod cache;
mod client;
pub mod config;
pub mod error;
pub mod refresh;
mod resources;
pub mod types;

pub use auth::{AuthSession, TokenPair};
pub use client::{ApiClient, ApiResponse, REFRESH_REUSE_WINDOW};
pub use config::ApiConfig;
pub use error::ApiError;
pub use refresh::{DEFAULT_REFRESH_SKEW, RefreshScheduler, TokenRefresher};
pub use resources::LoginResult;
