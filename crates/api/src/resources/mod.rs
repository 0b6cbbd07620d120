//! Resource endpoints, each a set of `impl ApiClient` methods.

mod account;
mod auth;
mod backoffice;
mod catalog;
mod shopping;

pub use auth::LoginResult;
