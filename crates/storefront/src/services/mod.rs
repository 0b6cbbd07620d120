//! Long-lived services shared through `AppState`.
//!
//! - `token_keeper` - one scheduled access-token refresh per logged-in session

pub mod token_keeper;

pub use token_keeper::TokenKeeper;
