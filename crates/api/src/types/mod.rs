//! Data-transfer types mirrored from the commerce API.
//!
//! Field names follow the API's camelCase JSON. Optional fields default so
//! that older API versions that omit them still decode.

mod backoffice;
mod cart;
mod catalog;
mod marketing;
mod order;
mod user;

pub use backoffice::*;
pub use cart::*;
pub use catalog::*;
pub use marketing::*;
pub use order::*;
pub use user::*;
