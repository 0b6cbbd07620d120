//! Outgoing integrations that are not the REST API.

pub mod email;

pub use email::{EmailError, EmailService, OrderStatusEmail};
