//! Sapa Core - Shared types library.
//!
//! This crate provides common types used across all Sapa components:
//! - `sapa-api` - REST client for the commerce backend
//! - `storefront` - Public-facing e-commerce site
//! - `admin` - Back-office console
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no sessions. Everything here is safe to use from templates,
//! handlers and tests alike.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money, locales, statuses and pagination
//! - [`secret`] - Strength checks for session signing secrets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod secret;
pub mod types;

pub use types::*;
