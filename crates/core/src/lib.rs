//! Tradepost Core - Shared domain types.
//!
//! This crate provides the types exchanged with the Tradepost backend
//! services:
//! - `auth` - login and registration
//! - `accounts` - account profile and addresses
//! - `items` - the product catalog
//! - `orders` - order placement and lifecycle
//! - `payments` - payment capture
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. The session and request gateway lives in
//! `tradepost-gateway`.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, statuses, cart lines and service payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
