//! Core types for Tradepost.
//!
//! This module provides type-safe wrappers for the domain concepts the
//! backend services exchange.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod id;
pub mod order;
pub mod payment;
pub mod status;

pub use account::{Account, AccountUpdate, Address, AddressRequest, NewAccount};
pub use cart::{Cart, CartError, CartLine};
pub use catalog::{Item, ItemUpdate, NewItem, Page};
pub use id::*;
pub use order::{Order, OrderLine};
pub use payment::{Payment, PaymentRequest};
pub use status::*;
