//! Core types and trait definitions for the Shelf commerce service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement the traits in [`store`]; the identity and cart
//! services in `shelf-service` are written against those traits only.

pub mod cart;
pub mod catalog;
pub mod clock;
pub mod customer;
pub mod error;
pub mod store;
pub mod subject;
pub mod token;

pub use error::{StoreError, StoreResult};
