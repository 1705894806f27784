//! # Docvault Core
//!
//! Shared logic for docvault: data models, the store contract, result
//! aggregation, selection tracking, and the in-memory reference store.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! I/O-bound dependencies. Everything here is driven by the client crate
//! or by tests.

pub mod aggregate;
pub mod error;
pub mod models;
pub mod selection;
pub mod store;
