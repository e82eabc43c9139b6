//! Core types, rules and trait definitions for the activity-point tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! rule functions here (submission gate, cap check, aggregation) are shared
//! by every storage backend and by the API layer.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod error;
pub mod gate;
pub mod policy;
pub mod report;
pub mod review;
pub mod store;
pub mod submission;

pub use error::{Error, Result};
