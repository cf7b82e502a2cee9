//! Core types and trait definitions for the repertoire trainer.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the move-tree data model, the spaced-repetition scheduling seam, and the
//! [`RepertoireEngine`](engine::RepertoireEngine) that drives play, study and
//! explore sessions over any [`MoveStore`](store::MoveStore).

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod error;
pub mod memory;
pub mod node;
pub mod schedule;
pub mod store;
pub mod strength;

pub use error::{Error, Result};
