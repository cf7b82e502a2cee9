//! JSON REST API for the repertoire trainer.
//!
//! Exposes an axum [`Router`] backed by a [`RepertoireEngine`] over any
//! [`MoveStore`]. Every request is scoped to the owner named in the
//! [`owner::OWNER_HEADER`] header; authentication, TLS and transport are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", repertoire_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod moves;
pub mod owner;
pub mod training;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post},
};
use repertoire_core::{engine::RepertoireEngine, store::MoveStore};
use serde::Deserialize;

pub use error::ApiError;

#[cfg(test)]
mod tests;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Top-level server configuration, deserialised from `config.toml` and
/// `REPERTOIRE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  /// SQLite database file, or `:memory:` for a throwaway store.
  pub store_path: PathBuf,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<RepertoireEngine<S>>) -> Router<()>
where
  S: MoveStore + 'static,
{
  Router::new()
    // Moves
    .route("/moves", post(moves::create::<S>))
    .route("/moves/{id}", get(moves::get_one::<S>).delete(moves::delete_one::<S>))
    .route("/moves/{id}/subtree", delete(moves::prune::<S>))
    // Training
    .route("/play", post(training::play::<S>))
    .route("/study", post(training::study::<S>))
    .route("/explore", get(training::explore::<S>))
    .with_state(engine)
}
