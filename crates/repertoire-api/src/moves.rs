//! Handlers for `/moves` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/moves` | Body: [`MoveDraft`]; returns 201 + `{"new_move_id": ..}` |
//! | `GET`    | `/moves/{id}` | Single node with its review state |
//! | `DELETE` | `/moves/{id}` | Leaf nodes only; 409 if it has children |
//! | `DELETE` | `/moves/{id}/subtree` | Node and every descendant |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use repertoire_core::{
  engine::RepertoireEngine,
  node::{MoveDraft, MoveId, MoveNode},
  store::MoveStore,
};
use serde::Serialize;
use serde_json::json;

use crate::{error::ApiError, owner::Owner};

#[derive(Debug, Serialize)]
pub struct Created {
  pub new_move_id: MoveId,
}

/// `POST /moves`
pub async fn create<S: MoveStore>(
  State(engine): State<Arc<RepertoireEngine<S>>>,
  Owner(owner): Owner,
  Json(draft): Json<MoveDraft>,
) -> Result<impl IntoResponse, ApiError> {
  let new_move_id = engine.create_move(owner, draft).await?;
  Ok((StatusCode::CREATED, Json(Created { new_move_id })))
}

/// `GET /moves/{id}`
pub async fn get_one<S: MoveStore>(
  State(engine): State<Arc<RepertoireEngine<S>>>,
  Owner(owner): Owner,
  Path(id): Path<MoveId>,
) -> Result<Json<MoveNode>, ApiError> {
  Ok(Json(engine.get_move(owner, id).await?))
}

/// `DELETE /moves/{id}`
pub async fn delete_one<S: MoveStore>(
  State(engine): State<Arc<RepertoireEngine<S>>>,
  Owner(owner): Owner,
  Path(id): Path<MoveId>,
) -> Result<impl IntoResponse, ApiError> {
  engine.delete_move(owner, id).await?;
  Ok(Json(json!({ "status": "success" })))
}

/// `DELETE /moves/{id}/subtree`
pub async fn prune<S: MoveStore>(
  State(engine): State<Arc<RepertoireEngine<S>>>,
  Owner(owner): Owner,
  Path(id): Path<MoveId>,
) -> Result<impl IntoResponse, ApiError> {
  let removed = engine.prune_subtree(owner, id).await?;
  Ok(Json(json!({ "status": "success", "removed": removed })))
}
