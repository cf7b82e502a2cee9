//! Handlers for the training endpoints: `/play`, `/study` and `/explore`.
//!
//! An empty selection is not an error. It answers 200 with
//! `{"error_message": "No moves to display"}` so clients can render it as a
//! normal empty state.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  response::{IntoResponse, Response},
};
use repertoire_core::{
  engine::{
    ExploreRequest, Outcome, PlayRequest, RepertoireEngine, StudyRequest,
    StudyScope,
  },
  node::MoveId,
  store::MoveStore,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::{error::ApiError, owner::Owner};

pub const NO_MOVES_MESSAGE: &str = "No moves to display";

/// Wraps an [`Outcome`] so `NoMoves` renders as the empty-state body.
pub struct Reply<T>(pub Outcome<T>);

impl<T: Serialize> IntoResponse for Reply<T> {
  fn into_response(self) -> Response {
    match self.0.found() {
      Some(body) => Json(body).into_response(),
      None => Json(json!({ "error_message": NO_MOVES_MESSAGE })).into_response(),
    }
  }
}

/// Accept either a single id or a list of ids.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<MoveId>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Ids {
    One(MoveId),
    Many(Vec<MoveId>),
  }

  Ok(match Option::<Ids>::deserialize(deserializer)? {
    None => Vec::new(),
    Some(Ids::One(id)) => vec![id],
    Some(Ids::Many(ids)) => ids,
  })
}

/// Query strings send an unset id as `last_move_id=`; treat it as absent.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<MoveId>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<String>::deserialize(deserializer)? {
    None => Ok(None),
    Some(raw) if raw.trim().is_empty() => Ok(None),
    Some(raw) => raw.trim().parse().map(Some).map_err(serde::de::Error::custom),
  }
}

// ─── Play ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PlayBody {
  pub color:        Option<String>,
  #[serde(default)]
  pub first_move:   bool,
  #[serde(default, deserialize_with = "one_or_many")]
  pub last_move_id: Vec<MoveId>,
  pub score:        Option<i64>,
}

/// `POST /play`
pub async fn play<S: MoveStore>(
  State(engine): State<Arc<RepertoireEngine<S>>>,
  Owner(owner): Owner,
  Json(body): Json<PlayBody>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = engine
    .play(owner, PlayRequest {
      color:         body.color,
      first_move:    body.first_move,
      last_move_ids: body.last_move_id,
      score:         body.score,
    })
    .await?;
  Ok(Reply(outcome))
}

// ─── Study ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StudyBody {
  #[serde(default, deserialize_with = "one_or_many")]
  pub last_move_id: Vec<MoveId>,
  pub score:        Option<i64>,
  /// A color, `"random"`, or absent for both perspectives.
  pub color:        Option<String>,
}

/// `POST /study`
pub async fn study<S: MoveStore>(
  State(engine): State<Arc<RepertoireEngine<S>>>,
  Owner(owner): Owner,
  Json(body): Json<StudyBody>,
) -> Result<impl IntoResponse, ApiError> {
  let scope = StudyScope::parse(body.color.as_deref())?;
  let outcome = engine
    .study(owner, StudyRequest {
      last_move_ids: body.last_move_id,
      score: body.score,
      scope,
    })
    .await?;
  Ok(Reply(outcome))
}

// ─── Explore ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ExploreParams {
  pub color:        Option<String>,
  #[serde(default, deserialize_with = "blank_as_none")]
  pub last_move_id: Option<MoveId>,
}

/// `GET /explore?color=<w|b>` or `GET /explore?last_move_id=<id>`
pub async fn explore<S: MoveStore>(
  State(engine): State<Arc<RepertoireEngine<S>>>,
  Owner(owner): Owner,
  Query(params): Query<ExploreParams>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = engine
    .explore(owner, ExploreRequest {
      color:        params.color,
      last_move_id: params.last_move_id,
    })
    .await?;
  Ok(Reply(outcome))
}
