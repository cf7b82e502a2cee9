//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use repertoire_core::engine::RepertoireEngine;
use repertoire_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{api_router, owner::OWNER_HEADER, training::NO_MOVES_MESSAGE};

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
const AFTER_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";
const AFTER_D4: &str = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq d3 0 1";

type Engine = Arc<RepertoireEngine<SqliteStore>>;

async fn make_engine() -> Engine {
  let store = SqliteStore::open_in_memory().await.unwrap();
  Arc::new(RepertoireEngine::new(Arc::new(store)))
}

async fn send(
  engine: &Engine,
  method: &str,
  uri:    &str,
  owner:  Option<&str>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(owner) = owner {
    builder = builder.header(OWNER_HEADER, owner);
  }
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = api_router(engine.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

async fn create(engine: &Engine, owner: &str, body: Value) -> i64 {
  let (status, json) = send(engine, "POST", "/moves", Some(owner), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{json}");
  json["new_move_id"].as_i64().unwrap()
}

// ── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_owner_header_is_unauthorized() {
  let engine = make_engine().await;
  let (status, json) = send(&engine, "GET", "/explore?color=w", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(json["error_message"].as_str().unwrap().contains(OWNER_HEADER));
}

#[tokio::test]
async fn malformed_owner_header_is_unauthorized() {
  let engine = make_engine().await;
  let (status, _) = send(&engine, "GET", "/explore?color=w", Some("not-a-uuid"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Moves ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_move() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let id = create(
    &engine,
    &owner,
    json!({ "fen": AFTER_E4, "san": "e4", "perspective": "white" }),
  )
  .await;

  let (status, json) = send(&engine, "GET", &format!("/moves/{id}"), Some(&owner), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json["id"], id);
  assert_eq!(json["san"], "e4");
  assert_eq!(json["perspective"], "w");
  assert_eq!(json["is_book_move"], true);
  assert_eq!(json["parent_id"], Value::Null);
  assert_eq!(json["schedule"], Value::Null);
}

#[tokio::test]
async fn create_reports_missing_fields() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let (status, json) =
    send(&engine, "POST", "/moves", Some(&owner), Some(json!({ "san": "e4" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(json["missing_fields"], json!(["fen", "perspective"]));
  assert!(json["error_message"].is_string());
}

#[tokio::test]
async fn other_owners_move_is_not_found() {
  let engine = make_engine().await;
  let alice = Uuid::new_v4().to_string();
  let bob = Uuid::new_v4().to_string();

  let id = create(
    &engine,
    &alice,
    json!({ "fen": AFTER_E4, "san": "e4", "perspective": "w" }),
  )
  .await;

  let (status, _) = send(&engine, "GET", &format!("/moves/{id}"), Some(&bob), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send(&engine, "DELETE", &format!("/moves/{id}"), Some(&bob), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_requires_leaf_and_prune_cascades() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let e4 = create(&engine, &owner, json!({ "fen": AFTER_E4, "san": "e4", "perspective": "w" })).await;
  let e5 = create(
    &engine,
    &owner,
    json!({ "fen": AFTER_E5, "san": "e5", "perspective": "w", "parent_id": e4 }),
  )
  .await;

  let (status, _) = send(&engine, "DELETE", &format!("/moves/{e4}"), Some(&owner), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, json) = send(&engine, "DELETE", &format!("/moves/{e5}"), Some(&owner), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json, json!({ "status": "success" }));

  create(
    &engine,
    &owner,
    json!({ "fen": AFTER_E5, "san": "e5", "perspective": "w", "parent_id": e4 }),
  )
  .await;
  let (status, json) =
    send(&engine, "DELETE", &format!("/moves/{e4}/subtree"), Some(&owner), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json, json!({ "status": "success", "removed": 2 }));
}

// ── Training ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn play_first_move_lists_roots_from_start() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let e4 = create(&engine, &owner, json!({ "fen": AFTER_E4, "san": "e4", "perspective": "w" })).await;
  let d4 = create(&engine, &owner, json!({ "fen": AFTER_D4, "san": "d4", "perspective": "w" })).await;

  let (status, json) = send(
    &engine,
    "POST",
    "/play",
    Some(&owner),
    Some(json!({ "color": "white", "first_move": true })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json["move"]["id"], "");
  assert_eq!(json["move"]["san"], "");
  let next: Vec<i64> = json["next"]
    .as_array()
    .unwrap()
    .iter()
    .map(|m| m["id"].as_i64().unwrap())
    .collect();
  assert_eq!(next, vec![e4, d4]);
}

#[tokio::test]
async fn play_accepts_single_id_and_records_score() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let e4 = create(&engine, &owner, json!({ "fen": AFTER_E4, "san": "e4", "perspective": "w" })).await;
  let e5 = create(
    &engine,
    &owner,
    json!({ "fen": AFTER_E5, "san": "e5", "perspective": "w", "parent_id": e4 }),
  )
  .await;

  let (status, json) = send(
    &engine,
    "POST",
    "/play",
    Some(&owner),
    Some(json!({ "last_move_id": e4, "score": 5 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json["move"]["id"], e5);
  assert_eq!(json["next"], json!([]));

  let (_, node) = send(&engine, "GET", &format!("/moves/{e4}"), Some(&owner), None).await;
  assert_eq!(node["schedule"]["repetition_count"], 1);
  assert_eq!(node["schedule"]["interval_days"], 1);
}

#[tokio::test]
async fn play_rejects_out_of_range_score() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let e4 = create(&engine, &owner, json!({ "fen": AFTER_E4, "san": "e4", "perspective": "w" })).await;
  let (status, json) = send(
    &engine,
    "POST",
    "/play",
    Some(&owner),
    Some(json!({ "last_move_id": [e4], "score": 9 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(json["field"], "score");
}

#[tokio::test]
async fn study_on_empty_repertoire_has_no_moves() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let (status, json) = send(
    &engine,
    "POST",
    "/study",
    Some(&owner),
    Some(json!({ "color": "random" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json, json!({ "error_message": NO_MOVES_MESSAGE }));
}

#[tokio::test]
async fn study_rejects_unknown_color() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let (status, json) =
    send(&engine, "POST", "/study", Some(&owner), Some(json!({ "color": "green" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(json["field"], "color");
}

#[tokio::test]
async fn explore_requires_a_selector() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let (status, json) = send(&engine, "GET", "/explore", Some(&owner), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(json["missing_fields"], json!(["color", "last_move_id"]));
}

#[tokio::test]
async fn explore_lists_children_or_reports_empty() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let e4 = create(&engine, &owner, json!({ "fen": AFTER_E4, "san": "e4", "perspective": "w" })).await;
  create(
    &engine,
    &owner,
    json!({ "fen": AFTER_E5, "san": "e5", "perspective": "w", "parent_id": e4 }),
  )
  .await;

  let (status, json) =
    send(&engine, "GET", &format!("/explore?last_move_id={e4}"), Some(&owner), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json.as_array().unwrap().len(), 1);
  assert_eq!(json[0]["san"], "e5");

  let (status, json) = send(&engine, "GET", "/explore?color=b", Some(&owner), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json["error_message"], NO_MOVES_MESSAGE);
}

#[tokio::test]
async fn explore_treats_blank_last_move_id_as_absent() {
  let engine = make_engine().await;
  let owner = Uuid::new_v4().to_string();

  let e4 = create(&engine, &owner, json!({ "fen": AFTER_E4, "san": "e4", "perspective": "w" })).await;

  let (status, json) =
    send(&engine, "GET", "/explore?color=w&last_move_id=", Some(&owner), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(json.as_array().unwrap().len(), 1);
  assert_eq!(json[0]["id"], e4);

  let (status, json) =
    send(&engine, "GET", "/explore?color=&last_move_id=", Some(&owner), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(json["missing_fields"], json!(["color", "last_move_id"]));
}
