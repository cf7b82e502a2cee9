//! [`SqliteStore`]: the SQLite implementation of [`MoveStore`].

use std::path::Path;

use chrono::Utc;
use repertoire_core::{
  node::{Color, MoveId, MoveNode, NewMove, OwnerId, Schedule},
  store::{LeafDeletion, MoveStore},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior, types::Value};

use crate::{
  Result,
  encode::{
    MOVE_COLUMNS, RawMove, encode_color, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A move store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(?path, "opened sqlite move store");
    Ok(store)
  }

  /// Open an in-memory store, used by tests and `:memory:` configs.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT` over `moves` with the given tail and decode every row.
  async fn query_moves(
    &self,
    tail: &'static str,
    params: Vec<Value>,
  ) -> Result<Vec<MoveNode>> {
    let raws: Vec<RawMove> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {MOVE_COLUMNS} FROM moves {tail}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawMove::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMove::into_move).collect()
  }
}

// ─── MoveStore impl ──────────────────────────────────────────────────────────

impl MoveStore for SqliteStore {
  type Error = crate::Error;

  async fn insert_move(&self, input: NewMove) -> Result<MoveNode> {
    let created_at = Utc::now();

    let owner_str   = encode_uuid(input.owner_id);
    let at_str      = encode_dt(created_at);
    let persp_str   = encode_color(input.perspective);
    let fen         = input.fen.clone();
    let san         = input.san.clone();
    let parent_id   = input.parent_id;
    let is_book     = input.is_book_move;

    let id: MoveId = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO moves (owner_id, parent_id, fen, san, perspective, is_book_move, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![owner_str, parent_id, fen, san, persp_str, is_book, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(MoveNode {
      id,
      owner_id: input.owner_id,
      parent_id: input.parent_id,
      fen: input.fen,
      san: input.san,
      perspective: input.perspective,
      is_book_move: input.is_book_move,
      created_at,
      schedule: None,
    })
  }

  async fn get_move(&self, id: MoveId) -> Result<Option<MoveNode>> {
    let raw: Option<RawMove> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MOVE_COLUMNS} FROM moves WHERE move_id = ?1"),
              rusqlite::params![id],
              RawMove::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMove::into_move).transpose()
  }

  async fn children(&self, id: MoveId) -> Result<Vec<MoveNode>> {
    self
      .query_moves("WHERE parent_id = ?1 ORDER BY move_id", vec![Value::from(id)])
      .await
  }

  async fn roots(
    &self,
    owner: OwnerId,
    perspective: Option<Color>,
  ) -> Result<Vec<MoveNode>> {
    let persp_str = perspective.map(|c| encode_color(c).to_owned());
    self
      .query_moves(
        "WHERE owner_id = ?1 AND parent_id IS NULL
           AND (?2 IS NULL OR perspective = ?2)
         ORDER BY move_id",
        vec![Value::from(encode_uuid(owner)), Value::from(persp_str)],
      )
      .await
  }

  async fn book_moves(&self, owner: OwnerId) -> Result<Vec<MoveNode>> {
    self
      .query_moves(
        "WHERE owner_id = ?1 AND is_book_move = 1 ORDER BY move_id",
        vec![Value::from(encode_uuid(owner))],
      )
      .await
  }

  async fn update_schedule<F>(&self, id: MoveId, update: F) -> Result<Option<MoveNode>>
  where
    F: FnOnce(&MoveNode) -> Schedule + Send + 'static,
  {
    let updated = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front so the read below cannot
        // go stale before the update lands.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw = tx
          .query_row(
            &format!("SELECT {MOVE_COLUMNS} FROM moves WHERE move_id = ?1"),
            rusqlite::params![id],
            RawMove::from_row,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(None);
        };

        let mut node = raw
          .into_move()
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        let schedule = update(&node);

        tx.execute(
          "UPDATE moves SET
             last_review_at   = ?2,
             next_review_at   = ?3,
             repetition_count = ?4,
             easiness_factor  = ?5,
             interval_days    = ?6
           WHERE move_id = ?1",
          rusqlite::params![
            id,
            encode_dt(schedule.last_review_at),
            encode_date(schedule.next_review_at),
            schedule.repetition_count,
            schedule.easiness_factor,
            schedule.interval_days,
          ],
        )?;
        tx.commit()?;

        node.schedule = Some(schedule);
        Ok(Some(node))
      })
      .await?;

    Ok(updated)
  }

  async fn delete_leaf(&self, id: MoveId) -> Result<LeafDeletion> {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let has_children: bool = tx.query_row(
          "SELECT EXISTS (SELECT 1 FROM moves WHERE parent_id = ?1)",
          rusqlite::params![id],
          |row| row.get(0),
        )?;
        let outcome = if has_children {
          LeafDeletion::HasChildren
        } else if tx.execute("DELETE FROM moves WHERE move_id = ?1", rusqlite::params![id])? == 0 {
          LeafDeletion::Missing
        } else {
          LeafDeletion::Deleted
        };

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  async fn delete_moves(&self, ids: Vec<MoveId>) -> Result<usize> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        for id in ids {
          removed += tx.execute("DELETE FROM moves WHERE move_id = ?1", rusqlite::params![id])?;
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;

    Ok(removed)
  }
}
