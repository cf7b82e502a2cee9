//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and review dates as ISO 8601
//! calendar dates. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use repertoire_core::node::{Color, MoveNode, Schedule};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Color ───────────────────────────────────────────────────────────────────

pub fn encode_color(c: Color) -> &'static str {
  match c {
    Color::White => "w",
    Color::Black => "b",
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawMove::from_row`].
pub const MOVE_COLUMNS: &str = "move_id, owner_id, parent_id, fen, san, perspective,
  is_book_move, created_at, last_review_at, next_review_at, repetition_count,
  easiness_factor, interval_days";

/// Raw values read directly from a `moves` row.
pub struct RawMove {
  pub move_id:          i64,
  pub owner_id:         String,
  pub parent_id:        Option<i64>,
  pub fen:              String,
  pub san:              String,
  pub perspective:      String,
  pub is_book_move:     bool,
  pub created_at:       String,
  pub last_review_at:   Option<String>,
  pub next_review_at:   Option<String>,
  pub repetition_count: Option<u32>,
  pub easiness_factor:  Option<f64>,
  pub interval_days:    Option<u32>,
}

impl RawMove {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      move_id:          row.get(0)?,
      owner_id:         row.get(1)?,
      parent_id:        row.get(2)?,
      fen:              row.get(3)?,
      san:              row.get(4)?,
      perspective:      row.get(5)?,
      is_book_move:     row.get(6)?,
      created_at:       row.get(7)?,
      last_review_at:   row.get(8)?,
      next_review_at:   row.get(9)?,
      repetition_count: row.get(10)?,
      easiness_factor:  row.get(11)?,
      interval_days:    row.get(12)?,
    })
  }

  pub fn into_move(self) -> Result<MoveNode> {
    let id = self.move_id;
    let corrupt = |reason: &str| Error::CorruptRow { id, reason: reason.to_owned() };

    let perspective = self
      .perspective
      .chars()
      .next()
      .and_then(Color::from_letter)
      .filter(|_| self.perspective.len() == 1)
      .ok_or_else(|| corrupt("unknown perspective"))?;

    let schedule = match (
      self.last_review_at,
      self.next_review_at,
      self.repetition_count,
      self.easiness_factor,
      self.interval_days,
    ) {
      (None, None, None, None, None) => None,
      (Some(last), Some(next), Some(repetition_count), Some(easiness_factor), Some(interval_days)) => {
        Some(Schedule {
          last_review_at: decode_dt(&last)?,
          next_review_at: decode_date(&next)?,
          repetition_count,
          easiness_factor,
          interval_days,
        })
      }
      _ => return Err(corrupt("partially set review columns")),
    };

    Ok(MoveNode {
      id,
      owner_id: decode_uuid(&self.owner_id)?,
      parent_id: self.parent_id,
      fen: self.fen,
      san: self.san,
      perspective,
      is_book_move: self.is_book_move,
      created_at: decode_dt(&self.created_at)?,
      schedule,
    })
  }
}
