//! Move nodes: one ply in an owner's repertoire forest.
//!
//! Nodes refer to their parent by id only. A node never changes after
//! creation except for its [`Schedule`], which is replaced wholesale on every
//! review.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::{Error, Result};

/// Store-assigned, strictly positive move identifier.
pub type MoveId = i64;

/// The owning user, as identified by the request layer.
pub type OwnerId = Uuid;

/// Board state before any move has been played.
pub const STARTING_POSITION_FEN: &str =
  "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// ─── Color ───────────────────────────────────────────────────────────────────

/// The side whose repertoire a line belongs to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
  strum::EnumIter,
)]
pub enum Color {
  #[serde(rename = "w")]
  #[strum(serialize = "w")]
  White,
  #[serde(rename = "b")]
  #[strum(serialize = "b")]
  Black,
}

impl Color {
  /// Parse any accepted spelling (`w`, `b`, `white`, `black`).
  ///
  /// `field` names the input in the resulting validation error.
  pub fn parse(field: &'static str, raw: &str) -> Result<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "w" | "white" => Ok(Self::White),
      "b" | "black" => Ok(Self::Black),
      other => Err(Error::invalid(
        field,
        format!("expected one of w, b, white, black; got {other:?}"),
      )),
    }
  }

  pub fn from_letter(c: char) -> Option<Self> {
    match c {
      'w' => Some(Self::White),
      'b' => Some(Self::Black),
      _ => None,
    }
  }
}

/// Side to move encoded in a FEN string (its second field).
pub fn side_to_move(fen: &str) -> Result<Color> {
  let token = fen
    .split_whitespace()
    .nth(1)
    .ok_or_else(|| Error::invalid("fen", "position has no side-to-move field"))?;

  let mut chars = token.chars();
  match (chars.next().and_then(Color::from_letter), chars.next()) {
    (Some(color), None) => Ok(color),
    _ => Err(Error::invalid(
      "fen",
      format!("unknown side-to-move token {token:?}"),
    )),
  }
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// Spaced-repetition state of a reviewed node.
///
/// A node carries either a complete schedule or none at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
  pub last_review_at:   DateTime<Utc>,
  pub next_review_at:   NaiveDate,
  pub repetition_count: u32,
  pub easiness_factor:  f64,
  pub interval_days:    u32,
}

// ─── MoveNode ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveNode {
  pub id:           MoveId,
  pub owner_id:     OwnerId,
  /// `None` marks the root of a line.
  pub parent_id:    Option<MoveId>,
  /// Position after this move has been applied.
  pub fen:          String,
  pub san:          String,
  pub perspective:  Color,
  /// `true` when this is the owner's own memorised move rather than a
  /// modelled opponent reply.
  pub is_book_move: bool,
  pub created_at:   DateTime<Utc>,
  pub schedule:     Option<Schedule>,
}

impl MoveNode {
  pub fn easiness(&self) -> Option<f64> {
    self.schedule.as_ref().map(|s| s.easiness_factor)
  }

  pub fn summary(&self) -> MoveSummary {
    MoveSummary {
      id:  Some(self.id),
      fen: self.fen.clone(),
      san: self.san.clone(),
    }
  }
}

// ─── NewMove / MoveDraft ─────────────────────────────────────────────────────

/// Validated input to [`crate::store::MoveStore::insert_move`].
/// `id` and `created_at` are always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMove {
  pub owner_id:     OwnerId,
  pub parent_id:    Option<MoveId>,
  pub fen:          String,
  pub san:          String,
  pub perspective:  Color,
  pub is_book_move: bool,
}

/// Raw caller input for creating a move, validated by
/// [`crate::engine::RepertoireEngine::create_move`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoveDraft {
  pub fen:         Option<String>,
  pub san:         Option<String>,
  pub perspective: Option<String>,
  pub parent_id:   Option<MoveId>,
}

// ─── MoveSummary ─────────────────────────────────────────────────────────────

/// The `{id, fen, san}` shape handed back to clients.
///
/// The synthetic start-of-tree node has no id and serialises it as `""`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveSummary {
  #[serde(serialize_with = "serialize_summary_id")]
  pub id:  Option<MoveId>,
  pub fen: String,
  pub san: String,
}

impl MoveSummary {
  /// The pseudo-node standing for the position before the first move.
  pub fn start() -> Self {
    Self {
      id:  None,
      fen: STARTING_POSITION_FEN.to_owned(),
      san: String::new(),
    }
  }
}

fn serialize_summary_id<S: Serializer>(
  id: &Option<MoveId>,
  ser: S,
) -> Result<S::Ok, S::Error> {
  match id {
    Some(id) => ser.serialize_i64(*id),
    None => ser.serialize_str(""),
  }
}
