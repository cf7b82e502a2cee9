//! [`RepertoireEngine`]: move management, review feedback and the play,
//! study and explore selection algorithms.
//!
//! Every operation runs to completion against the [`MoveStore`]; the engine
//! keeps no state between calls apart from its random source.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rand::{RngCore, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  node::{
    Color, MoveDraft, MoveId, MoveNode, MoveSummary, NewMove, OwnerId, Schedule,
    side_to_move,
  },
  schedule::{MAX_INTERVAL_DAYS, PriorState, Quality, Scheduler, Sm2},
  store::{LeafDeletion, MoveStore},
  strength::{descendant_strength, most_due, weakest},
};

// ─── Requests ────────────────────────────────────────────────────────────────

/// Input to [`RepertoireEngine::play`].
#[derive(Debug, Clone, Default)]
pub struct PlayRequest {
  /// Required when `first_move` is set.
  pub color:         Option<String>,
  pub first_move:    bool,
  /// Moves shown on the previous step. More than one id means the client
  /// could not tell which candidate was played.
  pub last_move_ids: Vec<MoveId>,
  /// Recall quality for the previous step; negative values mean "no score".
  pub score:         Option<i64>,
}

/// Which perspective [`RepertoireEngine::study`] draws due moves from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudyScope {
  #[default]
  All,
  Only(Color),
  /// Pick a color from the engine's random source for this call.
  Random,
}

impl StudyScope {
  /// `None` or blank selects [`StudyScope::All`]; `"random"` selects
  /// [`StudyScope::Random`]; anything else must be a color.
  pub fn parse(raw: Option<&str>) -> Result<Self> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
      None => Ok(Self::All),
      Some(s) if s.eq_ignore_ascii_case("random") => Ok(Self::Random),
      Some(s) => Color::parse("color", s).map(Self::Only),
    }
  }
}

/// Input to [`RepertoireEngine::study`].
#[derive(Debug, Clone, Default)]
pub struct StudyRequest {
  /// Options shown on the previous step, all scored with `score`.
  pub last_move_ids: Vec<MoveId>,
  pub score:         Option<i64>,
  pub scope:         StudyScope,
}

/// Input to [`RepertoireEngine::explore`]. Exactly one field must be set.
#[derive(Debug, Clone, Default)]
pub struct ExploreRequest {
  pub color:        Option<String>,
  pub last_move_id: Option<MoveId>,
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// A position to respond to and the candidate continuations from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
  #[serde(rename = "move")]
  pub current: MoveSummary,
  pub next:    Vec<MoveSummary>,
}

/// Result of a selection. [`Outcome::NoMoves`] is a normal empty state, not
/// a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
  Found(T),
  NoMoves,
}

impl<T> Outcome<T> {
  pub fn found(self) -> Option<T> {
    match self {
      Self::Found(t) => Some(t),
      Self::NoMoves => None,
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct RepertoireEngine<S, C = Sm2> {
  store:     Arc<S>,
  scheduler: Arc<C>,
  rng:       Mutex<Box<dyn RngCore + Send>>,
}

impl<S: MoveStore> RepertoireEngine<S> {
  /// An engine using SM-2 and an entropy-seeded random source.
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      scheduler: Arc::new(Sm2),
      rng: Mutex::new(Box::new(StdRng::from_entropy())),
    }
  }
}

impl<S, C> RepertoireEngine<S, C>
where
  S: MoveStore,
  C: Scheduler + 'static,
{
  /// Swap the spaced-repetition formula.
  pub fn with_scheduler<D: Scheduler>(self, scheduler: D) -> RepertoireEngine<S, D> {
    RepertoireEngine {
      store:     self.store,
      scheduler: Arc::new(scheduler),
      rng:       self.rng,
    }
  }

  /// Replace the random source, e.g. with a seeded RNG in tests.
  pub fn with_rng(self, rng: impl RngCore + Send + 'static) -> Self {
    Self { rng: Mutex::new(Box::new(rng)), ..self }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Move management ───────────────────────────────────────────────────────

  /// Validate `draft` and persist it as a new node owned by `owner`.
  pub async fn create_move(&self, owner: OwnerId, draft: MoveDraft) -> Result<MoveId> {
    let mut missing = Vec::new();
    let fen = required(&mut missing, "fen", draft.fen);
    let san = required(&mut missing, "san", draft.san);
    let perspective = required(&mut missing, "perspective", draft.perspective);

    let (Some(fen), Some(san), Some(perspective)) = (fen, san, perspective) else {
      return Err(Error::MissingFields(missing));
    };

    let perspective = Color::parse("perspective", &perspective)?;
    // The move was ours when the opponent is now to move.
    let is_book_move = side_to_move(&fen)? != perspective;

    if let Some(parent_id) = draft.parent_id {
      let parent = self.owned_move(owner, parent_id).await?;
      if parent.perspective != perspective {
        return Err(Error::invalid(
          "perspective",
          format!("parent {parent_id} belongs to the {} repertoire", parent.perspective),
        ));
      }
    }

    let node = self
      .store
      .insert_move(NewMove {
        owner_id: owner,
        parent_id: draft.parent_id,
        fen,
        san,
        perspective,
        is_book_move,
      })
      .await
      .map_err(Error::store)?;

    info!(
      %owner,
      move_id = node.id,
      parent_id = ?node.parent_id,
      san = %node.san,
      is_book_move,
      "created move"
    );
    Ok(node.id)
  }

  /// Delete a single leaf node. Nodes with continuations are rejected; see
  /// [`Self::prune_subtree`].
  pub async fn delete_move(&self, owner: OwnerId, id: MoveId) -> Result<()> {
    self.owned_move(owner, id).await?;

    match self.store.delete_leaf(id).await.map_err(Error::store)? {
      LeafDeletion::Deleted => {}
      LeafDeletion::HasChildren => return Err(Error::HasChildren(id)),
      LeafDeletion::Missing => return Err(Error::MoveNotFound(id)),
    }
    info!(%owner, move_id = id, "deleted move");
    Ok(())
  }

  /// Delete a node together with every descendant. Returns the number of
  /// nodes removed.
  pub async fn prune_subtree(&self, owner: OwnerId, id: MoveId) -> Result<usize> {
    self.owned_move(owner, id).await?;

    let mut order = vec![id];
    let mut cursor = 0;
    while let Some(&current) = order.get(cursor) {
      let children = self.store.children(current).await.map_err(Error::store)?;
      order.extend(children.iter().map(|c| c.id));
      cursor += 1;
    }
    // Breadth-first order reversed puts every descendant before its parent.
    order.reverse();

    let removed = self.store.delete_moves(order).await.map_err(Error::store)?;
    info!(%owner, move_id = id, removed, "pruned subtree");
    Ok(removed)
  }

  /// Full detail of one node, schedule included.
  pub async fn get_move(&self, owner: OwnerId, id: MoveId) -> Result<MoveNode> {
    self.owned_move(owner, id).await
  }

  // ── Review feedback ───────────────────────────────────────────────────────

  /// Feed one review of `id` through the scheduler and persist the result.
  pub async fn record_review(
    &self,
    owner: OwnerId,
    id: MoveId,
    quality: Quality,
  ) -> Result<Schedule> {
    self.owned_move(owner, id).await?;
    self.apply_review(id, quality).await
  }

  async fn apply_review(&self, id: MoveId, quality: Quality) -> Result<Schedule> {
    let scheduler = Arc::clone(&self.scheduler);
    let now = Utc::now();

    let updated = self
      .store
      .update_schedule(id, move |node| {
        let prior = node.schedule.as_ref().map(|s| PriorState {
          interval_days:    s.interval_days,
          repetition_count: s.repetition_count,
          easiness_factor:  s.easiness_factor,
        });
        let out = scheduler.score(quality, prior, now.date_naive());
        Schedule {
          last_review_at:   now,
          next_review_at:   out.next_review_at,
          repetition_count: out.repetition_count,
          easiness_factor:  out.easiness_factor,
          interval_days:    out.interval_days.min(MAX_INTERVAL_DAYS),
        }
      })
      .await
      .map_err(Error::store)?;

    let schedule = updated
      .and_then(|node| node.schedule)
      .ok_or(Error::MoveNotFound(id))?;

    debug!(
      move_id = id,
      quality = quality.value(),
      interval_days = schedule.interval_days,
      easiness = schedule.easiness_factor,
      next_review_at = %schedule.next_review_at,
      "recorded review"
    );
    Ok(schedule)
  }

  // ── Play ──────────────────────────────────────────────────────────────────

  /// Advance a play session by one step.
  pub async fn play(&self, owner: OwnerId, req: PlayRequest) -> Result<Outcome<Selection>> {
    if req.first_move {
      let color = req
        .color
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::MissingFields(vec!["color"]))?;

      return match Color::parse("color", color)? {
        Color::White => self.white_opening(owner).await,
        Color::Black => self.black_opening(owner).await,
      };
    }

    let Some(&last_move_id) = req.last_move_ids.first() else {
      return Err(Error::MissingFields(vec!["last_move_id"]));
    };
    let quality = optional_quality(req.score)?;
    self.check_owned_ids(owner, &req.last_move_ids).await?;

    if req.last_move_ids.len() > 1 {
      warn!(
        %owner,
        candidates = ?req.last_move_ids,
        "ambiguous previous move; scoring every candidate as a blackout"
      );
      for &id in &req.last_move_ids {
        self.apply_review(id, Quality::BLACKOUT).await?;
      }
    } else if let Some(quality) = quality {
      self.apply_review(last_move_id, quality).await?;
    }

    let candidates = self.store.children(last_move_id).await.map_err(Error::store)?;
    let Some((current, next)) = self.weakest_line(candidates).await? else {
      debug!(%owner, last_move_id, "no continuation to play");
      return Ok(Outcome::NoMoves);
    };

    debug!(%owner, last_move_id, move_id = current.id, "selected continuation");
    Ok(Outcome::Found(Selection {
      current: current.summary(),
      next:    summaries(&next),
    }))
  }

  /// White's lines are listed for the user to choose from.
  async fn white_opening(&self, owner: OwnerId) -> Result<Outcome<Selection>> {
    let roots = self
      .store
      .roots(owner, Some(Color::White))
      .await
      .map_err(Error::store)?;

    if roots.is_empty() {
      return Ok(Outcome::NoMoves);
    }
    Ok(Outcome::Found(Selection {
      current: MoveSummary::start(),
      next:    summaries(&roots),
    }))
  }

  /// Black's starting line is chosen for the user: the least practised one.
  async fn black_opening(&self, owner: OwnerId) -> Result<Outcome<Selection>> {
    let roots = self
      .store
      .roots(owner, Some(Color::Black))
      .await
      .map_err(Error::store)?;

    let Some((root, children)) = self.weakest_line(roots).await? else {
      return Ok(Outcome::NoMoves);
    };

    debug!(%owner, move_id = root.id, "selected black opening");
    Ok(Outcome::Found(Selection {
      current: root.summary(),
      next:    summaries(&children),
    }))
  }

  /// The candidate with the lowest descendant strength, with its children.
  async fn weakest_line(
    &self,
    candidates: Vec<MoveNode>,
  ) -> Result<Option<(MoveNode, Vec<MoveNode>)>> {
    let mut ranked = Vec::with_capacity(candidates.len());
    for node in candidates {
      let children = self.store.children(node.id).await.map_err(Error::store)?;
      let strength = descendant_strength(&children);
      ranked.push(((node, children), strength));
    }
    Ok(weakest(ranked))
  }

  // ── Study ─────────────────────────────────────────────────────────────────

  /// Score the previous step, then present the position before the most
  /// overdue book move.
  pub async fn study(&self, owner: OwnerId, req: StudyRequest) -> Result<Outcome<Selection>> {
    if let Some(quality) = optional_quality(req.score)? {
      self.check_owned_ids(owner, &req.last_move_ids).await?;
      for &id in &req.last_move_ids {
        self.apply_review(id, quality).await?;
      }
    }

    let perspective = self.resolve_scope(req.scope);
    let mut book = self.store.book_moves(owner).await.map_err(Error::store)?;
    if let Some(color) = perspective {
      book.retain(|n| n.perspective == color);
    }

    let Some(due) = most_due(&book) else {
      debug!(%owner, ?perspective, "nothing to study");
      return Ok(Outcome::NoMoves);
    };
    debug!(%owner, move_id = due.id, "selected due move");

    let selection = match due.parent_id {
      Some(parent_id) => {
        let parent = self
          .store
          .get_move(parent_id)
          .await
          .map_err(Error::store)?
          .ok_or(Error::MoveNotFound(parent_id))?;
        let siblings = self.store.children(parent_id).await.map_err(Error::store)?;
        Selection {
          current: parent.summary(),
          next:    summaries(&siblings),
        }
      }
      None => {
        let roots = self
          .store
          .roots(owner, perspective)
          .await
          .map_err(Error::store)?;
        Selection {
          current: MoveSummary::start(),
          next:    summaries(&roots),
        }
      }
    };
    Ok(Outcome::Found(selection))
  }

  fn resolve_scope(&self, scope: StudyScope) -> Option<Color> {
    match scope {
      StudyScope::All => None,
      StudyScope::Only(color) => Some(color),
      StudyScope::Random => {
        let colors: Vec<Color> = Color::iter().collect();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        colors.choose(&mut *rng).copied()
      }
    }
  }

  // ── Explore ───────────────────────────────────────────────────────────────

  /// Read-only browse: the children of a move, or the roots of a color.
  pub async fn explore(
    &self,
    owner: OwnerId,
    req: ExploreRequest,
  ) -> Result<Outcome<Vec<MoveSummary>>> {
    let color = req.color.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let nodes = match (color, req.last_move_id) {
      (None, None) => {
        return Err(Error::MissingFields(vec!["color", "last_move_id"]));
      }
      (Some(_), Some(_)) => {
        return Err(Error::invalid(
          "last_move_id",
          "supply either color or last_move_id, not both",
        ));
      }
      (None, Some(id)) => {
        self.owned_move(owner, id).await?;
        self.store.children(id).await.map_err(Error::store)?
      }
      (Some(color), None) => {
        let color = Color::parse("color", color)?;
        self.store.roots(owner, Some(color)).await.map_err(Error::store)?
      }
    };

    if nodes.is_empty() {
      return Ok(Outcome::NoMoves);
    }
    Ok(Outcome::Found(summaries(&nodes)))
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// Fetch `id`, treating another owner's node as missing.
  async fn owned_move(&self, owner: OwnerId, id: MoveId) -> Result<MoveNode> {
    self
      .store
      .get_move(id)
      .await
      .map_err(Error::store)?
      .filter(|node| node.owner_id == owner)
      .ok_or(Error::MoveNotFound(id))
  }

  /// Check every id before any review is written.
  async fn check_owned_ids(&self, owner: OwnerId, ids: &[MoveId]) -> Result<()> {
    if let Some(&bad) = ids.iter().find(|&&id| id <= 0) {
      return Err(Error::invalid(
        "last_move_id",
        format!("expected a positive move id, got {bad}"),
      ));
    }
    for &id in ids {
      self.owned_move(owner, id).await?;
    }
    Ok(())
  }
}

/// Trimmed, non-empty `value`, or record `field` as missing.
fn required(
  missing: &mut Vec<&'static str>,
  field: &'static str,
  value: Option<String>,
) -> Option<String> {
  let value = value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty());
  if value.is_none() {
    missing.push(field);
  }
  value
}

fn optional_quality(score: Option<i64>) -> Result<Option<Quality>> {
  score.filter(|s| *s >= 0).map(Quality::try_from).transpose()
}

fn summaries(nodes: &[MoveNode]) -> Vec<MoveSummary> {
  nodes.iter().map(MoveNode::summary).collect()
}
