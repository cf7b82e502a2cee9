//! The spaced-repetition seam.
//!
//! A [`Scheduler`] maps a recall [`Quality`] and the prior scheduling state of
//! a node to its next state. The engine decides *when* to call it and how the
//! result is stored; the formula itself is swappable.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::{Error, Result};

/// Upper bound on a persisted review interval.
pub const MAX_INTERVAL_DAYS: u32 = 365;

// ─── Quality ─────────────────────────────────────────────────────────────────

/// Recall performance from 0 (total blackout) to 5 (perfect recall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Quality(u8);

impl Quality {
  pub const BLACKOUT: Self = Self(0);
  pub const PERFECT: Self = Self(5);

  pub fn value(self) -> u8 { self.0 }
}

impl TryFrom<i64> for Quality {
  type Error = Error;

  fn try_from(raw: i64) -> Result<Self> {
    match u8::try_from(raw) {
      Ok(q) if q <= Self::PERFECT.0 => Ok(Self(q)),
      _ => Err(Error::invalid(
        "score",
        format!("expected an integer from 0 to 5, got {raw}"),
      )),
    }
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// The three values carried forward from a node's previous review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorState {
  pub interval_days:    u32,
  pub repetition_count: u32,
  pub easiness_factor:  f64,
}

/// Output of a [`Scheduler`]. The engine stores it verbatim apart from
/// clamping `interval_days` to [`MAX_INTERVAL_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleUpdate {
  pub interval_days:    u32,
  pub repetition_count: u32,
  pub easiness_factor:  f64,
  pub next_review_at:   NaiveDate,
}

/// A pure spaced-repetition formula.
///
/// `prior` is `None` for a node that has never been reviewed ("first visit").
pub trait Scheduler: Send + Sync {
  fn score(
    &self,
    quality: Quality,
    prior: Option<PriorState>,
    today: NaiveDate,
  ) -> ScheduleUpdate;
}

impl<T: Scheduler + ?Sized> Scheduler for std::sync::Arc<T> {
  fn score(
    &self,
    quality: Quality,
    prior: Option<PriorState>,
    today: NaiveDate,
  ) -> ScheduleUpdate {
    (**self).score(quality, prior, today)
  }
}

// ─── SM-2 ────────────────────────────────────────────────────────────────────

/// The SuperMemo-2 algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sm2;

impl Sm2 {
  pub const INITIAL_EASINESS: f64 = 2.5;
  pub const MIN_EASINESS: f64 = 1.3;
}

impl Scheduler for Sm2 {
  fn score(
    &self,
    quality: Quality,
    prior: Option<PriorState>,
    today: NaiveDate,
  ) -> ScheduleUpdate {
    let prior = prior.unwrap_or(PriorState {
      interval_days:    0,
      repetition_count: 0,
      easiness_factor:  Self::INITIAL_EASINESS,
    });
    let q = f64::from(quality.value());

    let (interval_days, repetition_count) = if quality.value() >= 3 {
      let interval = match prior.repetition_count {
        0 => 1,
        1 => 6,
        _ => (f64::from(prior.interval_days) * prior.easiness_factor).round()
          as u32,
      };
      (interval, prior.repetition_count + 1)
    } else {
      (1, 0)
    };

    let easiness_factor = (prior.easiness_factor + 0.1
      - (5.0 - q) * (0.08 + (5.0 - q) * 0.02))
      .max(Self::MIN_EASINESS);

    let next_review_at = today
      .checked_add_days(Days::new(u64::from(interval_days)))
      .unwrap_or(NaiveDate::MAX);

    ScheduleUpdate {
      interval_days,
      repetition_count,
      easiness_factor,
      next_review_at,
    }
  }
}
