//! Ranking helpers for sibling continuations and due reviews.
//!
//! Every helper keeps the first candidate on ties, so callers get a
//! deterministic answer as long as they pass candidates in store order.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::node::MoveNode;

/// Strength assigned to a node none of whose children have been reviewed.
///
/// Above any reachable easiness factor, so untried continuations rank behind
/// every line that has review data.
pub const UNTRIED_STRENGTH: f64 = 10.0;

/// Mean easiness over the reviewed nodes in `children`.
pub fn descendant_strength(children: &[MoveNode]) -> f64 {
  let (sum, count) = children
    .iter()
    .filter_map(MoveNode::easiness)
    .fold((0.0, 0u32), |(sum, count), e| (sum + e, count + 1));

  if count == 0 {
    UNTRIED_STRENGTH
  } else {
    sum / f64::from(count)
  }
}

/// The candidate with the lowest strength.
pub fn weakest<T>(candidates: impl IntoIterator<Item = (T, f64)>) -> Option<T> {
  candidates
    .into_iter()
    .fold(None, |best: Option<(T, f64)>, (item, strength)| match best {
      Some((_, lowest)) if strength.total_cmp(&lowest) != Ordering::Less => best,
      _ => Some((item, strength)),
    })
    .map(|(item, _)| item)
}

/// Review key: never-reviewed nodes sort before any real date.
fn due_key(node: &MoveNode) -> NaiveDate {
  node
    .schedule
    .as_ref()
    .map_or(NaiveDate::MIN, |s| s.next_review_at)
}

/// The node whose next review is soonest.
pub fn most_due(nodes: &[MoveNode]) -> Option<&MoveNode> {
  nodes.iter().fold(None, |best, node| match best {
    Some(b) if due_key(node) >= due_key(b) => Some(b),
    _ => Some(node),
  })
}
