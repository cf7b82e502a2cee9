//! [`MemoryStore`]: a process-local [`MoveStore`].
//!
//! Nodes live in an id-keyed map and are linked through an
//! `(owner, parent) → children` index, so no node holds a handle to another.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  convert::Infallible,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;

use crate::{
  node::{Color, MoveId, MoveNode, NewMove, OwnerId, Schedule},
  store::{LeafDeletion, MoveStore},
};

#[derive(Default)]
struct Inner {
  last_id:  MoveId,
  nodes:    BTreeMap<MoveId, MoveNode>,
  /// `parent == None` entries hold the roots of an owner.
  children: HashMap<(OwnerId, Option<MoveId>), BTreeSet<MoveId>>,
}

impl Inner {
  fn collect(&self, ids: Option<&BTreeSet<MoveId>>) -> Vec<MoveNode> {
    ids
      .into_iter()
      .flatten()
      .filter_map(|id| self.nodes.get(id).cloned())
      .collect()
  }

  fn has_children(&self, owner: OwnerId, id: MoveId) -> bool {
    self
      .children
      .get(&(owner, Some(id)))
      .is_some_and(|c| !c.is_empty())
  }

  fn remove(&mut self, id: MoveId) -> bool {
    let Some(node) = self.nodes.remove(&id) else { return false };
    let key = (node.owner_id, node.parent_id);
    if let Some(siblings) = self.children.get_mut(&key) {
      siblings.remove(&id);
      if siblings.is_empty() {
        self.children.remove(&key);
      }
    }
    self.children.remove(&(node.owner_id, Some(id)));
    true
  }
}

/// An in-memory move store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // Every mutation below completes before it can panic, so a poisoned
    // lock still guards consistent data.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl MoveStore for MemoryStore {
  type Error = Infallible;

  async fn insert_move(&self, input: NewMove) -> Result<MoveNode, Infallible> {
    let mut inner = self.lock();
    inner.last_id += 1;

    let node = MoveNode {
      id:           inner.last_id,
      owner_id:     input.owner_id,
      parent_id:    input.parent_id,
      fen:          input.fen,
      san:          input.san,
      perspective:  input.perspective,
      is_book_move: input.is_book_move,
      created_at:   Utc::now(),
      schedule:     None,
    };

    inner
      .children
      .entry((node.owner_id, node.parent_id))
      .or_default()
      .insert(node.id);
    inner.nodes.insert(node.id, node.clone());
    Ok(node)
  }

  async fn get_move(&self, id: MoveId) -> Result<Option<MoveNode>, Infallible> {
    Ok(self.lock().nodes.get(&id).cloned())
  }

  async fn children(&self, id: MoveId) -> Result<Vec<MoveNode>, Infallible> {
    let inner = self.lock();
    let Some(owner) = inner.nodes.get(&id).map(|n| n.owner_id) else {
      return Ok(Vec::new());
    };
    Ok(inner.collect(inner.children.get(&(owner, Some(id)))))
  }

  async fn roots(
    &self,
    owner: OwnerId,
    perspective: Option<Color>,
  ) -> Result<Vec<MoveNode>, Infallible> {
    let inner = self.lock();
    let mut roots = inner.collect(inner.children.get(&(owner, None)));
    if let Some(color) = perspective {
      roots.retain(|n| n.perspective == color);
    }
    Ok(roots)
  }

  async fn book_moves(&self, owner: OwnerId) -> Result<Vec<MoveNode>, Infallible> {
    Ok(
      self
        .lock()
        .nodes
        .values()
        .filter(|n| n.owner_id == owner && n.is_book_move)
        .cloned()
        .collect(),
    )
  }

  async fn update_schedule<F>(
    &self,
    id: MoveId,
    update: F,
  ) -> Result<Option<MoveNode>, Infallible>
  where
    F: FnOnce(&MoveNode) -> Schedule + Send + 'static,
  {
    let mut inner = self.lock();
    let Some(node) = inner.nodes.get_mut(&id) else {
      return Ok(None);
    };
    let schedule = update(node);
    node.schedule = Some(schedule);
    Ok(Some(node.clone()))
  }

  async fn delete_leaf(&self, id: MoveId) -> Result<LeafDeletion, Infallible> {
    let mut inner = self.lock();
    let Some(owner) = inner.nodes.get(&id).map(|n| n.owner_id) else {
      return Ok(LeafDeletion::Missing);
    };
    if inner.has_children(owner, id) {
      return Ok(LeafDeletion::HasChildren);
    }
    inner.remove(id);
    Ok(LeafDeletion::Deleted)
  }

  async fn delete_moves(&self, ids: Vec<MoveId>) -> Result<usize, Infallible> {
    let mut inner = self.lock();
    Ok(ids.into_iter().filter(|&id| inner.remove(id)).count())
  }
}
