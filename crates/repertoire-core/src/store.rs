//! The `MoveStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `repertoire-store-sqlite`, or [`crate::memory::MemoryStore`]). The engine
//! and the API depend on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::node::{Color, MoveId, MoveNode, NewMove, OwnerId, Schedule};

/// Result of [`MoveStore::delete_leaf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafDeletion {
  Deleted,
  HasChildren,
  Missing,
}

/// Abstraction over a persisted move forest.
///
/// Every listing returns nodes in ascending id order, which is also creation
/// order. Selection tie-breaks in the engine rely on that.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait MoveStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new node and return it with its assigned id.
  fn insert_move(
    &self,
    input: NewMove,
  ) -> impl Future<Output = Result<MoveNode, Self::Error>> + Send + '_;

  /// Retrieve a node by id. Returns `None` if not found.
  fn get_move(
    &self,
    id: MoveId,
  ) -> impl Future<Output = Result<Option<MoveNode>, Self::Error>> + Send + '_;

  /// Direct children of a node.
  fn children(
    &self,
    id: MoveId,
  ) -> impl Future<Output = Result<Vec<MoveNode>, Self::Error>> + Send + '_;

  /// Root nodes of an owner, optionally restricted to one perspective.
  fn roots(
    &self,
    owner: OwnerId,
    perspective: Option<Color>,
  ) -> impl Future<Output = Result<Vec<MoveNode>, Self::Error>> + Send + '_;

  /// Every node of an owner flagged as a book move.
  fn book_moves(
    &self,
    owner: OwnerId,
  ) -> impl Future<Output = Result<Vec<MoveNode>, Self::Error>> + Send + '_;

  /// Replace the schedule of a node with the one computed by `update`.
  ///
  /// Reading the node, calling `update` and writing the result happen as one
  /// unit. Returns the updated node, or `None` if `id` is unknown.
  fn update_schedule<F>(
    &self,
    id: MoveId,
    update: F,
  ) -> impl Future<Output = Result<Option<MoveNode>, Self::Error>> + Send + '_
  where
    F: FnOnce(&MoveNode) -> Schedule + Send + 'static;

  /// Delete `id` only if it has no children.
  ///
  /// The child check and the delete happen as one unit, so a continuation
  /// added concurrently either blocks the delete or is never orphaned.
  fn delete_leaf(
    &self,
    id: MoveId,
  ) -> impl Future<Output = Result<LeafDeletion, Self::Error>> + Send + '_;

  /// Delete the given nodes atomically and return how many were removed.
  ///
  /// Callers pass descendants before their ancestors.
  fn delete_moves(
    &self,
    ids: Vec<MoveId>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
