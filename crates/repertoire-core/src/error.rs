//! Error types for `repertoire-core`.

use thiserror::Error;

use crate::node::MoveId;

#[derive(Debug, Error)]
pub enum Error {
  /// One or more required input fields were absent or blank. The list keeps
  /// the order in which the fields are declared on the request.
  #[error("missing required fields: {}", .0.join(", "))]
  MissingFields(Vec<&'static str>),

  #[error("invalid {field}: {reason}")]
  Invalid {
    field:  &'static str,
    reason: String,
  },

  /// The move does not exist or belongs to another owner.
  #[error("move not found: {0}")]
  MoveNotFound(MoveId),

  #[error("move {0} has continuations; prune the subtree instead")]
  HasChildren(MoveId),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Invalid { field, reason: reason.into() }
  }

  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether this error stems from caller input rather than store state.
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::MissingFields(_) | Self::Invalid { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
