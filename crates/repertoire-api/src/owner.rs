//! Caller identity.
//!
//! Authentication happens upstream; the request layer in front of this API
//! forwards the authenticated user as a UUID in the [`OWNER_HEADER`] header.

use axum::{extract::FromRequestParts, http::request::Parts};
use repertoire_core::node::OwnerId;
use uuid::Uuid;

use crate::error::ApiError;

pub const OWNER_HEADER: &str = "x-owner-id";

/// The owner every move in the request is scoped to.
#[derive(Debug, Clone, Copy)]
pub struct Owner(pub OwnerId);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(OWNER_HEADER)
      .and_then(|v| v.to_str().ok())
      .ok_or_else(|| ApiError::Unauthorized(format!("missing {OWNER_HEADER} header")))?;

    Uuid::parse_str(raw.trim())
      .map(Owner)
      .map_err(|_| ApiError::Unauthorized(format!("malformed {OWNER_HEADER} header")))
  }
}
