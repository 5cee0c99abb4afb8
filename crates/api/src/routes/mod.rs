//! HTTP route handlers.

pub mod drafts;
pub mod health;
pub mod holds;
pub mod metrics;
pub mod orders;
pub mod shows;

use axum::http::HeaderMap;
use booking::{BookingEngine, OrderStore};
use common::{HoldId, OwnerToken};

use crate::error::ApiError;

/// Header carrying the caller's session token.
pub const OWNER_TOKEN_HEADER: &str = "x-owner-token";

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub engine: BookingEngine<S>,
}

/// Extracts the owner token from the request headers.
pub(crate) fn owner_token(headers: &HeaderMap) -> Result<OwnerToken, ApiError> {
    let value = headers
        .get(OWNER_TOKEN_HEADER)
        .ok_or_else(|| ApiError::BadRequest(format!("missing {OWNER_TOKEN_HEADER} header")))?
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("invalid {OWNER_TOKEN_HEADER} header")))?;
    Ok(OwnerToken::parse(value)?)
}

pub(crate) fn parse_hold_id(id: &str) -> Result<HoldId, ApiError> {
    Ok(HoldId::parse(id)?)
}
