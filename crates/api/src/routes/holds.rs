//! Seat hold endpoints.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use booking::{Hold, OrderStore};
use chrono::{DateTime, Utc};
use common::{SeatId, ShowId};
use serde::{Deserialize, Serialize};

use super::{AppState, owner_token, parse_hold_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateHoldRequest {
    pub seat_ids: Vec<String>,
    pub ttl_secs: Option<u64>,
}

#[derive(Deserialize)]
pub struct ExtendHoldRequest {
    pub additional_ttl_secs: u64,
}

// -- Response types --

#[derive(Serialize)]
pub struct HoldResponse {
    pub hold_id: String,
    pub show_id: String,
    pub seat_ids: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Hold> for HoldResponse {
    fn from(hold: Hold) -> Self {
        Self {
            hold_id: hold.id.to_string(),
            show_id: hold.show_id.to_string(),
            seat_ids: hold.seat_ids.iter().map(ToString::to_string).collect(),
            status: hold.status.to_string(),
            created_at: hold.created_at,
            expires_at: hold.expires_at,
        }
    }
}

// -- Handlers --

/// POST /shows/{show_id}/holds: hold every requested seat or none.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(show_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateHoldRequest>,
) -> Result<(StatusCode, Json<HoldResponse>), ApiError> {
    let owner = owner_token(&headers)?;
    let show_id = ShowId::parse(show_id)?;
    let seat_ids = req
        .seat_ids
        .into_iter()
        .map(SeatId::parse)
        .collect::<Result<BTreeSet<_>, _>>()?;

    let hold = state
        .engine
        .create_hold(show_id, seat_ids, owner, req.ttl_secs.map(Duration::from_secs))
        .await?;

    Ok((StatusCode::CREATED, Json(hold.into())))
}

/// GET /holds/{hold_id}: current hold snapshot.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<HoldResponse>, ApiError> {
    let hold = state.engine.get_hold(parse_hold_id(&id)?).await?;
    Ok(Json(hold.into()))
}

/// POST /holds/{hold_id}/extend: push the deadline out.
#[tracing::instrument(skip(state, headers, req))]
pub async fn extend<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ExtendHoldRequest>,
) -> Result<Json<HoldResponse>, ApiError> {
    let owner = owner_token(&headers)?;
    let hold = state
        .engine
        .extend_hold(
            parse_hold_id(&id)?,
            &owner,
            Duration::from_secs(req.additional_ttl_secs),
        )
        .await?;
    Ok(Json(hold.into()))
}

/// DELETE /holds/{hold_id}: release the hold's seats.
#[tracing::instrument(skip(state, headers))]
pub async fn release<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<HoldResponse>, ApiError> {
    let owner = owner_token(&headers)?;
    let hold = state.engine.release_hold(parse_hold_id(&id)?, &owner).await?;
    Ok(Json(hold.into()))
}
