//! Order draft and confirmation endpoints.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use booking::{AgeCategory, Customer, DraftPatch, OrderDraft, OrderStore, SeatSelection};
use chrono::{DateTime, Utc};
use common::{SeatId, ShowId};
use serde::{Deserialize, Serialize};

use super::orders::OrderResponse;
use super::{AppState, owner_token, parse_hold_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct PutDraftRequest {
    pub show_id: String,
    /// Seat id to age category.
    pub seats: BTreeMap<String, String>,
    pub customer: Customer,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PatchDraftRequest {
    pub age_categories: BTreeMap<String, String>,
    pub customer: Option<Customer>,
    pub add_seats: BTreeMap<String, String>,
    pub remove_seats: Vec<String>,
}

impl PatchDraftRequest {
    fn into_patch(self) -> Result<DraftPatch, ApiError> {
        Ok(DraftPatch {
            age_categories: parse_categories(self.age_categories)?,
            customer: self.customer,
            add_seats: parse_categories(self.add_seats)?,
            remove_seats: self
                .remove_seats
                .into_iter()
                .map(SeatId::parse)
                .collect::<Result<BTreeSet<_>, _>>()?,
        })
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct DraftResponse {
    pub draft_id: String,
    pub hold_id: String,
    pub show_id: String,
    pub seats: Vec<LineResponse>,
    pub customer: Customer,
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct LineResponse {
    pub seat_id: String,
    pub age_category: AgeCategory,
    pub price_cents: i64,
}

impl LineResponse {
    pub(crate) fn from_selections(selections: &BTreeMap<SeatId, SeatSelection>) -> Vec<Self> {
        selections
            .iter()
            .map(|(id, selection)| Self {
                seat_id: id.to_string(),
                age_category: selection.age_category,
                price_cents: selection.price.cents(),
            })
            .collect()
    }
}

impl From<OrderDraft> for DraftResponse {
    fn from(draft: OrderDraft) -> Self {
        Self {
            draft_id: draft.draft_id.to_string(),
            hold_id: draft.hold_id.to_string(),
            show_id: draft.show_id.to_string(),
            seats: LineResponse::from_selections(&draft.seat_selections),
            customer: draft.customer,
            subtotal_cents: draft.subtotal.cents(),
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        }
    }
}

// -- Handlers --

/// PUT /drafts/{hold_id}: create or replace the draft for a hold.
#[tracing::instrument(skip(state, headers, req))]
pub async fn put<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<PutDraftRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    let owner = owner_token(&headers)?;
    let hold_id = parse_hold_id(&id)?;
    let show_id = ShowId::parse(req.show_id)?;
    let categories = parse_categories(req.seats)?;

    let draft = state
        .engine
        .create_draft(show_id, hold_id, &owner, categories, req.customer)
        .await?;
    Ok(Json(draft.into()))
}

/// PATCH /drafts/{hold_id}: change categories, customer or seats.
#[tracing::instrument(skip(state, headers, req))]
pub async fn patch<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<PatchDraftRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    let owner = owner_token(&headers)?;
    let draft_id = parse_hold_id(&id)?;
    let patch = req.into_patch()?;

    let draft = state.engine.update_draft(draft_id, &owner, patch).await?;
    Ok(Json(draft.into()))
}

/// GET /drafts/{hold_id}
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DraftResponse>, ApiError> {
    let owner = owner_token(&headers)?;
    let draft = state.engine.get_draft(parse_hold_id(&id)?, &owner).await?;
    Ok(Json(draft.into()))
}

/// POST /drafts/{hold_id}/confirm: book the draft's seats. Safe to retry.
#[tracing::instrument(skip(state, headers))]
pub async fn confirm<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<OrderResponse>, ApiError> {
    let owner = owner_token(&headers)?;
    let order = state.engine.confirm(parse_hold_id(&id)?, &owner).await?;
    Ok(Json(order.into()))
}

/// Parses category names strictly; unknown names are rejected, not defaulted.
fn parse_categories(
    raw: BTreeMap<String, String>,
) -> Result<BTreeMap<SeatId, AgeCategory>, ApiError> {
    raw.into_iter()
        .map(|(seat, category)| -> Result<(SeatId, AgeCategory), ApiError> {
            Ok((SeatId::parse(seat)?, category.parse()?))
        })
        .collect()
}
