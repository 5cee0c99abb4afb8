//! Show registration and seat map endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::{Availability, OrderStore, Seat, SeatSpec};
use common::{Money, SeatId, ShowId};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterShowRequest {
    pub show_id: String,
    pub seats: Vec<SeatRequest>,
}

#[derive(Deserialize)]
pub struct SeatRequest {
    pub id: String,
    pub row: String,
    pub number: u32,
    pub base_price_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct ShowCreatedResponse {
    pub show_id: String,
    pub seat_count: usize,
}

#[derive(Serialize)]
pub struct SeatMapResponse {
    pub show_id: String,
    pub seats: Vec<SeatResponse>,
    pub availability: Availability,
}

#[derive(Serialize)]
pub struct SeatResponse {
    pub id: String,
    pub row: String,
    pub number: u32,
    pub status: String,
    pub base_price_cents: i64,
}

impl From<Seat> for SeatResponse {
    fn from(seat: Seat) -> Self {
        Self {
            id: seat.id.to_string(),
            row: seat.row,
            number: seat.number,
            status: seat.status.to_string(),
            base_price_cents: seat.base_price.cents(),
        }
    }
}

// -- Handlers --

/// POST /shows: lay out a show's seats, all available.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterShowRequest>,
) -> Result<(StatusCode, Json<ShowCreatedResponse>), ApiError> {
    let show_id = ShowId::parse(req.show_id)?;
    let seats = req
        .seats
        .into_iter()
        .map(|s| -> Result<SeatSpec, ApiError> {
            Ok(SeatSpec::new(
                SeatId::parse(s.id)?,
                s.row,
                s.number,
                Money::from_cents(s.base_price_cents),
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let seat_count = seats.len();

    state.engine.register_show(show_id.clone(), seats)?;

    Ok((
        StatusCode::CREATED,
        Json(ShowCreatedResponse {
            show_id: show_id.to_string(),
            seat_count,
        }),
    ))
}

/// GET /shows/{show_id}/seats: ordered seat snapshots with counts.
#[tracing::instrument(skip(state))]
pub async fn seats<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(show_id): Path<String>,
) -> Result<Json<SeatMapResponse>, ApiError> {
    let show_id = ShowId::parse(show_id)?;
    let seats = state.engine.get_seats(&show_id)?;
    let availability = Availability::tally(&seats);

    Ok(Json(SeatMapResponse {
        show_id: show_id.to_string(),
        seats: seats.into_iter().map(SeatResponse::from).collect(),
        availability,
    }))
}
