//! Confirmed order lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use booking::{ConfirmedOrder, Customer, OrderStore};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::drafts::LineResponse;
use super::{AppState, parse_hold_id};
use crate::error::ApiError;

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub confirmation_code: String,
    pub show_id: String,
    pub seats: Vec<String>,
    pub lines: Vec<LineResponse>,
    pub customer: Customer,
    pub subtotal_cents: i64,
    pub confirmed_at: DateTime<Utc>,
}

impl From<ConfirmedOrder> for OrderResponse {
    fn from(order: ConfirmedOrder) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            confirmation_code: order.confirmation_code,
            show_id: order.show_id.to_string(),
            seats: order.seats.iter().map(ToString::to_string).collect(),
            lines: LineResponse::from_selections(&order.lines),
            customer: order.customer,
            subtotal_cents: order.subtotal.cents(),
            confirmed_at: order.confirmed_at,
        }
    }
}

/// GET /orders/{order_id}
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.get_order(parse_hold_id(&id)?).await?;
    Ok(Json(order.into()))
}
