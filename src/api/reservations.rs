use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, validate_id};
use crate::auth::{AuthClient, Authenticated, HasAuthDelegate};
use crate::store::{Reservation, ReservationStore, StoreError, Update};

#[derive(Clone)]
pub struct ReservationsState {
    pub reservations: ReservationStore,
    pub auth: AuthClient,
}

impl HasAuthDelegate for ReservationsState {
    fn auth_client(&self) -> &AuthClient {
        &self.auth
    }
}

pub fn router(state: ReservationsState) -> Router {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", get(get_one).patch(update).delete(remove))
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateReservationRequest {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    place_id: String,
    invoice_id: Option<String>,
}

async fn create(
    State(state): State<ReservationsState>,
    Authenticated(identity): Authenticated,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.end <= payload.start {
        return Err(ApiError::bad_request("Reservation must end after it starts"));
    }
    if payload.place_id.trim().is_empty() {
        return Err(ApiError::bad_request("Place id cannot be empty"));
    }

    let created = state
        .reservations
        .create(Reservation {
            start: payload.start,
            end: payload.end,
            place_id: payload.place_id,
            invoice_id: payload.invoice_id,
            user_id: identity.id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn list(
    State(state): State<ReservationsState>,
    Authenticated(identity): Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let reservations = state.reservations.list_for_user(&identity.id).await?;
    Ok(Json(reservations))
}

async fn get_one(
    State(state): State<ReservationsState>,
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_id(&id)?;

    let reservation = state
        .reservations
        .get(&id, &identity.id)
        .await
        .map_err(not_found_as_missing_reservation)?;

    Ok(Json(reservation))
}

#[derive(Deserialize)]
struct UpdateReservationRequest {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    place_id: Option<String>,
    invoice_id: Option<String>,
}

async fn update(
    State(state): State<ReservationsState>,
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
    Json(payload): Json<UpdateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_id(&id)?;

    if let (Some(start), Some(end)) = (payload.start, payload.end) {
        if end <= start {
            return Err(ApiError::bad_request("Reservation must end after it starts"));
        }
    }
    if let Some(place_id) = &payload.place_id {
        if place_id.trim().is_empty() {
            return Err(ApiError::bad_request("Place id cannot be empty"));
        }
    }

    let mut update = Update::new();
    if let Some(start) = payload.start {
        update = update.set("start", json!(start));
    }
    if let Some(end) = payload.end {
        update = update.set("end", json!(end));
    }
    if let Some(place_id) = payload.place_id {
        update = update.set("place_id", json!(place_id));
    }
    if let Some(invoice_id) = payload.invoice_id {
        update = update.set("invoice_id", json!(invoice_id));
    }

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let updated = state
        .reservations
        .update(&id, &identity.id, &update)
        .await
        .map_err(not_found_as_missing_reservation)?;

    Ok(Json(updated))
}

async fn remove(
    State(state): State<ReservationsState>,
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_id(&id)?;

    state
        .reservations
        .delete(&id, &identity.id)
        .await
        .map_err(not_found_as_missing_reservation)?;

    Ok(StatusCode::NO_CONTENT)
}

fn not_found_as_missing_reservation(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::not_found("Reservation not found"),
        other => other.into(),
    }
}
