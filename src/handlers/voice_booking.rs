use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{required, UserQuery};
use crate::errors::AppError;
use crate::models::{Appointment, BookingInfo, PrioritizedSlot};
use crate::services::booking;
use crate::state::AppState;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

// POST /api/voice-booking
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceBookingRequest {
    pub transcript: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceBookingResponse {
    success: bool,
    booking_info: BookingInfo,
    available_slots: Vec<PrioritizedSlot>,
    ai_response: String,
    remaining_credits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VoiceBookingRequest>,
) -> Result<Json<VoiceBookingResponse>, AppError> {
    let message = "Transcript and userId required";
    let transcript = required(body.transcript, message)?;
    let user_id = required(body.user_id, message)?;

    let outcome = booking::process_transcript(&state, &user_id, &transcript).await?;

    Ok(Json(VoiceBookingResponse {
        success: true,
        booking_info: outcome.booking_info,
        available_slots: outcome.available_slots,
        ai_response: outcome.ai_response,
        remaining_credits: outcome.remaining_credits,
        notice: outcome.notice,
    }))
}

// POST /api/voice-booking/confirm
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub user_id: Option<String>,
    pub slot_index: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    success: bool,
    appointment: Appointment,
    ai_response: String,
    remaining_credits: i64,
    replayed: bool,
}

pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, AppError> {
    let user_id = required(body.user_id, "userId and slotIndex required")?;
    let slot_index = body
        .slot_index
        .ok_or_else(|| AppError::Validation("userId and slotIndex required".to_string()))?;
    let slot_index = usize::try_from(slot_index)
        .map_err(|_| AppError::Validation(format!("slot index {slot_index} is out of range")))?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let outcome =
        booking::confirm_selection(&state, &user_id, slot_index, idempotency_key).await?;

    Ok(Json(ConfirmResponse {
        success: true,
        appointment: outcome.appointment,
        ai_response: outcome.ai_response,
        remaining_credits: outcome.remaining_credits,
        replayed: outcome.replayed,
    }))
}

// POST /api/voice-booking/reset
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub user_id: Option<String>,
}

pub async fn reset_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = required(body.user_id, "User ID required")?;
    let session_state = booking::reset_session(&state, &user_id);
    Ok(Json(serde_json::json!({"success": true, "state": session_state})))
}

// GET /api/voice-booking/session?userId=
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    state: &'static str,
    presented_slots: Vec<PrioritizedSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    booking_info: Option<BookingInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    appointment: Option<Appointment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<SessionResponse>, AppError> {
    let user_id = required(query.user_id, "User ID required")?;
    let snapshot = booking::session_snapshot(&state, &user_id);

    Ok(Json(SessionResponse {
        state: snapshot.state,
        presented_slots: snapshot.presented_slots,
        booking_info: snapshot.booking_info,
        appointment: snapshot.appointment,
        error: snapshot.error,
    }))
}
