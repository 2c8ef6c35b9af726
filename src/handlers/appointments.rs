use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{required, UserQuery};
use crate::errors::AppError;
use crate::models::Appointment;
use crate::services::booking::{self, NewAppointment};
use crate::state::AppState;

// POST /api/appointments
#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub user_id: Option<String>,
    pub provider_id: Option<String>,
    pub appointment_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub service_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    success: bool,
    appointment: Appointment,
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    let user_id = required(body.user_id, "Missing user_id")?;
    let provider_id = required(body.provider_id, "Missing provider_id")?;
    let appointment_date = required(body.appointment_date, "Missing appointment_date")?;
    let start_time = required(body.start_time, "Missing start_time")?;
    let end_time = required(body.end_time, "Missing end_time")?;

    let request = NewAppointment {
        user_id,
        provider_id,
        appointment_date: parse_date(&appointment_date)?,
        start_time: parse_time("start_time", &start_time)?,
        end_time: parse_time("end_time", &end_time)?,
        service_type: body.service_type,
        notes: body.notes,
    };

    let appointment = booking::create_appointment(&state, request).await?;

    Ok(Json(AppointmentResponse {
        success: true,
        appointment,
    }))
}

// GET /api/appointments?userId=
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = required(query.user_id, "User ID required")?;
    let appointments = booking::list_appointments(&state, &user_id).await?;
    Ok(Json(serde_json::json!({"appointments": appointments})))
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid appointment_date: {value}")))
}

/// Accepts `HH:MM` and `HH:MM:SS`.
fn parse_time(field: &str, value: &str) -> Result<NaiveTime, AppError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("Invalid {field}: {value}")))
}
