pub mod appointments;
pub mod credits;
pub mod health;
pub mod providers;
pub mod voice_booking;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/voice-booking", post(voice_booking::create_booking))
        .route("/api/voice-booking/confirm", post(voice_booking::confirm_booking))
        .route("/api/voice-booking/reset", post(voice_booking::reset_booking))
        .route("/api/voice-booking/session", get(voice_booking::get_session))
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/api/credits",
            get(credits::get_credits).post(credits::update_credits),
        )
        .route("/api/credits/plans", get(credits::list_plans))
        .route("/api/credits/purchase", post(credits::purchase_plan))
        .route("/api/providers", get(providers::list_providers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `?userId=` on read endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

/// Present and non-blank, or a validation error carrying `message`.
pub(crate) fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}
