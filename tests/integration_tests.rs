use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use voicebook::config::AppConfig;
use voicebook::db;
use voicebook::handlers;
use voicebook::services::directory::ProviderDirectory;
use voicebook::state::AppState;
use voicebook::store::memory::MemoryStore;
use voicebook::store::{CreditStore, StoreError};

const DR_SMITH: &str = "550e8400-e29b-41d4-a716-446655440001";

// ── Mock Stores ──

/// Credit store that never answers in time.
struct SlowCredits;

#[async_trait]
impl CreditStore for SlowCredits {
    async fn get(&self, _user_id: &str) -> Result<Option<i64>, StoreError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Some(10))
    }

    async fn put(&self, _user_id: &str, _balance: i64) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

/// Credit store that reads fine but refuses every write.
struct ReadOnlyCredits;

#[async_trait]
impl CreditStore for ReadOnlyCredits {
    async fn get(&self, _user_id: &str) -> Result<Option<i64>, StoreError> {
        Ok(Some(5))
    }

    async fn put(&self, _user_id: &str, _balance: i64) -> Result<(), StoreError> {
        Err(StoreError::Backend(anyhow::anyhow!("ledger is read-only")))
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        store_timeout: Duration::from_millis(100),
        read_retries: 2,
        ..AppConfig::default()
    }
}

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(test_config(), ProviderDirectory::builtin()))
}

fn sqlite_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState::sqlite(test_config(), ProviderDirectory::builtin(), conn))
}

fn state_with_credits(credits: Arc<dyn CreditStore>) -> Arc<AppState> {
    let store = Arc::new(MemoryStore::new());
    Arc::new(AppState::new(
        test_config(),
        ProviderDirectory::builtin(),
        credits,
        store.clone(),
        store,
    ))
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn appointment_body(start: &str) -> serde_json::Value {
    serde_json::json!({
        "user_id": "user-1",
        "provider_id": DR_SMITH,
        "appointment_date": "2030-01-07",
        "start_time": start,
        "end_time": "17:00",
    })
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, json) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

// ── Credits ──

#[tokio::test]
async fn test_credits_seeded_with_default() {
    let state = test_state();
    let (status, json) = send(&state, get("/api/credits?userId=new-user")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["credits"], 10);
}

#[tokio::test]
async fn test_credits_require_user_id() {
    let state = test_state();
    let (status, json) = send(&state, get("/api/credits")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "User ID required");
}

#[tokio::test]
async fn test_credit_actions() {
    let state = test_state();

    let (_, json) = send(
        &state,
        json_post("/api/credits", serde_json::json!({"userId": "u1", "action": "add", "amount": 5})),
    )
    .await;
    assert_eq!(json["credits"], 15);

    let (_, json) = send(
        &state,
        json_post("/api/credits", serde_json::json!({"userId": "u1", "action": "deduct"})),
    )
    .await;
    assert_eq!(json["credits"], 14);

    let (_, json) = send(
        &state,
        json_post(
            "/api/credits",
            serde_json::json!({"userId": "u1", "action": "deduct", "amount": 100}),
        ),
    )
    .await;
    assert_eq!(json["credits"], 0);

    let (status, json) = send(
        &state,
        json_post("/api/credits", serde_json::json!({"userId": "u1", "action": "set", "amount": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["credits"], 3);

    let (status, json) = send(
        &state,
        json_post("/api/credits", serde_json::json!({"userId": "u1", "action": "steal"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid action");
}

#[tokio::test]
async fn test_credit_plans_and_purchase() {
    let state = test_state();

    let (status, json) = send(&state, get("/api/credits/plans")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["plans"].as_array().unwrap().len(), 3);

    let (status, json) = send(
        &state,
        json_post(
            "/api/credits/purchase",
            serde_json::json!({"userId": "u1", "planId": "starter"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["credits"], 35);

    let (status, _) = send(
        &state,
        json_post(
            "/api/credits/purchase",
            serde_json::json!({"userId": "u1", "planId": "gold"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_timeout_is_service_unavailable() {
    let state = state_with_credits(Arc::new(SlowCredits));
    let (status, json) = send(&state, get("/api/credits?userId=u1")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].as_str().unwrap().contains("unavailable"));
}

// ── Appointments ──

#[tokio::test]
async fn test_create_appointment() {
    let state = test_state();
    let (status, json) = send(&state, json_post("/api/appointments", appointment_body("09:00"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let appointment = &json["appointment"];
    assert_eq!(appointment["status"], "scheduled");
    assert_eq!(appointment["service_type"], "consultation");
    assert_eq!(appointment["notes"], "Voice booking");
    assert_eq!(appointment["booking_method"], "direct");
    assert_eq!(appointment["start_time"], "09:00");
    assert_eq!(appointment["provider"]["name"], "Dr. Alex Smith");
    assert!(appointment["id"].as_str().unwrap().starts_with("apt-"));
}

#[tokio::test]
async fn test_create_appointment_ids_unique() {
    let state = test_state();
    let (_, first) = send(&state, json_post("/api/appointments", appointment_body("09:00"))).await;
    let (_, second) = send(&state, json_post("/api/appointments", appointment_body("10:00"))).await;
    assert_ne!(first["appointment"]["id"], second["appointment"]["id"]);
}

#[tokio::test]
async fn test_create_appointment_missing_field() {
    let state = test_state();
    for field in ["user_id", "provider_id", "appointment_date", "start_time", "end_time"] {
        let mut body = appointment_body("09:00");
        body.as_object_mut().unwrap().remove(field);
        let (status, json) = send(&state, json_post("/api/appointments", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], format!("Missing {field}"));
    }
}

#[tokio::test]
async fn test_create_appointment_unknown_provider() {
    let state = test_state();
    let mut body = appointment_body("09:00");
    body["provider_id"] = serde_json::json!("no-such-provider");
    let (status, _) = send(&state, json_post("/api/appointments", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_double_booking_rejected() {
    for state in [test_state(), sqlite_state()] {
        let (status, _) = send(&state, json_post("/api/appointments", appointment_body("09:00"))).await;
        assert_eq!(status, StatusCode::OK);

        let mut body = appointment_body("09:00");
        body["user_id"] = serde_json::json!("user-2");
        let (status, json) = send(&state, json_post("/api/appointments", body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "That time slot is already booked");
    }
}

#[tokio::test]
async fn test_list_appointments_filtered_and_sorted() {
    for state in [test_state(), sqlite_state()] {
        let mut later = appointment_body("09:00");
        later["appointment_date"] = serde_json::json!("2030-01-09");
        send(&state, json_post("/api/appointments", later)).await;
        send(&state, json_post("/api/appointments", appointment_body("14:00"))).await;
        send(&state, json_post("/api/appointments", appointment_body("09:00"))).await;

        let mut other = appointment_body("11:00");
        other["user_id"] = serde_json::json!("someone-else");
        send(&state, json_post("/api/appointments", other)).await;

        let (status, json) = send(&state, get("/api/appointments?userId=user-1")).await;
        assert_eq!(status, StatusCode::OK);
        let list = json["appointments"].as_array().unwrap();
        let order: Vec<(String, String)> = list
            .iter()
            .map(|a| {
                (
                    a["appointment_date"].as_str().unwrap().to_string(),
                    a["start_time"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("2030-01-07".to_string(), "09:00".to_string()),
                ("2030-01-07".to_string(), "14:00".to_string()),
                ("2030-01-09".to_string(), "09:00".to_string()),
            ]
        );
    }
}

// ── Voice Booking ──

#[tokio::test]
async fn test_voice_booking_requires_fields() {
    let state = test_state();
    let (status, json) = send(
        &state,
        json_post("/api/voice-booking", serde_json::json!({"userId": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Transcript and userId required");
}

#[tokio::test]
async fn test_voice_booking_lists_without_debit() {
    let state = test_state();
    let (status, json) = send(
        &state,
        json_post(
            "/api/voice-booking",
            serde_json::json!({"userId": "u1", "transcript": "I need a dentist appointment"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["bookingInfo"]["serviceType"], "dentist");
    assert_eq!(json["bookingInfo"]["urgency"], "normal");
    assert_eq!(json["remainingCredits"], 10);
    let slots = json["availableSlots"].as_array().unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0]["provider_name"], "Dr. Priya Patel");
    assert!(json.get("notice").is_none());

    let (_, json) = send(&state, get("/api/credits?userId=u1")).await;
    assert_eq!(json["credits"], 10);

    let (_, json) = send(&state, get("/api/voice-booking/session?userId=u1")).await;
    assert_eq!(json["state"], "confirming");
    assert_eq!(json["presentedSlots"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_voice_booking_no_providers() {
    let state = test_state();
    let (status, json) = send(
        &state,
        json_post(
            "/api/voice-booking",
            serde_json::json!({"userId": "u1", "transcript": "find me a business consultant"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bookingInfo"]["serviceType"], "consultant");
    assert_eq!(json["availableSlots"].as_array().unwrap().len(), 0);
    assert_eq!(json["notice"], "No providers found for consultant");
}

#[tokio::test]
async fn test_voice_booking_payment_required() {
    let state = test_state();
    send(
        &state,
        json_post("/api/credits", serde_json::json!({"userId": "u1", "action": "set", "amount": 0})),
    )
    .await;

    let (status, json) = send(
        &state,
        json_post(
            "/api/voice-booking",
            serde_json::json!({"userId": "u1", "transcript": "doctor please"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(json["error"], "Insufficient credits");
}

#[tokio::test]
async fn test_voice_booking_end_to_end() {
    for state in [test_state(), sqlite_state()] {
        send(
            &state,
            json_post("/api/credits", serde_json::json!({"userId": "u1", "action": "set", "amount": 1})),
        )
        .await;

        let (_, offer) = send(
            &state,
            json_post(
                "/api/voice-booking",
                serde_json::json!({"userId": "u1", "transcript": "urgent, I need a doctor"}),
            ),
        )
        .await;
        assert_eq!(offer["bookingInfo"]["urgency"], "high");
        let chosen = offer["availableSlots"][1].clone();

        let (status, json) = send(
            &state,
            json_post(
                "/api/voice-booking/confirm",
                serde_json::json!({"userId": "u1", "slotIndex": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["remainingCredits"], 0);
        assert_eq!(json["appointment"]["booking_method"], "voice");
        assert_eq!(json["appointment"]["provider_id"], chosen["provider_id"]);
        assert_eq!(json["appointment"]["start_time"], chosen["start_time"]);

        let (_, json) = send(&state, get("/api/appointments?userId=u1")).await;
        assert_eq!(json["appointments"].as_array().unwrap().len(), 1);

        let (status, _) = send(
            &state,
            json_post(
                "/api/voice-booking",
                serde_json::json!({"userId": "u1", "transcript": "another doctor visit"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    }
}

#[tokio::test]
async fn test_confirm_taken_slot_returns_conflict_report() {
    for state in [test_state(), sqlite_state()] {
        let (_, offer) = send(
            &state,
            json_post(
                "/api/voice-booking",
                serde_json::json!({"userId": "u1", "transcript": "I need a doctor"}),
            ),
        )
        .await;
        let chosen = offer["availableSlots"][0].clone();

        let (status, _) = send(
            &state,
            json_post(
                "/api/appointments",
                serde_json::json!({
                    "user_id": "u2",
                    "provider_id": chosen["provider_id"],
                    "appointment_date": chosen["date"],
                    "start_time": chosen["start_time"],
                    "end_time": chosen["end_time"],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            &state,
            json_post(
                "/api/voice-booking/confirm",
                serde_json::json!({"userId": "u1", "slotIndex": 0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "That time slot is already booked");
        assert_eq!(json["conflict"]["conflictType"], "scheduling_conflict");
        assert_eq!(
            json["conflict"]["suggestedActions"][0],
            "Suggest alternative time slots"
        );

        let (_, json) = send(&state, get("/api/credits?userId=u1")).await;
        assert_eq!(json["credits"], 10);
    }
}

#[tokio::test]
async fn test_confirm_out_of_range_and_without_offer() {
    let state = test_state();

    let (status, _) = send(
        &state,
        json_post(
            "/api/voice-booking/confirm",
            serde_json::json!({"userId": "u1", "slotIndex": 0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(
        &state,
        json_post(
            "/api/voice-booking",
            serde_json::json!({"userId": "u1", "transcript": "doctor"}),
        ),
    )
    .await;

    for index in [3, -1] {
        let (status, _) = send(
            &state,
            json_post(
                "/api/voice-booking/confirm",
                serde_json::json!({"userId": "u1", "slotIndex": index}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (_, json) = send(&state, get("/api/voice-booking/session?userId=u1")).await;
    assert_eq!(json["state"], "confirming");
    let (_, json) = send(&state, get("/api/credits?userId=u1")).await;
    assert_eq!(json["credits"], 10);
}

#[tokio::test]
async fn test_confirm_with_idempotency_key_charges_once() {
    for state in [test_state(), sqlite_state()] {
        send(
            &state,
            json_post(
                "/api/voice-booking",
                serde_json::json!({"userId": "u1", "transcript": "hair appointment"}),
            ),
        )
        .await;

        let confirm = || {
            Request::builder()
                .method("POST")
                .uri("/api/voice-booking/confirm")
                .header("Content-Type", "application/json")
                .header("Idempotency-Key", "confirm-42")
                .body(Body::from(r#"{"userId":"u1","slotIndex":0}"#))
                .unwrap()
        };

        let (status, first) = send(&state, confirm()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["replayed"], false);

        let (status, second) = send(&state, confirm()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["replayed"], true);
        assert_eq!(first["appointment"]["id"], second["appointment"]["id"]);
        assert_eq!(second["remainingCredits"], 9);

        let (_, json) = send(&state, get("/api/credits?userId=u1")).await;
        assert_eq!(json["credits"], 9);
    }
}

#[tokio::test]
async fn test_failed_debit_removes_appointment() {
    let state = state_with_credits(Arc::new(ReadOnlyCredits));
    send(
        &state,
        json_post(
            "/api/voice-booking",
            serde_json::json!({"userId": "u1", "transcript": "doctor"}),
        ),
    )
    .await;

    let (status, json) = send(
        &state,
        json_post(
            "/api/voice-booking/confirm",
            serde_json::json!({"userId": "u1", "slotIndex": 0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "internal server error");

    let (_, json) = send(&state, get("/api/appointments?userId=u1")).await;
    assert!(json["appointments"].as_array().unwrap().is_empty());

    let (_, json) = send(&state, get("/api/voice-booking/session?userId=u1")).await;
    assert_eq!(json["state"], "error");
}

#[tokio::test]
async fn test_reset_session() {
    let state = test_state();
    send(
        &state,
        json_post(
            "/api/voice-booking",
            serde_json::json!({"userId": "u1", "transcript": "doctor"}),
        ),
    )
    .await;

    let (status, json) = send(
        &state,
        json_post("/api/voice-booking/reset", serde_json::json!({"userId": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "idle");

    let (_, json) = send(&state, get("/api/voice-booking/session?userId=u1")).await;
    assert_eq!(json["state"], "idle");
}

// ── Providers ──

#[tokio::test]
async fn test_list_providers() {
    let state = test_state();

    let (status, json) = send(&state, get("/api/providers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["providers"].as_array().unwrap().len(), 4);

    let (_, json) = send(&state, get("/api/providers?serviceType=doctor")).await;
    let doctors = json["providers"].as_array().unwrap();
    assert_eq!(doctors.len(), 2);
    assert_eq!(doctors[0]["working_hours"], "Mon: 09:00-17:00, Tue: 09:00-17:00, Wed: 09:00-17:00, Thu: 09:00-17:00, Fri: 09:00-17:00");

    let (status, _) = send(&state, get("/api/providers?serviceType=plumber")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
