//! Learns per-user time and service preferences from completed bookings.

use std::time::Duration;

use chrono::{Timelike, Utc};
use serde_json::json;

use crate::models::{Appointment, PatternKind, ServiceCategory, UserPattern};
use crate::store::{bounded, retry_read, PatternStore, StoreError};

const INITIAL_CONFIDENCE: f64 = 0.7;
const CONFIDENCE_STEP: f64 = 0.05;
const MAX_CONFIDENCE: f64 = 0.99;

/// Upserts one observation. A first observation seeds the pattern; later
/// ones raise confidence and replace `data`.
pub async fn record_observation(
    store: &dyn PatternStore,
    timeout: Duration,
    user_id: &str,
    kind: PatternKind,
    data: serde_json::Value,
) -> Result<UserPattern, StoreError> {
    let now = Utc::now().naive_utc();
    let existing = bounded(timeout, store.get(user_id, kind)).await?;

    let pattern = match existing {
        Some(prev) => UserPattern {
            pattern_data: data,
            confidence_score: (prev.confidence_score + CONFIDENCE_STEP).min(MAX_CONFIDENCE),
            usage_count: prev.usage_count + 1,
            last_used: now,
            ..prev
        },
        None => UserPattern {
            user_id: user_id.to_string(),
            pattern_type: kind,
            pattern_data: data,
            confidence_score: INITIAL_CONFIDENCE,
            usage_count: 1,
            last_used: now,
        },
    };

    bounded(timeout, store.put(&pattern)).await?;
    tracing::debug!(
        user_id,
        pattern = kind.as_str(),
        confidence = pattern.confidence_score,
        "pattern updated"
    );
    Ok(pattern)
}

/// Records the booked start hour and service category.
pub async fn record_booking(
    store: &dyn PatternStore,
    timeout: Duration,
    appointment: &Appointment,
    service: ServiceCategory,
) -> Result<(), StoreError> {
    let user_id = appointment.user_id.as_str();

    let mut hours = bounded(timeout, store.get(user_id, PatternKind::TimePreference))
        .await?
        .map(|p| p.preferred_hours())
        .unwrap_or_default();
    hours.push(appointment.start_time.hour());
    hours.sort_unstable();
    hours.dedup();

    record_observation(
        store,
        timeout,
        user_id,
        PatternKind::TimePreference,
        json!({ "preferred_hours": hours }),
    )
    .await?;

    record_observation(
        store,
        timeout,
        user_id,
        PatternKind::ServicePreference,
        json!({ "preferred_service": service.as_str() }),
    )
    .await?;

    Ok(())
}

/// A user's patterns, highest confidence first.
pub async fn patterns_for(
    store: &dyn PatternStore,
    timeout: Duration,
    read_retries: u32,
    user_id: &str,
) -> Result<Vec<UserPattern>, StoreError> {
    retry_read(read_retries, timeout, || store.list_for_user(user_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, BookingMethod, ProviderSummary};
    use crate::store::memory::MemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn appointment(hour: u32) -> Appointment {
        Appointment {
            id: Appointment::new_id(),
            user_id: "u1".to_string(),
            provider_id: "p1".to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap(),
            status: AppointmentStatus::Scheduled,
            service_type: "consultation".to_string(),
            notes: "Voice booking".to_string(),
            booking_method: BookingMethod::Voice,
            created_at: Utc::now().naive_utc(),
            provider: ProviderSummary {
                name: "Dr. Test".to_string(),
                location: "Clinic".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_first_observation_seeds_pattern() {
        let store = MemoryStore::new();
        let p = record_observation(
            &store,
            TIMEOUT,
            "u1",
            PatternKind::ServicePreference,
            json!({"preferred_service": "dentist"}),
        )
        .await
        .unwrap();
        assert_eq!(p.confidence_score, 0.7);
        assert_eq!(p.usage_count, 1);
    }

    #[tokio::test]
    async fn test_confidence_grows_and_caps() {
        let store = MemoryStore::new();
        let mut last = None;
        for _ in 0..20 {
            last = Some(
                record_observation(
                    &store,
                    TIMEOUT,
                    "u1",
                    PatternKind::ServicePreference,
                    json!({"preferred_service": "doctor"}),
                )
                .await
                .unwrap(),
            );
        }
        let p = last.unwrap();
        assert_eq!(p.usage_count, 20);
        assert!(p.confidence_score <= 0.99);
        assert!((p.confidence_score - 0.99).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_second_observation_adds_step() {
        let store = MemoryStore::new();
        for _ in 0..2 {
            record_observation(&store, TIMEOUT, "u1", PatternKind::TimePreference, json!({}))
                .await
                .unwrap();
        }
        let p = store.get("u1", PatternKind::TimePreference).await.unwrap().unwrap();
        assert!((p.confidence_score - 0.75).abs() < 1e-9);
        assert_eq!(p.usage_count, 2);
    }

    #[tokio::test]
    async fn test_record_booking_merges_hours() {
        let store = MemoryStore::new();
        record_booking(&store, TIMEOUT, &appointment(14), ServiceCategory::Dentist)
            .await
            .unwrap();
        record_booking(&store, TIMEOUT, &appointment(9), ServiceCategory::Dentist)
            .await
            .unwrap();
        record_booking(&store, TIMEOUT, &appointment(14), ServiceCategory::Dentist)
            .await
            .unwrap();

        let time = store.get("u1", PatternKind::TimePreference).await.unwrap().unwrap();
        assert_eq!(time.preferred_hours(), vec![9, 14]);

        let service = store
            .get("u1", PatternKind::ServicePreference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(service.preferred_service(), Some(ServiceCategory::Dentist));
        assert_eq!(service.usage_count, 3);

        let all = patterns_for(&store, TIMEOUT, 1, "u1").await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
