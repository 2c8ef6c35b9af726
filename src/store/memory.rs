use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{AppointmentStore, CreditStore, PatternStore, StoreError};
use crate::models::{Appointment, PatternKind, SlotKey, UserPattern};

struct StoredAppointment {
    appointment: Appointment,
    idempotency_key: Option<String>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    credits: Mutex<HashMap<String, i64>>,
    appointments: Mutex<Vec<StoredAppointment>>,
    patterns: Mutex<HashMap<(String, PatternKind), UserPattern>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory store lock poisoned")))
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<i64>, StoreError> {
        Ok(lock(&self.credits)?.get(user_id).copied())
    }

    async fn put(&self, user_id: &str, balance: i64) -> Result<(), StoreError> {
        lock(&self.credits)?.insert(user_id.to_string(), balance);
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn insert(
        &self,
        appointment: &Appointment,
        idempotency_key: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut appointments = lock(&self.appointments)?;
        let key = appointment.slot_key();
        if appointments.iter().any(|s| s.appointment.slot_key() == key) {
            return Err(StoreError::SlotTaken);
        }
        appointments.push(StoredAppointment {
            appointment: appointment.clone(),
            idempotency_key: idempotency_key.map(str::to_string),
        });
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut appointments = lock(&self.appointments)?;
        let before = appointments.len();
        appointments.retain(|s| s.appointment.id != id);
        Ok(appointments.len() != before)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Appointment>, StoreError> {
        let mut result: Vec<Appointment> = lock(&self.appointments)?
            .iter()
            .filter(|s| s.appointment.user_id == user_id)
            .map(|s| s.appointment.clone())
            .collect();
        result.sort_by_key(|a| (a.appointment_date, a.start_time));
        Ok(result)
    }

    async fn booked_slots(
        &self,
        provider_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SlotKey>, StoreError> {
        Ok(lock(&self.appointments)?
            .iter()
            .map(|s| &s.appointment)
            .filter(|a| provider_ids.contains(&a.provider_id))
            .filter(|a| a.appointment_date >= from && a.appointment_date <= to)
            .map(Appointment::slot_key)
            .collect())
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(lock(&self.appointments)?
            .iter()
            .find(|s| s.appointment.user_id == user_id && s.idempotency_key.as_deref() == Some(key))
            .map(|s| s.appointment.clone()))
    }
}

#[async_trait]
impl PatternStore for MemoryStore {
    async fn get(
        &self,
        user_id: &str,
        kind: PatternKind,
    ) -> Result<Option<UserPattern>, StoreError> {
        Ok(lock(&self.patterns)?
            .get(&(user_id.to_string(), kind))
            .cloned())
    }

    async fn put(&self, pattern: &UserPattern) -> Result<(), StoreError> {
        lock(&self.patterns)?.insert(
            (pattern.user_id.clone(), pattern.pattern_type),
            pattern.clone(),
        );
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserPattern>, StoreError> {
        let mut result: Vec<UserPattern> = lock(&self.patterns)?
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));
        Ok(result)
    }
}
