use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;

use super::{AppointmentStore, CreditStore, PatternStore, StoreError};
use crate::db::queries;
use crate::models::{Appointment, PatternKind, SlotKey, UserPattern};

/// SQLite-backed store sharing one connection behind a mutex.
///
/// Queries run on the blocking pool so a caller's deadline can fire while
/// SQLite waits on a locked database.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| StoreError::Backend(anyhow::anyhow!("database lock poisoned")))?;
            op(&*conn)
        })
        .await
        .map_err(|e| StoreError::Backend(anyhow::anyhow!("database task failed: {e}")))?
    }
}

/// Keeps the SQLite error visible so busy/locked failures stay retryable.
fn store_error(err: anyhow::Error) -> StoreError {
    match err.downcast::<rusqlite::Error>() {
        Ok(e) => StoreError::Database(e),
        Err(e) => StoreError::Backend(e),
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl CreditStore for SqliteStore {
    async fn get(&self, user_id: &str) -> Result<Option<i64>, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| queries::get_credits(conn, &user_id).map_err(store_error))
            .await
    }

    async fn put(&self, user_id: &str, balance: i64) -> Result<(), StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| queries::set_credits(conn, &user_id, balance).map_err(store_error))
            .await
    }
}

#[async_trait]
impl AppointmentStore for SqliteStore {
    async fn insert(
        &self,
        appointment: &Appointment,
        idempotency_key: Option<&str>,
    ) -> Result<(), StoreError> {
        let appointment = appointment.clone();
        let key = idempotency_key.map(str::to_string);
        self.run(move |conn| {
            queries::create_appointment(conn, &appointment, key.as_deref()).map_err(|e| {
                if is_constraint_violation(&e) {
                    StoreError::SlotTaken
                } else {
                    StoreError::Database(e)
                }
            })
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |conn| queries::delete_appointment(conn, &id).map_err(store_error))
            .await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Appointment>, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| {
            queries::get_appointments_for_user(conn, &user_id).map_err(store_error)
        })
        .await
    }

    async fn booked_slots(
        &self,
        provider_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SlotKey>, StoreError> {
        let provider_ids = provider_ids.to_vec();
        self.run(move |conn| {
            queries::get_booked_slots(conn, &provider_ids, from, to).map_err(store_error)
        })
        .await
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Appointment>, StoreError> {
        let user_id = user_id.to_string();
        let key = key.to_string();
        self.run(move |conn| {
            queries::get_appointment_by_idempotency_key(conn, &user_id, &key).map_err(store_error)
        })
        .await
    }
}

#[async_trait]
impl PatternStore for SqliteStore {
    async fn get(
        &self,
        user_id: &str,
        kind: PatternKind,
    ) -> Result<Option<UserPattern>, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| queries::get_pattern(conn, &user_id, kind).map_err(store_error))
            .await
    }

    async fn put(&self, pattern: &UserPattern) -> Result<(), StoreError> {
        let pattern = pattern.clone();
        self.run(move |conn| queries::save_pattern(conn, &pattern).map_err(store_error))
            .await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserPattern>, StoreError> {
        let user_id = user_id.to_string();
        self.run(move |conn| queries::get_patterns_for_user(conn, &user_id).map_err(store_error))
            .await
    }
}
