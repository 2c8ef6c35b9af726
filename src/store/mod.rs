//! Persistence ports for credits, appointments and learned patterns.
//!
//! Workflow code talks only to these traits. [`memory::MemoryStore`] backs
//! tests and demo runs; [`sqlite::SqliteStore`] is the default backend.

pub mod memory;
pub mod sqlite;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Appointment, PatternKind, SlotKey, UserPattern};

const READ_BACKOFF_MS: u64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("slot already booked")]
    SlotTaken,

    #[error("store call timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Failures worth retrying for idempotent reads.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Timeout => true,
            StoreError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<i64>, StoreError>;
    async fn put(&self, user_id: &str, balance: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Fails with [`StoreError::SlotTaken`] when the provider/date/start is
    /// already scheduled.
    async fn insert(
        &self,
        appointment: &Appointment,
        idempotency_key: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn remove(&self, id: &str) -> Result<bool, StoreError>;

    /// A user's appointments, date then start time ascending.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Appointment>, StoreError>;

    /// Booked slots for the given providers with dates in `[from, to]`.
    async fn booked_slots(
        &self,
        provider_ids: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SlotKey>, StoreError>;

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<Appointment>, StoreError>;
}

#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn get(
        &self,
        user_id: &str,
        kind: PatternKind,
    ) -> Result<Option<UserPattern>, StoreError>;

    async fn put(&self, pattern: &UserPattern) -> Result<(), StoreError>;

    /// Highest confidence first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserPattern>, StoreError>;
}

/// Runs a store call under a deadline.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StoreError::Timeout)?
}

/// Runs an idempotent read with a deadline per attempt, retrying transient
/// failures with doubling backoff.
pub async fn retry_read<T, F, Fut>(
    attempts: u32,
    limit: Duration,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = attempts.max(1);
    let mut delay = Duration::from_millis(READ_BACKOFF_MS);
    let mut attempt = 1;

    loop {
        match bounded(limit, op()).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_transient() => {
                tracing::warn!(attempt, error = %e, "store read failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
