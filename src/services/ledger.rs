use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use crate::store::{bounded, retry_read, CreditStore, StoreError};

type LockTable = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Per-user async mutexes. Holding a [`UserGuard`] serializes every balance
/// mutation and booking for that user. A user's entry is dropped again once
/// its last guard is released with nobody waiting.
#[derive(Default)]
pub struct UserLocks {
    locks: Arc<Mutex<LockTable>>,
}

pub struct UserGuard {
    user_id: String,
    table: Arc<Mutex<LockTable>>,
    guard: OwnedMutexGuard<()>,
}

impl UserGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        let mut locks = self.table.lock().unwrap_or_else(|e| e.into_inner());
        // One reference lives in the table and one in this guard.
        let idle = locks.get(&self.user_id).is_some_and(|lock| {
            Arc::ptr_eq(lock, OwnedMutexGuard::mutex(&self.guard)) && Arc::strong_count(lock) <= 2
        });
        if idle {
            locks.remove(&self.user_id);
        }
    }
}

impl UserLocks {
    pub async fn lock(&self, user_id: &str) -> UserGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        UserGuard {
            user_id: user_id.to_string(),
            table: Arc::clone(&self.locks),
            guard: lock.lock_owned().await,
        }
    }

    /// Users with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Credit balances over a [`CreditStore`]. Balances never go below zero.
pub struct CreditLedger {
    store: Arc<dyn CreditStore>,
    locks: Arc<UserLocks>,
    default_balance: i64,
    timeout: Duration,
    read_retries: u32,
}

impl CreditLedger {
    pub fn new(
        store: Arc<dyn CreditStore>,
        locks: Arc<UserLocks>,
        default_balance: i64,
        timeout: Duration,
        read_retries: u32,
    ) -> Self {
        Self {
            store,
            locks,
            default_balance: default_balance.max(0),
            timeout,
            read_retries,
        }
    }

    pub fn locks(&self) -> &Arc<UserLocks> {
        &self.locks
    }

    /// Current balance. Unknown users are seeded with the default.
    pub async fn get_balance(&self, user_id: &str) -> Result<i64, StoreError> {
        if let Some(balance) = self.read(user_id).await? {
            return Ok(balance);
        }
        let guard = self.locks.lock(user_id).await;
        self.balance_held(&guard).await
    }

    pub async fn adjust(&self, user_id: &str, delta: i64) -> Result<i64, StoreError> {
        let guard = self.locks.lock(user_id).await;
        self.adjust_held(&guard, delta).await
    }

    pub async fn set_balance(&self, user_id: &str, amount: i64) -> Result<i64, StoreError> {
        let _guard = self.locks.lock(user_id).await;
        let balance = amount.max(0);
        bounded(self.timeout, self.store.put(user_id, balance)).await?;
        tracing::info!(user_id, balance, "credit balance set");
        Ok(balance)
    }

    /// Balance for a user whose lock the caller already holds.
    pub async fn balance_held(&self, guard: &UserGuard) -> Result<i64, StoreError> {
        let user_id = guard.user_id();
        match self.read(user_id).await? {
            Some(balance) => Ok(balance),
            None => {
                bounded(self.timeout, self.store.put(user_id, self.default_balance)).await?;
                tracing::debug!(user_id, balance = self.default_balance, "seeded credit balance");
                Ok(self.default_balance)
            }
        }
    }

    /// Applies `delta` for a user whose lock the caller already holds.
    pub async fn adjust_held(&self, guard: &UserGuard, delta: i64) -> Result<i64, StoreError> {
        let current = self.balance_held(guard).await?;
        let balance = current.saturating_add(delta).max(0);
        bounded(self.timeout, self.store.put(guard.user_id(), balance)).await?;
        tracing::info!(user_id = guard.user_id(), delta, balance, "credit balance adjusted");
        Ok(balance)
    }

    async fn read(&self, user_id: &str) -> Result<Option<i64>, StoreError> {
        retry_read(self.read_retries, self.timeout, || self.store.get(user_id)).await
    }
}
