use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::models::BookingSession;
use crate::services::directory::ProviderDirectory;
use crate::services::ledger::{CreditLedger, UserLocks};
use crate::store::memory::MemoryStore;
use crate::store::sqlite::SqliteStore;
use crate::store::{AppointmentStore, CreditStore, PatternStore};

pub struct AppState {
    pub config: AppConfig,
    pub directory: ProviderDirectory,
    pub ledger: CreditLedger,
    pub appointments: Arc<dyn AppointmentStore>,
    pub patterns: Arc<dyn PatternStore>,
    sessions: Mutex<HashMap<String, BookingSession>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        directory: ProviderDirectory,
        credits: Arc<dyn CreditStore>,
        appointments: Arc<dyn AppointmentStore>,
        patterns: Arc<dyn PatternStore>,
    ) -> Self {
        let ledger = CreditLedger::new(
            credits,
            Arc::new(UserLocks::default()),
            config.default_credits,
            config.store_timeout,
            config.read_retries,
        );

        Self {
            config,
            directory,
            ledger,
            appointments,
            patterns,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory(config: AppConfig, directory: ProviderDirectory) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, directory, store.clone(), store.clone(), store)
    }

    pub fn sqlite(config: AppConfig, directory: ProviderDirectory, conn: Connection) -> Self {
        let store = Arc::new(SqliteStore::new(conn));
        Self::new(config, directory, store.clone(), store.clone(), store)
    }

    pub fn user_locks(&self) -> &Arc<UserLocks> {
        self.ledger.locks()
    }

    /// Session table. Never hold the guard across an `.await`.
    pub fn sessions(&self) -> MutexGuard<'_, HashMap<String, BookingSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
