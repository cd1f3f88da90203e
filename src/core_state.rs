//! Shared application state: the database connection and the logged-in
//! session.
//!
//! `CoreState` is what the `commands` layer holds. The SQLite connection sits
//! behind a `Mutex` (one writer at a time); the session behind an `RwLock` so
//! reads do not block each other.

use std::sync::{Mutex, RwLock};
use std::time::Instant;

use rusqlite::Connection;

use crate::authorization::Session;
use crate::config::{self, Config};
use crate::db::{self, DatabaseError};
use crate::services::{accounts, ServiceError};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    db: Mutex<Connection>,
    /// Logged-in user. `None` when logged out or expired.
    session: RwLock<Option<Session>>,
    /// Inactivity timeout threshold in seconds.
    pub inactivity_timeout_secs: u64,
    /// Last user interaction timestamp.
    last_activity: Mutex<Instant>,
}

impl CoreState {
    pub fn new(conn: Connection, inactivity_timeout_secs: u64) -> Self {
        Self {
            db: Mutex::new(conn),
            session: RwLock::new(None),
            inactivity_timeout_secs,
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Open (and migrate) the configured database file.
    pub fn open(config: &Config) -> Result<Self, CoreError> {
        let conn = db::open_database(&config.db_path)?;
        Ok(Self::new(conn, config.session_timeout_secs))
    }

    /// State over a fresh in-memory database.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = db::open_memory_database()?;
        Ok(Self::new(conn, config::DEFAULT_SESSION_TIMEOUT_SECS))
    }

    // ── Database access ─────────────────────────────────────

    /// Run `f` with exclusive access to the connection.
    pub fn with_db<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, ServiceError>,
    ) -> Result<T, CoreError> {
        let conn = self.db.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(f(&conn)?)
    }

    /// Run `f` on behalf of the logged-in user. Counts as activity.
    pub fn with_session<T>(
        &self,
        f: impl FnOnce(&Connection, &Session) -> Result<T, ServiceError>,
    ) -> Result<T, CoreError> {
        let session = self.current_session()?;
        let result = self.with_db(|conn| f(conn, &session));
        self.update_activity();
        result
    }

    // ── Session ─────────────────────────────────────────────

    pub fn login(&self, username: &str, password: &str) -> Result<Session, CoreError> {
        let session = self.with_db(|conn| accounts::login(conn, username, password))?;
        let mut guard = self.session.write().map_err(|_| CoreError::LockPoisoned)?;
        *guard = Some(session.clone());
        drop(guard);
        self.update_activity();
        Ok(session)
    }

    pub fn logout(&self) {
        if let Ok(mut session) = self.session.write() {
            if let Some(s) = session.take() {
                tracing::info!(username = %s.username, "User logged out");
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// The active session, or an error when nobody is logged in or the
    /// inactivity timeout has passed (which also logs the user out).
    pub fn current_session(&self) -> Result<Session, CoreError> {
        if self.is_logged_in() && self.check_timeout() {
            tracing::info!("Session expired after inactivity");
            self.logout();
            return Err(CoreError::SessionExpired);
        }
        let guard = self.session.read().map_err(|_| CoreError::LockPoisoned)?;
        guard.clone().ok_or(CoreError::NoActiveSession)
    }

    // ── Inactivity management ───────────────────────────────

    /// Update the last activity timestamp.
    pub fn update_activity(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }

    /// Elapsed time beyond timeout + this margin is treated as a system
    /// suspend rather than inactivity, and resets the timer.
    const SLEEP_JUMP_MARGIN_SECS: u64 = 1800;

    /// Check if the inactivity timeout has been exceeded.
    pub fn check_timeout(&self) -> bool {
        self.last_activity
            .lock()
            .map(|mut last| {
                let elapsed = last.elapsed().as_secs();
                let timeout = self.inactivity_timeout_secs;
                if elapsed > timeout + Self::SLEEP_JUMP_MARGIN_SECS {
                    *last = Instant::now();
                    false
                } else {
                    elapsed > timeout
                }
            })
            .unwrap_or(false)
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not logged in")]
    NoActiveSession,
    #[error("Session expired, please log in again")]
    SessionExpired,
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("{0}")]
    Service(#[from] ServiceError),
}
